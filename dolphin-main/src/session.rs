use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::assistant::Assistant;

const GREETING: &str = "Assistant: Hello! How can I help you? (Type 'exit' to quit)\n";
const FAREWELL: &str = "Assistant: Goodbye!\n";

/// Line-based chat loop. Stops on `exit` or end of input.
pub async fn run_chat<R, W>(assistant: &Assistant, input: R, mut output: W) -> Result<()>
where
  R: AsyncBufRead + Unpin,
  W: AsyncWrite + Unpin,
{
  output.write_all(GREETING.as_bytes()).await?;

  let mut lines = input.lines();
  loop {
    output.write_all(b"You: ").await?;
    output.flush().await?;

    let Some(line) = lines.next_line().await? else {
      output.write_all(b"\n").await?;
      output.write_all(FAREWELL.as_bytes()).await?;
      break;
    };

    let text = line.trim();
    if text.is_empty() {
      continue;
    }
    if text.eq_ignore_ascii_case("exit") {
      output.write_all(FAREWELL.as_bytes()).await?;
      break;
    }

    let reply = assistant.process_input(text).await;
    output
      .write_all(format!("Assistant: {}\n", reply).as_bytes())
      .await?;
  }

  output.flush().await?;
  Ok(())
}
