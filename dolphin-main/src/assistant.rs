use anyhow::Result;
use dolphin_memory::{Message, MemoryStore, TranscriptLog};

use crate::classifier::{classify, Intent};
use crate::generate::Generator;

pub const STORED_REPLY: &str = "Got it! Storing it in my memory.";
pub const FORGOT_REPLY: &str = "Memory cleared. I have forgotten everything.";

/// Prompt that asks the model to answer only from the retrieved context
pub fn build_prompt(context: &str, question: &str) -> String {
  format!(
    "You are an AI language model. Provide a response strictly based on the given context.\n\
     \n\
     Context:\n\
     {context}\n\
     \n\
     Question:\n\
     {question}\n\
     \n\
     Answer:\n"
  )
}

/// Routes input to the memory store or the generator
pub struct Assistant {
  store: MemoryStore,
  generator: Box<dyn Generator>,
  transcript: Option<TranscriptLog>,
  reset_phrase: String,
}

impl Assistant {
  pub fn new(
    store: MemoryStore,
    generator: Box<dyn Generator>,
    reset_phrase: impl Into<String>,
  ) -> Self {
    Self {
      store,
      generator,
      transcript: None,
      reset_phrase: reset_phrase.into(),
    }
  }

  /// Record every exchange in `transcript`
  pub fn with_transcript(mut self, transcript: TranscriptLog) -> Self {
    self.transcript = Some(transcript);
    self
  }

  pub fn store(&self) -> &MemoryStore {
    &self.store
  }

  /// Classify `text` and handle it. Never fails: errors become the reply.
  pub async fn process_input(&self, text: &str) -> String {
    let intent = classify(text, &self.reset_phrase);
    self.respond(text, intent).await
  }

  /// Handle `text` as `intent`, bypassing the classifier
  pub async fn respond(&self, text: &str, intent: Intent) -> String {
    tracing::debug!(?intent, "handling input");

    let result = match intent {
      Intent::Forget => self.forget().await,
      Intent::Remember => self.remember(text).await,
      Intent::Ask => self.answer(text).await,
    };

    let reply = match result {
      Ok(reply) => reply,
      Err(e) => {
        tracing::error!(error = %format!("{:#}", e), ?intent, "failed to handle input");
        format!("Sorry, something went wrong: {:#}", e)
      }
    };

    self.record(text, &reply);
    reply
  }

  async fn forget(&self) -> Result<String> {
    self.store.reset().await?;
    Ok(FORGOT_REPLY.to_string())
  }

  async fn remember(&self, text: &str) -> Result<String> {
    self.store.insert(text).await?;
    Ok(STORED_REPLY.to_string())
  }

  async fn answer(&self, question: &str) -> Result<String> {
    let top_k = self.store.config().max_retrieval_results;
    let context = self.store.retrieve_context(question, top_k).await?;
    tracing::debug!(chunks = context.len(), "retrieved context");

    let prompt = build_prompt(&context.format_for_prompt(), question);
    self.generator.generate(&prompt).await
  }

  fn record(&self, input: &str, reply: &str) {
    let Some(transcript) = &self.transcript else {
      return;
    };

    for message in [Message::user(input), Message::assistant(reply)] {
      if let Err(e) = transcript.append(&message) {
        tracing::warn!(error = %e, "failed to write transcript");
        return;
      }
    }
  }
}
