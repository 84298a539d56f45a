/// What to do with a line of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
  /// Clear all memory
  Forget,
  /// Store the text
  Remember,
  /// Answer the text from memory
  Ask,
}

/// Anything not ending in `?` is a statement.
pub fn is_informative(text: &str) -> bool {
  !text.trim().ends_with('?')
}

pub fn classify(text: &str, reset_phrase: &str) -> Intent {
  if text.trim().to_lowercase() == reset_phrase.trim().to_lowercase() {
    Intent::Forget
  } else if is_informative(text) {
    Intent::Remember
  } else {
    Intent::Ask
  }
}
