pub mod assistant;
pub mod classifier;
pub mod cli;
pub mod generate;
pub mod session;
pub mod settings;

pub use assistant::Assistant;
pub use classifier::{classify, is_informative, Intent};
pub use generate::{Generator, OllamaClient};
pub use settings::AppSettings;
