pub mod ai;
pub mod cli;
pub mod config;
pub mod content;
pub mod executor;
pub mod git;
pub mod prompt;
pub mod release;
pub mod render;
pub mod theme;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use ai::{AIError, ConversationDriver};
pub use config::Config;
pub use content::{ContentGenerator, ContentKind};
pub use git::GitRepo;
