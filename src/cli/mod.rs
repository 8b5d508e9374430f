pub mod commands;
pub mod progress;
pub mod tools;

pub use progress::{ConsoleProgress, TeeSink};
pub use tools::default_registry;
