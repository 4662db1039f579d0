//! Tool command construction and execution

pub mod builder;
pub mod compiler_command;
pub mod launcher;

// Re-export commonly used types
pub use builder::CommandBuilder;
pub use compiler_command::{CompilerCommand, join_paths};
pub use launcher::Launcher;
