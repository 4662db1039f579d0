pub mod diagnostic;
pub mod path_config;
pub mod work_item;

// Re-export commonly used types
pub use diagnostic::{Diagnostic, Location, Severity};
pub use path_config::PathConfig;
pub use work_item::{WorkItem, WorkSet};
