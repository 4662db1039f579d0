//! Configuration management for rascal-build

mod overrides;
mod settings;
pub mod validation;

// Re-export main types
pub use overrides::Overrides;
pub use settings::{
    CompileConfig, Config, GenerateConfig, LauncherConfig, PackageConfig, PathsConfig,
    ProjectConfig, TutorConfig,
};
pub use validation::{ConfigValidator, GoalValidator};
