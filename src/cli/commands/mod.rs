//! CLI command implementations.

mod config;
mod doctor;
mod dump;
mod export;
mod generate;
mod presets;
mod run;
mod serve;
mod sessions;

pub use config::run_config;
pub use doctor::run_doctor;
pub use dump::{run_dump, DumpArgs};
pub use export::run_export;
pub use generate::{run_generate, GenerateArgs};
pub use presets::run_presets;
pub use run::run_pipeline;
pub use serve::run_serve;
pub use sessions::run_sessions;
