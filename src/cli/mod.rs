//! CLI module for Copilot.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Copilot - AI course design assistant for instructors
///
/// Drafts schema-validated course modules, runs multi-agent course pipelines
/// over a persistent SQLite session, and dumps sessions back as text.
#[derive(Parser, Debug)]
#[command(name = "copilot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Generate a structured module draft (objectives, lessons, exercises, quiz)
    Generate {
        /// Module title
        #[arg(short, long)]
        title: String,

        /// Difficulty level (Beginner, Intermediate, Advanced; prefixes accepted)
        #[arg(short, long, default_value = "Beginner")]
        level: String,

        /// Duration in weeks
        #[arg(short, long, default_value = "4")]
        weeks: i64,

        /// Teaching style
        #[arg(short, long)]
        style: Option<String>,

        /// Curriculum document to align the module with (PDF by default)
        #[arg(short, long)]
        document: Option<String>,

        /// MIME type of the document
        #[arg(long, default_value = "application/pdf")]
        mime: String,

        /// Write the JSON to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run a multi-agent course pipeline
    Run {
        /// Preset to run (see `copilot presets`)
        #[arg(default_value = "full-course")]
        preset: String,

        /// Message that starts the run
        #[arg(short, long, default_value = "Generate the course content.")]
        message: String,

        /// Ask for difficulty, duration and teaching style before running
        #[arg(short, long)]
        interactive: bool,

        /// Difficulty level for a new session
        #[arg(long)]
        level: Option<String>,

        /// Duration in weeks for a new session
        #[arg(long)]
        weeks: Option<u32>,

        /// Teaching style for a new session
        #[arg(long)]
        style: Option<String>,

        /// Run inside this session instead of the most recent one
        #[arg(long, conflicts_with = "new_session")]
        session: Option<String>,

        /// Start a fresh session
        #[arg(long)]
        new_session: bool,
    },

    /// Dump a stored session as text (state JSON + event transcript)
    Dump {
        /// Session to dump (all events in the store if omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// App name used to disambiguate the session
        #[arg(short, long)]
        app: Option<String>,

        /// Character budget for the dump
        #[arg(long)]
        max_chars: Option<usize>,

        /// Leave out the state section
        #[arg(long)]
        no_state: bool,

        /// Leave out the events section
        #[arg(long)]
        no_events: bool,

        /// Print metadata as JSON instead of the raw dump
        #[arg(long)]
        json: bool,

        /// Write the dump to a file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List sessions for the configured app and user
    Sessions,

    /// Export a session state value (e.g. deep_course_content) to a file
    Export {
        /// State key to export
        key: String,

        /// Session to read (most recent if omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List pipeline presets and their stages
    Presets,

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "model.provider")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
