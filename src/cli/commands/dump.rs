//! Dump command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::session::{DumpOptions, DumpScope, SessionDumpReader};
use anyhow::Result;

/// Options collected from the command line.
#[derive(Debug)]
pub struct DumpArgs {
    pub session: Option<String>,
    pub app: Option<String>,
    pub max_chars: Option<usize>,
    pub no_state: bool,
    pub no_events: bool,
    pub json: bool,
    pub output: Option<String>,
}

/// Run the dump command.
pub fn run_dump(args: DumpArgs, settings: Settings) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let reader = SessionDumpReader::new(settings.session_db_path(&cwd));

    let options = DumpOptions {
        include_state: !args.no_state,
        include_events: !args.no_events,
        max_chars: args.max_chars.unwrap_or(settings.pipeline.dump_max_chars),
    };
    let app = args
        .app
        .unwrap_or_else(|| settings.session.app_name.clone());

    let dump = reader.dump(args.session.as_deref(), Some(&app), &options)?;

    if dump.scope == DumpScope::Store && options.include_events {
        Output::warning("No session given: events from every session are included.");
    }

    let text = if args.json {
        serde_json::to_string_pretty(&dump)?
    } else {
        dump.dump.clone()
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, &text)?;
            Output::success(&format!("Dump written to {} ({} chars)", path, dump.chars));
        }
        None => println!("{}", text),
    }

    if dump.truncated {
        Output::warning(&format!(
            "Dump truncated to {} characters (raise with --max-chars)",
            dump.chars
        ));
    }

    Ok(())
}
