//! Generate command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::generator::{Document, ModuleDraft, ModuleGenerator, ModuleRequest};
use crate::llm::create_model;
use anyhow::{Context, Result};

/// Options collected from the command line.
#[derive(Debug)]
pub struct GenerateArgs {
    pub title: String,
    pub level: String,
    pub weeks: i64,
    pub style: Option<String>,
    pub document: Option<String>,
    pub mime: String,
    pub output: Option<String>,
}

/// Run the generate command.
pub async fn run_generate(args: GenerateArgs, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Generate, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'copilot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let document = match &args.document {
        Some(path) => {
            let path = Settings::expand_path(path);
            let data = std::fs::read(&path)
                .with_context(|| format!("Failed to read document {}", path.display()))?;
            Some(Document {
                data,
                mime_type: args.mime.clone(),
            })
        }
        None => None,
    };

    let request = ModuleRequest {
        title: args.title,
        level: args.level,
        duration_weeks: args.weeks,
        teaching_style: args
            .style
            .unwrap_or_else(|| settings.course.teaching_style.clone()),
        document,
    };

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let model = create_model(&settings)?;
    let generator = ModuleGenerator::new(model, &settings.model.draft_model, &prompts);

    let spinner = Output::spinner("Drafting module...");
    let result = generator.generate(&request).await;
    spinner.finish_and_clear();

    let draft = result?;

    match ModuleDraft::from_value(&draft) {
        Ok(typed) => {
            for warning in typed.count_warnings() {
                Output::warning(&warning);
            }
        }
        Err(e) => Output::warning(&format!("{}", e)),
    }

    let json = serde_json::to_string_pretty(&draft)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &json)?;
            Output::success(&format!("Module draft written to {}", path));
        }
        None => println!("{}", json),
    }

    Ok(())
}
