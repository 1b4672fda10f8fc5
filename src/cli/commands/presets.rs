//! Presets command implementation.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::pipeline::{build_preset, Preset, PresetInputs};
use anyhow::Result;

/// Run the presets command.
pub fn run_presets(settings: Settings) -> Result<()> {
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let inputs = PresetInputs::default();

    for preset in Preset::ALL {
        let pipeline = build_preset(preset, &settings, &prompts, &inputs);
        Output::header(&format!("{} - {}", preset, preset.description()));

        for (i, step) in pipeline.plan().iter().enumerate() {
            Output::step(i + 1, &step.label, step.agent.output_key.as_deref());
        }
    }

    println!();
    Output::info("Iteration counts come from [pipeline] in the config file.");

    Ok(())
}
