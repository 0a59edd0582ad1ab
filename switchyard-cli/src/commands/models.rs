//! Model listing.

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use switchyard_models::{ModelInfo, ModelRegistry};

/// Models listing arguments.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only show models of this provider
    #[arg(long)]
    pub provider: Option<String>,
}

/// Run models command.
pub fn run(args: ModelsArgs, registry: &ModelRegistry) -> Result<()> {
    let models = match &args.provider {
        Some(name) => {
            let provider = registry.provider(name)?;
            if provider.static_models().is_empty() && provider.accepts_any_model() {
                println!("{name} accepts any model name; none are listed in advance.");
                return Ok(());
            }
            provider.static_models().to_vec()
        }
        None => registry.list_models(),
    };

    if models.is_empty() {
        bail!("No models registered.");
    }

    println!("{}", models_table(&models));
    Ok(())
}

fn models_table(models: &[ModelInfo]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Label").fg(Color::Cyan),
        Cell::new("Context").fg(Color::Cyan),
        Cell::new("Max output").fg(Color::Cyan),
    ]);

    for model in models {
        table.add_row(vec![
            Cell::new(&model.provider),
            Cell::new(&model.name),
            Cell::new(&model.label),
            Cell::new(format_tokens(model.max_token_allowed)),
            Cell::new(format_tokens(model.max_completion_tokens)),
        ]);
    }
    table
}

/// Format a token count compactly.
fn format_tokens(tokens: u32) -> String {
    if tokens >= 1_000_000 {
        format!("{}M", tokens / 1_000_000)
    } else if tokens >= 1_000 {
        format!("{}K", tokens / 1_000)
    } else {
        tokens.to_string()
    }
}
