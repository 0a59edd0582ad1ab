//! Keyring management for provider API keys.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use dialoguer::{Password, theme::ColorfulTheme};
use switchyard_models::auth::{ApiKey, CredentialStore};
use switchyard_models::{Error, ModelRegistry};

use super::KEYRING_SERVICE;

/// Auth arguments.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Prompt for an API key and store it
    Set {
        /// Provider name, e.g. "Anthropic"
        provider: String,
    },
    /// Remove a stored API key
    Delete {
        /// Provider name
        provider: String,
    },
    /// Show which providers have a key available
    List,
}

/// Run auth command.
pub fn run(args: AuthArgs, registry: &ModelRegistry) -> Result<()> {
    let store = CredentialStore::new(KEYRING_SERVICE);

    match args.command {
        AuthCommands::Set { provider } => {
            let env_var = key_env(registry, &provider)?;
            println!("Enter API key for {provider} (or set {env_var})");

            let key = Password::with_theme(&ColorfulTheme::default())
                .with_prompt("API key")
                .interact()?;
            if key.is_empty() {
                bail!("API key cannot be empty");
            }

            store.set(&provider, &ApiKey::new(key))?;
            println!("API key for '{provider}' saved to keyring.");
        }
        AuthCommands::Delete { provider } => {
            key_env(registry, &provider)?;
            match store.delete(&provider) {
                Ok(()) => println!("API key for '{provider}' deleted."),
                Err(Error::MissingCredential(_)) => println!("No API key stored for '{provider}'."),
                Err(e) => bail!("Failed to delete API key: {e}"),
            }
        }
        AuthCommands::List => {
            let stored = store.list_providers(registry.provider_names());
            println!("{}", status_table(registry, &stored, |var| std::env::var_os(var).is_some()));
        }
    }
    Ok(())
}

/// The environment variable a registered provider reads its key from.
fn key_env(registry: &ModelRegistry, provider: &str) -> Result<String> {
    let handle = registry.provider(provider)?;
    Ok(handle.credential_keys().api_key_env.clone())
}

fn status_table(
    registry: &ModelRegistry,
    stored: &[String],
    env_is_set: impl Fn(&str) -> bool,
) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Variable").fg(Color::Cyan),
        Cell::new("Keyring").fg(Color::Cyan),
        Cell::new("Environment").fg(Color::Cyan),
    ]);

    for name in registry.provider_names() {
        let Ok(provider) = registry.provider(name) else {
            continue;
        };
        let keys = provider.credential_keys();
        let in_keyring = stored.iter().any(|s| s == name);
        let in_env = env_is_set(&keys.api_key_env);
        let env_cell = match (in_env, keys.api_key_required) {
            (true, _) => "set",
            (false, false) => "optional",
            (false, true) => "-",
        };

        table.add_row(vec![
            Cell::new(name),
            Cell::new(&keys.api_key_env),
            Cell::new(if in_keyring { "stored" } else { "-" }),
            Cell::new(env_cell),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_env_uses_provider_variable() {
        let registry = ModelRegistry::with_builtin_providers();
        assert_eq!(key_env(&registry, "Claude Code").unwrap(), "CLAUDE_CODE_PATH");
        assert_eq!(key_env(&registry, "Deepseek").unwrap(), "DEEPSEEK_API_KEY");
        assert!(key_env(&registry, "deepseek").is_err());
    }

    #[test]
    fn status_table_reports_each_source() {
        let registry = ModelRegistry::with_builtin_providers();
        let stored = vec!["Anthropic".to_string()];
        let mut table = status_table(&registry, &stored, |var| var == "GROQ_API_KEY");
        table.force_no_tty();

        assert_eq!(table.row_iter().count(), registry.len());
        let rendered = table.to_string();
        let line = |provider: &str| {
            rendered
                .lines()
                .find(|l| l.contains(&format!(" {provider} ")))
                .unwrap()
                .to_string()
        };
        assert!(line("Anthropic").contains("stored"));
        assert!(line("Groq").contains("set"));
        assert!(line("Ollama").contains("optional"));
        assert!(!line("Mistral").contains("stored"));
    }
}
