//! Config command - inspect the effective configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use flowrun_config::{FlowrunConfig, LoadedConfig};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration (default)
    Show,

    /// Show which config files are checked and which were loaded
    Which,

    /// Show the user configuration file path
    Path,
}

/// JSON shape of `config show`.
#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    sources: Vec<String>,
    config: FlowrunConfig,
    warnings: &'a [String],
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn redacted(loaded: &LoadedConfig) -> FlowrunConfig {
    FlowrunConfig {
        connection: loaded.config.connection.redacted(),
        run: loaded.config.run.clone(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = redacted(&loaded);
    let sources: Vec<String> = loaded
        .loaded_from()
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    if ctx.json_output {
        let output = ShowOutput {
            sources,
            config,
            warnings: &loaded.warnings,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# flowrun configuration\n");
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)\n");
    } else {
        for source in &sources {
            println!("# loaded: {}", source);
        }
        println!();
    }

    print!("{}", config.to_toml()?);

    if ctx.verbose {
        println!();
        println!("# effective wait: {}", loaded.config.run.wait());
        println!(
            "# effective poll-frequency: {:?}",
            loaded.config.run.poll_frequency()?
        );
    }
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| serde_json::json!({ "path": s.path.display().to_string(), "loaded": s.loaded }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    println!("Config files (lowest precedence first):");
    for source in &loaded.sources {
        let marker = if source.loaded { "✓" } else { "·" };
        println!("  {} {}", marker, source.path.display());
    }
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    match flowrun_config::xdg_config_path() {
        Some(path) if ctx.json_output => {
            println!("{}", serde_json::json!({ "path": path.display().to_string() }))
        }
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("could not determine the user config directory"),
    }
    Ok(())
}
