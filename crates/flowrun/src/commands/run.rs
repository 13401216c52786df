//! Run command - create a flow run and optionally wait for it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use console::{Style, style};
use serde_json::{Map, Value};

use flowrun_client::{
    CancellationToken, ConnectionConfig, DEFAULT_API_URL, ReqwestTransport, RunRequest,
    RunResult, RunTrigger, StateClass,
};
use flowrun_config::{ConnectionSection, FlowrunConfig};

use super::Context;

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Deployment id to create the flow run from
    #[arg(long, env = "PREFECT_DEPLOYMENT_ID")]
    pub deployment_id: String,

    /// Prefect API URL (default: https://api.prefect.cloud/api)
    #[arg(long, env = "PREFECT_API_URL")]
    pub api_url: Option<String>,

    /// API key: Bearer token for Prefect Cloud, Basic credentials for self-hosted
    #[arg(long, env = "PREFECT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Prefect Cloud account id (cloud mode needs both account and workspace)
    #[arg(long, env = "PREFECT_ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// Prefect Cloud workspace id
    #[arg(long, env = "PREFECT_WORKSPACE_ID")]
    pub workspace_id: Option<String>,

    /// Flow parameter as KEY=VALUE; VALUE is parsed as JSON when possible
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// JSON file with a parameters object (--param entries override it)
    #[arg(long, value_name = "FILE")]
    pub params_file: Option<PathBuf>,

    /// Wait for the flow run to reach a terminal state (default)
    #[arg(long, conflicts_with = "no_wait")]
    pub wait: bool,

    /// Return as soon as the flow run is created
    #[arg(long)]
    pub no_wait: bool,

    /// Interval between status checks, e.g. 5s, 500ms, PT10S (default: 5s)
    #[arg(long, value_name = "DURATION", value_parser = parse_poll_frequency)]
    pub poll_frequency: Option<Duration>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = &loaded.config;

    let connection = connection_config(&args, &config.connection)?;
    let request = RunRequest::new(&args.deployment_id).with_parameters(parameters(&args)?);
    let wait = should_wait(&args, config);
    let poll_frequency = match args.poll_frequency {
        Some(d) => d,
        None => config.run.poll_frequency()?,
    };

    tracing::debug!(?connection, wait, ?poll_frequency, "Resolved run settings");

    let transport = ReqwestTransport::with_timeout(Duration::from_secs(args.timeout))
        .context("failed to build HTTP client")?;

    let cancellation = CancellationToken::new();
    cancel_on_ctrl_c(cancellation.clone());

    let result = RunTrigger::new(&connection, &transport)
        .with_cancellation(cancellation)
        .run(&request, wait, poll_frequency)
        .await?;

    print_result(&result, wait, ctx)
}

/// Merge CLI/env values over the `[connection]` config section.
fn connection_config(args: &RunArgs, section: &ConnectionSection) -> Result<ConnectionConfig> {
    let api_url = args
        .api_url
        .clone()
        .or_else(|| section.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let mut connection = ConnectionConfig::new(api_url);

    let api_key = match &args.api_key {
        Some(key) => Some(key.clone()),
        None => flowrun_config::resolve_api_key(section)?.map(|secret| {
            tracing::debug!(source = %secret.source, "Resolved API key");
            secret.value
        }),
    };
    if let Some(key) = api_key {
        connection = connection.with_api_key(key);
    }

    if let Some(account_id) = args.account_id.as_ref().or(section.account_id.as_ref()) {
        connection = connection.with_account_id(account_id);
    }
    if let Some(workspace_id) = args.workspace_id.as_ref().or(section.workspace_id.as_ref()) {
        connection = connection.with_workspace_id(workspace_id);
    }

    Ok(connection)
}

fn should_wait(args: &RunArgs, config: &FlowrunConfig) -> bool {
    if args.wait {
        true
    } else if args.no_wait {
        false
    } else {
        config.run.wait()
    }
}

/// Parameters from `--params-file`, overlaid with `--param` entries.
fn parameters(args: &RunArgs) -> Result<Map<String, Value>> {
    let mut parameters = match &args.params_file {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match serde_json::from_str::<Value>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
            {
                Value::Object(map) => map,
                _ => bail!("{} must contain a JSON object", path.display()),
            }
        }
        None => Map::new(),
    };

    for (name, value) in &args.params {
        parameters.insert(name.clone(), value.clone());
    }
    Ok(parameters)
}

/// `KEY=VALUE` where VALUE is JSON if it parses, otherwise a plain string.
fn parse_param(s: &str) -> std::result::Result<(String, Value), String> {
    let (name, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", s));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

fn parse_poll_frequency(s: &str) -> std::result::Result<Duration, String> {
    flowrun_config::parse_poll_frequency(s).map_err(|e| e.to_string())
}

/// Cancel `token` on the first Ctrl-C; exit on the second.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping (press Ctrl-C again to exit immediately)");
            token.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });
}

fn print_result(result: &RunResult, waited: bool, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let state_style = match result.state_type.class() {
        StateClass::Success => Style::new().green(),
        StateClass::Failure => Style::new().red(),
        StateClass::PendingCancel | StateClass::NonTerminal => Style::new().yellow(),
    };
    let title = if waited {
        "Flow run finished"
    } else {
        "Flow run created"
    };

    println!();
    println!("{}", style(title).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Flow run:"), result.run_id);
    println!(
        "  {} {}",
        dim.apply_to("State:   "),
        state_style.apply_to(&result.state_type)
    );
    println!("  {} {}", dim.apply_to("URL:     "), result.view_url);
    println!();

    Ok(())
}
