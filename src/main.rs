use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use weave_core::config::AppConfig;
use weave_core::traits::{ConnectionRegistry, TextModel};
use weave_core::{ExecutionContext, RunResources, Script, Value, WeaveError};
use weave_engine::{CommandRegistry, Executor};
use weave_llm::OpenAiClient;
use weave_mcp::{McpCallCommand, McpConnectCommand, McpManager};
use weave_translate::Translator;

#[derive(Parser)]
#[command(
    name = "weave",
    version,
    about = "Pipeline DSL engine for AI-automation workflows"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "weave.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline script
    Run {
        /// Path to the script file
        script: PathBuf,
    },
    /// Parse and validate a script without executing anything
    Check {
        /// Path to the script file
        script: PathBuf,
    },
    /// Translate free-text intent into process calculus
    Translate {
        /// The intent to translate
        #[arg(trailing_var_arg = true)]
        intent: Vec<String>,
        /// Execute the translated pipeline after validation
        #[arg(long)]
        run: bool,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        AppConfig::default()
    };

    match cli.command {
        Commands::Check { script } => {
            let text = std::fs::read_to_string(&script)?;
            let parsed = weave_parser::parse(&text).map_err(WeaveError::from)?;
            parsed.validate().map_err(WeaveError::from)?;
            println!(
                "ok: {} nodes across {} pipelines",
                parsed.node_count,
                parsed.pipelines.len()
            );
        }
        Commands::Run { script } => {
            let text = std::fs::read_to_string(&script)?;
            let parsed = weave_parser::parse(&text).map_err(WeaveError::from)?;
            let output = execute(&config, &parsed).await?;
            if !output.is_unit() {
                println!("{}", output.render());
            }
        }
        Commands::Translate { intent, run } => {
            let translator = Translator::new(model_from(&config)?);
            let intent = intent.join(" ");
            let calculus = translator.translate_raw(&intent).await?;
            println!("{}", calculus);

            let script = weave_parser::calculus::parse(&calculus).map_err(|e| {
                WeaveError::Translation(format!(
                    "generated text is not valid process calculus: {}",
                    e
                ))
            })?;
            info!(shape = %script.shape(), "Validated translated pipeline");
            if run {
                let output = execute(&config, &script).await?;
                if !output.is_unit() {
                    println!("{}", output.render());
                }
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn model_from(config: &AppConfig) -> anyhow::Result<Arc<dyn TextModel>> {
    let model_cfg = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no [model] section in config"))?;
    Ok(Arc::new(OpenAiClient::new(model_cfg.clone())))
}

/// Wire up a full run: registry, MCP manager, model, cancellation on
/// ctrl-c, and connection teardown at the end.
async fn execute(config: &AppConfig, script: &Script) -> anyhow::Result<Value> {
    let manager = Arc::new(McpManager::new());
    for (name, server) in &config.mcp.servers {
        if server.auto_connect {
            manager
                .connect(
                    name,
                    &server.command,
                    &server.args,
                    &server.env,
                    Some(server.timeout_secs),
                )
                .await?;
        }
    }

    let mut registry = CommandRegistry::new();
    weave_commands::register_builtins(&mut registry);
    registry.register(McpConnectCommand::new(Arc::clone(&manager)));
    registry.register(McpCallCommand::new(Arc::clone(&manager)));

    let mut resources = RunResources::new(&config.run.workdir)
        .with_connections(Arc::clone(&manager) as Arc<dyn ConnectionRegistry>);
    if let Some(model_cfg) = &config.model {
        resources = resources.with_model(Arc::new(OpenAiClient::new(model_cfg.clone())));
    }
    if let Some(secs) = config.run.command_timeout_secs {
        resources = resources.with_command_timeout(Duration::from_secs(secs));
    }

    let cancel = resources.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    let executor = Executor::new(Arc::new(registry)).with_strict_dispatch(config.run.strict);
    let result = executor.run(script, ExecutionContext::new(resources)).await;

    manager.close_all().await?;
    Ok(result?)
}
