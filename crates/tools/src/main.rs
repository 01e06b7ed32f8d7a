//! `sandbox-tools` -- call the sandbox tools from the command line.
//!
//! ```text
//! sandbox-tools list
//! sandbox-tools call python_exec '{"code": "print(1 + 1)"}'
//! sandbox-tools call shell_exec '{"script": "uname -a"}'
//! sandbox-tools health
//! ```
//!
//! Configuration comes from the environment (see [`ToolConfig::from_env`]).
//! Logs go to stderr so stdout carries only the JSON result.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sandbox_tools::client::BrokerClient;
use sandbox_tools::config::ToolConfig;
use sandbox_tools::registry::ToolRegistry;

#[derive(Parser)]
#[command(name = "sandbox-tools")]
#[command(about = "Run code in the execution sandbox through its tool adapters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered tools with their descriptions
    List,
    /// Call a tool and print its JSON result
    Call {
        /// Tool name, e.g. python_exec
        name: String,
        /// JSON arguments (defaults to no arguments)
        args: Option<String>,
    },
    /// Check that the broker is reachable
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sandbox_tools=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match ToolConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid tool configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::List => {
            let registry = ToolRegistry::with_sandbox_tools(&config);
            for tool in registry.iter() {
                println!("{}\n    {}\n", tool.name(), tool.description());
            }
            ExitCode::SUCCESS
        }
        Commands::Call { name, args } => {
            let args = match args.as_deref().map(serde_json::from_str::<Value>) {
                None => Value::Null,
                Some(Ok(args)) => args,
                Some(Err(e)) => {
                    eprintln!("Arguments are not valid JSON: {e}");
                    return ExitCode::FAILURE;
                }
            };

            let registry = ToolRegistry::with_sandbox_tools(&config);
            match registry.call(&name, args).await {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Health => {
            let client = BrokerClient::new(&config.executor_url);
            match client.health(Duration::from_secs(5)).await {
                Ok(health) => {
                    println!(
                        "ok={} image={} runtime={}",
                        health.ok, health.image, health.runtime
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Broker at {} is unreachable: {e}", client.endpoint());
                    ExitCode::FAILURE
                }
            }
        }
    }
}
