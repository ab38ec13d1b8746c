use nl2sql_gateway::llm::{GenerationCapability, LlmClient};
use nl2sql_gateway::pipeline::{ErrorResponse, QueryPipeline};
use nl2sql_gateway::security::PrincipalDirectory;
use nl2sql_gateway::{PipelineConfig, PipelineError};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nl2sql")]
#[command(about = "Natural-language SQL gateway over role-scoped sample databases")]
#[command(version)]
struct Args {
    /// Principal to act as (email or id)
    #[arg(short, long, global = true, default_value = "analyst@example.com")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question against one database
    Query {
        /// The question in natural language
        question: String,

        /// Database name, e.g. "E-Commerce"
        #[arg(short, long)]
        database: String,
    },
    /// Show your previous queries, newest first
    History {
        /// Only queries against this database
        #[arg(short, long)]
        database: Option<String>,

        /// Maximum number of entries (default: 10)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Row counts for every table of a database
    Stats {
        #[arg(short, long)]
        database: String,
    },
    /// Tables and columns of a database
    Schema {
        #[arg(short, long)]
        database: String,
    },
    /// Your role and the databases you can query
    Databases,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = PipelineConfig::from_env()?;

    match run(args, &config).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let response = ErrorResponse::from(&err);
            println!("{}", serde_json::to_string_pretty(&response)?);
            std::process::exit(if response.status_code() >= 500 { 2 } else { 1 });
        }
    }
}

async fn run(args: Args, config: &PipelineConfig) -> nl2sql_gateway::Result<()> {
    let principal = load_directory(config)?.resolve(&args.user)?;
    info!("Acting as '{}'", principal.id);

    if matches!(args.command, Commands::Query { .. }) {
        config.require_api_key()?;
    }
    let pipeline = build_pipeline(config).await?;

    match args.command {
        Commands::Query { question, database } => {
            print_json(&pipeline.run_query(&principal, &question, &database).await?)
        }
        Commands::History { database, limit } => {
            print_json(&pipeline.history(&principal, database.as_deref(), limit).await?)
        }
        Commands::Stats { database } => print_json(&pipeline.stats(&principal, &database).await?),
        Commands::Schema { database } => print_json(&pipeline.schema(&principal, &database)?),
        Commands::Databases => print_json(&pipeline.profile(&principal)),
    }
}

fn load_directory(config: &PipelineConfig) -> nl2sql_gateway::Result<PrincipalDirectory> {
    match &config.principals_file {
        Some(path) => PrincipalDirectory::from_json_str(&std::fs::read_to_string(path)?),
        None => Ok(PrincipalDirectory::with_defaults()),
    }
}

async fn build_pipeline(config: &PipelineConfig) -> nl2sql_gateway::Result<QueryPipeline> {
    // Only `query` calls the model; the key is checked before that path
    let llm = LlmClient::new(
        config.openai_api_key.clone().unwrap_or_default(),
        config.openai_model.clone(),
        config.openai_base_url.clone(),
        config.generation_timeout,
    )?;
    info!("Using model {}", llm.model());
    let capability: Arc<dyn GenerationCapability> = Arc::new(llm);
    QueryPipeline::from_config(config, capability).await
}

fn print_json<T: Serialize>(value: &T) -> nl2sql_gateway::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(PipelineError::from)?;
    println!("{}", text);
    Ok(())
}
