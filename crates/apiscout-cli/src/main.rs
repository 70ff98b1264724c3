mod render;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::debug;
use serde_json::{Map, Value};

use apiscout_core::config::{self, CONFIG_FILE_NAME};
use apiscout_core::index::UNTAGGED;
use apiscout_core::{ApiExplorer, ScoutConfig, ScoutError, ValidationOptions};
use apiscout_graphql::guidance::{error_guidance, response_guidance};
use apiscout_graphql::{GraphError, GraphExplorer};

#[derive(Parser)]
#[command(
    name = "apiscout",
    about = "Explore OpenAPI and GraphQL APIs and check requests before sending them",
    version
)]
struct Cli {
    /// Config file (defaults to ./.apiscout.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the operations an OpenAPI document declares
    Discover {
        /// Document URL or local file path
        source: String,

        /// Output format
        #[arg(long, default_value = "markdown")]
        format: OutputFormat,

        /// Only list operations carrying this tag ("untagged" for none)
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show one operation by verb and declared path template
    Find {
        /// Document URL or local file path
        source: String,

        /// HTTP verb, any case
        method: String,

        /// Declared path template, e.g. /users/{id}
        path: String,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: DataFormat,
    },

    /// Check a request against its operation
    Validate {
        /// Document URL or local file path
        source: String,

        /// Operation id (declared or derived)
        operation_id: String,

        /// Parameter as name=value; values that parse as JSON are used as such
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Request body as JSON
        #[arg(long)]
        body: Option<String>,

        /// Convert loosely typed values before checking them
        #[arg(long)]
        coerce: bool,

        /// Do not report missing required values
        #[arg(long)]
        skip_required: bool,

        /// Ignore range, length, pattern, enum and format limits
        #[arg(long)]
        skip_constraints: bool,

        /// Accept any parameter type and skip body schema checks
        #[arg(long)]
        skip_types: bool,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: DataFormat,
    },

    /// Work with GraphQL endpoints
    #[command(subcommand)]
    Graphql(GraphCommands),

    /// Write a default .apiscout.yaml
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum GraphCommands {
    /// Introspect an endpoint and list its operations
    Discover {
        endpoint: String,

        /// Output format
        #[arg(long, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Send a query or mutation
    Execute {
        endpoint: String,

        /// Query document
        query: String,

        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,

        /// Operation to run when the document holds several
        #[arg(long)]
        operation_name: Option<String>,

        /// Introspect first so the query is checked before it is sent
        #[arg(long)]
        check: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Yaml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum DataFormat {
    Yaml,
    Json,
}

impl From<DataFormat> for OutputFormat {
    fn from(format: DataFormat) -> Self {
        match format {
            DataFormat::Yaml => OutputFormat::Yaml,
            DataFormat::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Discover {
            source,
            format,
            tag,
        } => cmd_discover(&cfg, &source, format, tag.as_deref()).await,

        Commands::Find {
            source,
            method,
            path,
            format,
        } => cmd_find(&cfg, &source, &method, &path, format).await,

        Commands::Validate {
            source,
            operation_id,
            params,
            body,
            coerce,
            skip_required,
            skip_constraints,
            skip_types,
            format,
        } => {
            let options = ValidationOptions {
                skip_required: skip_required || cfg.validation.skip_required,
                skip_constraints: skip_constraints || cfg.validation.skip_constraints,
                skip_type_checking: skip_types || cfg.validation.skip_type_checking,
                allow_coercion: coerce || cfg.validation.allow_coercion,
            };
            cmd_validate(&cfg, &source, &operation_id, &params, body.as_deref(), options, format)
                .await
        }

        Commands::Graphql(GraphCommands::Discover { endpoint, format }) => {
            cmd_graph_discover(&cfg, &endpoint, format).await
        }

        Commands::Graphql(GraphCommands::Execute {
            endpoint,
            query,
            variables,
            operation_name,
            check,
        }) => {
            cmd_graph_execute(
                &cfg,
                &endpoint,
                &query,
                variables.as_deref(),
                operation_name.as_deref(),
                check,
            )
            .await
        }

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "apiscout", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Load the config named on the command line, or the one in the current
/// directory if present.
fn load_config(path: Option<&PathBuf>) -> Result<ScoutConfig> {
    let explicit = path.is_some();
    let path = path.cloned().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    match config::load_config(&path).map_err(|e| hinted(e.hint(), e))? {
        Some(cfg) => Ok(cfg),
        None if explicit => anyhow::bail!("config file {} not found", path.display()),
        None => Ok(ScoutConfig::default()),
    }
}

/// Attach the remediation hint to a library error.
fn hinted(hint: &str, err: impl std::error::Error + Send + Sync + 'static) -> anyhow::Error {
    anyhow::Error::new(err).context(format!("hint: {hint}"))
}

fn scout_err(err: ScoutError) -> anyhow::Error {
    hinted(err.hint(), err)
}

fn graph_err(err: GraphError) -> anyhow::Error {
    hinted(error_guidance(&err), err)
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Register a local document with the explorer so later calls find it in
/// the cache. URLs are fetched on first use instead.
fn prime(explorer: &ApiExplorer, source: &str) -> Result<()> {
    if is_remote(source) {
        return Ok(());
    }
    let bytes = fs::read(source).with_context(|| format!("failed to read {source}"))?;
    debug!("loaded {} bytes from {source}", bytes.len());
    explorer.load_bytes(source, &bytes).map_err(scout_err)?;
    Ok(())
}

fn explorer(cfg: &ScoutConfig, source: &str) -> Result<ApiExplorer> {
    let explorer = ApiExplorer::new(cfg).map_err(scout_err)?;
    prime(&explorer, source)?;
    Ok(explorer)
}

fn print_data(value: &impl serde::Serialize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml | OutputFormat::Markdown => print!("{}", serde_yaml_ng::to_string(value)?),
    }
    Ok(())
}

async fn cmd_discover(
    cfg: &ScoutConfig,
    source: &str,
    format: OutputFormat,
    tag: Option<&str>,
) -> Result<()> {
    let explorer = explorer(cfg, source)?;
    let mut summary = explorer.discover(source).await.map_err(scout_err)?;

    if let Some(tag) = tag {
        summary.operations.retain(|op| {
            if tag == UNTAGGED {
                op.tags.is_empty()
            } else {
                op.tags.iter().any(|t| t == tag)
            }
        });
        if summary.operations.is_empty() {
            eprintln!("No operations tagged {tag}. Tags: {}", summary.tags.join(", "));
        }
    }

    match format {
        OutputFormat::Markdown => print!("{}", render::summary_markdown(&summary)?),
        other => print_data(&summary, other)?,
    }
    Ok(())
}

async fn cmd_find(
    cfg: &ScoutConfig,
    source: &str,
    method: &str,
    path: &str,
    format: DataFormat,
) -> Result<()> {
    let explorer = explorer(cfg, source)?;
    let op = explorer
        .find_operation(source, method, path)
        .await
        .map_err(scout_err)?;
    print_data(&*op, format.into())
}

/// Split `name=value`. Values that parse as JSON keep their type; anything
/// else is a string.
fn parse_param(raw: &str) -> Result<(String, Value)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("parameter '{raw}' is not in NAME=VALUE form"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn parse_json_object(raw: &str, what: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).with_context(|| format!("{what} is not valid JSON"))? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{what} must be a JSON object"),
    }
}

async fn cmd_validate(
    cfg: &ScoutConfig,
    source: &str,
    operation_id: &str,
    raw_params: &[String],
    body: Option<&str>,
    options: ValidationOptions,
    format: DataFormat,
) -> Result<()> {
    let mut params = Map::new();
    for raw in raw_params {
        let (name, value) = parse_param(raw)?;
        params.insert(name, value);
    }
    let body: Option<Value> = body
        .map(serde_json::from_str)
        .transpose()
        .context("request body is not valid JSON")?;

    let explorer = explorer(cfg, source)?;
    let report = explorer
        .validate(source, operation_id, &mut params, body.as_ref(), Some(&options))
        .await
        .map_err(scout_err)?;

    print_data(&report, format.into())?;
    if !report.valid {
        anyhow::bail!("{}", report.guidance.summary);
    }
    Ok(())
}

async fn cmd_graph_discover(cfg: &ScoutConfig, endpoint: &str, format: OutputFormat) -> Result<()> {
    let explorer = GraphExplorer::new(cfg).map_err(graph_err)?;
    let catalog = explorer.discover_graph(endpoint).await.map_err(graph_err)?;
    match format {
        OutputFormat::Markdown => print!("{}", render::graph_markdown(&catalog)?),
        other => print_data(&*catalog, other)?,
    }
    Ok(())
}

async fn cmd_graph_execute(
    cfg: &ScoutConfig,
    endpoint: &str,
    query: &str,
    variables: Option<&str>,
    operation_name: Option<&str>,
    check: bool,
) -> Result<()> {
    let variables = variables
        .map(|raw| parse_json_object(raw, "variables"))
        .transpose()?;

    let explorer = GraphExplorer::new(cfg).map_err(graph_err)?;
    if check {
        explorer.discover_graph(endpoint).await.map_err(graph_err)?;
    }
    let response = explorer
        .execute_graph(endpoint, query, variables, operation_name)
        .await
        .map_err(graph_err)?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    for advice in response_guidance(&response) {
        eprintln!("hint: {advice}");
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
