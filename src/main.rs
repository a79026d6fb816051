//! `composio`: list and execute Composio actions from the command line.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use composio_toolset::{ExecuteActionParams, ToolSet, ToolsFilter};
use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "composio", version, about = "Discover and execute Composio actions")]
struct Cli {
    /// Composio API key
    #[arg(long, env = "COMPOSIO_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Platform base URL
    #[arg(long, env = "COMPOSIO_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Entity the actions run for
    #[arg(long, default_value = "default", global = true)]
    entity_id: String,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the schemas of matching actions as JSON
    Tools(ToolsArgs),
    /// Execute an action and print its response as JSON
    Execute(ExecuteArgs),
}

#[derive(Args, Debug)]
struct ToolsArgs {
    /// Toolkit slugs
    #[arg(long, value_delimiter = ',', conflicts_with = "available")]
    apps: Vec<String>,

    /// Action names
    #[arg(long, value_delimiter = ',')]
    actions: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Free-text search phrase
    #[arg(long)]
    use_case: Option<String>,

    #[arg(long, requires = "use_case")]
    use_case_limit: Option<u32>,

    /// Only toolkits with an active connected account
    #[arg(long)]
    available: bool,
}

#[derive(Args, Debug)]
struct ExecuteArgs {
    /// Action name
    action: String,

    /// Input parameters as a JSON object
    #[arg(long, default_value = "{}")]
    params: String,

    #[arg(long)]
    connected_account_id: Option<String>,

    /// Natural-language instruction
    #[arg(long)]
    text: Option<String>,
}

impl ToolsArgs {
    fn into_filter(self) -> ToolsFilter {
        ToolsFilter {
            apps: self.apps,
            actions: self.actions,
            tags: self.tags,
            use_case: self.use_case,
            use_case_limit: self.use_case_limit,
            filter_by_available_apps: self.available,
        }
    }
}

impl ExecuteArgs {
    fn into_params(self) -> anyhow::Result<ExecuteActionParams> {
        let input: Value = serde_json::from_str(&self.params).context("--params is not valid JSON")?;
        anyhow::ensure!(input.is_object(), "--params must be a JSON object");

        let mut params = ExecuteActionParams::new(self.action).with_params(input);
        if let Some(id) = self.connected_account_id {
            params = params.with_connected_account_id(id);
        }
        if let Some(text) = self.text {
            params = params.with_text(text);
        }
        Ok(params)
    }
}

fn configure_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    configure_logging(cli.verbose);

    let mut builder = ToolSet::builder().with_entity_id(cli.entity_id);
    if let Some(api_key) = cli.api_key {
        builder = builder.with_api_key(api_key);
    }
    if let Some(base_url) = cli.base_url {
        builder = builder.with_base_url(base_url);
    }
    let toolset = builder.build().context("failed to configure toolset")?;

    match cli.command {
        Command::Tools(args) => {
            let tools = toolset.get_tools_schema(&args.into_filter()).await?;
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Command::Execute(args) => {
            let params = args.into_params()?;
            let action = params.action.clone();
            let response = toolset
                .execute_action(params)
                .await
                .with_context(|| format!("failed to execute {}", action))?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
