//! nc-client - NATS Connect demo client
//!
//! Establishes a session with file-backed collaborators, lists the teams
//! visible to a Synadia Cloud token and fetches the first one.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nats_connect_client::{
    endpoints::synadia::{GetTeamRequest, ListTeamsRequest, SynadiaAccess, SYNADIA_CLOUD_BASE_URL},
    parameters::NC_PARAMETER_PREFIX,
    Bootstrap, ClientArgs, LocalIdentityProvider, MemoryParameterStore, NatsConnector,
};

#[derive(Parser)]
#[command(name = "nc-client", version, about = "NATS Connect demo client")]
struct Args {
    #[command(flatten)]
    client: ClientArgs,

    /// JSON object of parameter name to value
    #[arg(long, env = "NC_PARAMETERS_FILE")]
    parameters_file: PathBuf,

    /// JSON object of username to Argon2id password hash
    #[arg(long, env = "NC_USERS_FILE")]
    users_file: PathBuf,

    /// Parameter namespace (nc or ai2c)
    #[arg(long, env = "NC_PARAMETER_PREFIX", default_value = NC_PARAMETER_PREFIX)]
    parameter_prefix: String,

    /// Synadia Cloud API token
    #[arg(long, env = "NC_SAAS_KEY", hide_env_values = true)]
    saas_key: String,

    /// Synadia Cloud API base URL
    #[arg(long, env = "NC_BASE_URL", default_value = SYNADIA_CLOUD_BASE_URL)]
    base_url: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("nats_connect_client={log_level},nc_client={log_level},warn").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let identity_provider = LocalIdentityProvider::from_json_file(&args.users_file)
        .context("loading users file")?;
    let parameter_store = MemoryParameterStore::from_json_file(&args.parameters_file)
        .context("loading parameters file")?;

    let bootstrap = Bootstrap::new(
        Arc::new(identity_provider),
        Arc::new(parameter_store),
        Arc::new(NatsConnector),
    )
    .with_parameter_prefix(args.parameter_prefix.clone());

    let client = bootstrap
        .connect(args.client.into_credential_source())
        .await
        .context("establishing session")?;

    info!(instance_name = %client.instance_name(), "Session ready");

    let access = SynadiaAccess::new(args.saas_key).with_base_url(args.base_url);

    let teams = client
        .list_teams(&ListTeamsRequest::new(access.clone()))
        .await
        .context("listing teams")?;
    println!("{}", serde_json::to_string_pretty(&teams)?);

    let Some(team_id) = teams.first_id() else {
        warn!("No teams visible to this token");
        return Ok(());
    };

    let team = client
        .get_team(&GetTeamRequest::new(access, team_id))
        .await
        .with_context(|| format!("fetching team {team_id}"))?;
    println!("{}", serde_json::to_string_pretty(&team)?);

    Ok(())
}
