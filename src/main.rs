//! WolfConsensus - Cluster Consensus Core
//!
//! Command line tooling for the consensus core: configuration management,
//! audit trail inspection and a single-node simulation.

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfconsensus::agent::{epoch_clock_ms, AgentRunner, ConsensusAgent};
use wolfconsensus::audit::{AuditLog, AuditReader};
use wolfconsensus::config::ConsensusConfig;
use wolfconsensus::error::{Error, Result};
use wolfconsensus::session::{NullAuthenticator, SessionState, TracingEgress};

/// WolfConsensus - Cluster Consensus Core
#[derive(Parser)]
#[command(name = "wolfconsensus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfconsensus.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error), overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfconsensus.toml")]
        output: PathBuf,

        /// Cluster member id
        #[arg(long, default_value_t = 0)]
        member_id: i32,
    },

    /// Validate configuration file
    Validate,

    /// Print the events in an audit trail
    Decode {
        /// Audit trail file
        file: PathBuf,

        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },

    /// Elect this node as sole leader and admit two sessions
    Simulate {
        /// How long to run the duty cycle
        #[arg(short, long, default_value_t = 100)]
        duration_ms: u64,

        /// Audit trail file, overrides the config file
        #[arg(short, long)]
        audit: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the config file when it parses
    let logging = ConsensusConfig::from_file(&cli.config)
        .map(|c| c.logging)
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    init_logging(&level, &logging.format);

    match cli.command {
        Commands::Init { output, member_id } => run_init(output, member_id),
        Commands::Validate => run_validate(cli.config),
        Commands::Decode { file, json } => run_decode(file, json),
        Commands::Simulate { duration_ms, audit } => run_simulate(cli.config, duration_ms, audit).await,
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Write a default configuration file
fn run_init(output: PathBuf, member_id: i32) -> Result<()> {
    if output.exists() {
        return Err(Error::Config(format!("{:?} already exists", output)));
    }

    let mut config = ConsensusConfig::default();
    config.node.member_id = member_id;
    config.validate()?;

    let content = format!(
        "# WolfConsensus Configuration\n# Generated configuration file\n\n{}",
        config.to_toml()?
    );
    std::fs::write(&output, content)?;

    println!("✓ Configuration written to {:?}", output);
    println!("  Edit [node] cluster_members before starting a cluster");
    Ok(())
}

/// Validate configuration file
fn run_validate(config_path: PathBuf) -> Result<()> {
    match ConsensusConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Member ID: {}", config.node.member_id);
            println!("  Cluster Members: {}", config.node.cluster_members.len());
            println!("  Max Canvass Retries: {}", config.election.max_canvass_retries);
            println!("  Duty Cycle: {:?}", config.duty_cycle_interval());
            println!(
                "  Max Principal Length: {} bytes",
                config.session.max_encoded_principal_length
            );
            match config.audit_path() {
                Some(path) => println!("  Audit Trail: {:?}", path),
                None => println!("  Audit Trail: disabled"),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Print every event in an audit trail
fn run_decode(file: PathBuf, json: bool) -> Result<()> {
    let data = std::fs::read(&file)?;
    let mut count = 0u64;

    for event in AuditReader::new(&data) {
        let event = event?;
        if json {
            let line = serde_json::to_string(&event).map_err(|e| Error::Internal(e.to_string()))?;
            println!("{}", line);
        } else {
            println!("{}", event);
        }
        count += 1;
    }

    if !json {
        println!("{} events", count);
    }
    Ok(())
}

/// Run a single-member cluster for `duration_ms`
async fn run_simulate(config_path: PathBuf, duration_ms: u64, audit: Option<PathBuf>) -> Result<()> {
    let config = if config_path.exists() {
        ConsensusConfig::from_file(&config_path)?
    } else {
        tracing::warn!("No configuration at {:?}, using defaults", config_path);
        ConsensusConfig::default()
    };

    let member_id = config.node.member_id;
    let mut agent = ConsensusAgent::new(&config, Box::new(NullAuthenticator), TracingEgress::new());

    if let Some(path) = audit.or_else(|| config.audit_path().cloned()) {
        let file = File::create(&path)?;
        agent.add_observer(Box::new(AuditLog::new(file, config.audit.buffer_capacity)));
        tracing::info!("Writing audit trail to {:?}", path);
    }

    let now_ms = epoch_clock_ms();
    let term = agent.bootstrap_sole_leader(now_ms)?;
    tracing::info!("Member {} leads {}", member_id, term);

    let client = agent.on_session_connect("client-egress", false, &[], now_ms)?;
    let backup = agent.on_session_connect("backup-egress", true, &[], now_ms)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(duration_ms)) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
            }
        }
        let _ = shutdown_tx.send(true);
    });

    let cycles = AgentRunner::new(config.duty_cycle_interval())
        .run(&mut agent, shutdown_rx)
        .await?;

    let authenticated = [client, backup]
        .iter()
        .filter_map(|id| agent.sessions().get(*id))
        .filter(|s| s.state() == SessionState::Authenticated)
        .count();

    println!("✓ Simulation finished");
    println!("  Member ID: {}", member_id);
    println!("  Duty Cycles: {}", cycles);
    println!("  Election Transitions: {}", agent.election().trail().len());
    println!("  Sessions Authenticated: {}/2", authenticated);
    println!("  Egress Messages: {}", agent.egress().sent());
    Ok(())
}
