use clap::{Parser, Subcommand};
use log::{error, info};
use ringkeeper::{logging::init_logging, ChordPeer, NodeId, PeerConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "ringkeeper")]
#[command(about = "A Chord ring-maintenance node")]
struct Cli {
    /// JSON config file; command-line flags override its values
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long = "log-level", global = true)]
    log_level: Option<String>,

    /// Fixed ring identifier, as a decimal number
    #[arg(long = "id", global = true)]
    id: Option<NodeId>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new bootstrap node (first node in the network)
    #[command(name = "start-bootstrap")]
    StartBootstrap {
        /// Optional gRPC port (random if not specified)
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Join an existing ring through a bootstrap node
    #[command(name = "join")]
    Join {
        /// Local gRPC port for this node (random if not specified)
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
        /// Port of the bootstrap node to connect to
        #[arg(short = 'b', long = "bootstrap-port")]
        bootstrap_port: u16,
        /// Bootstrap node host (default: 127.0.0.1)
        #[arg(short = 'n', long = "host", default_value = "127.0.0.1")]
        host: String,
    },
}

fn build_config(cli: Cli) -> Result<PeerConfig, String> {
    let mut config = match &cli.config {
        Some(path) => PeerConfig::load(path).map_err(|e| e.to_string())?,
        None => PeerConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if cli.id.is_some() {
        config.node_id = cli.id;
    }
    match cli.command {
        Commands::StartBootstrap { port } => {
            config.port = port.or(config.port);
            config.join = None;
        }
        Commands::Join {
            port,
            bootstrap_port,
            host,
        } => {
            config.port = port.or(config.port);
            config.join = Some(format!("{}:{}", host, bootstrap_port));
        }
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = build_config(Cli::parse())?;
    init_logging(&config.log_level, config.log_config.as_deref())
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    let bootstrap = config.is_bootstrap();
    let mut peer = ChordPeer::bind(config)
        .await
        .map_err(|e| format!("Failed to create peer: {}", e))?;

    let local = peer.local().clone();
    if bootstrap {
        info!("Starting bootstrap node {} on {}", local.id, local.endpoint);
    } else {
        info!("Starting node {} on {}", local.id, local.endpoint);
    }

    let mut events = peer.subscribe();
    if let Err(e) = peer.start().await {
        error!("Failed to start node: {}", e);
        peer.shutdown().await;
        return Err(format!("Failed to start node: {}", e));
    }
    if bootstrap {
        info!("Other nodes can join using: ringkeeper join -b <PORT> -n <HOST> (this node: {})", local.endpoint);
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Received shutdown signal");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => info!("Ring event: {:?}", event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    info!("Missed {} ring events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    peer.shutdown().await;
    info!("Node shut down gracefully");
    Ok(())
}
