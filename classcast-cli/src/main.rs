mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "classcast")]
#[command(about = "Real-time classroom sessions over a WebRTC mesh")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay server.
    Relay {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// STUN/TURN url pushed to every participant on join. Repeatable.
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,
    },

    /// Join a session through a relay with synthetic camera and microphone.
    Join {
        /// Session url, e.g. ws://localhost:8080/session/math-101
        #[arg(long)]
        url: String,

        /// Participant id (UUID or number). Random when omitted.
        #[arg(long)]
        participant: Option<String>,

        #[arg(long)]
        no_audio: bool,

        #[arg(long)]
        no_video: bool,
    },

    /// Run an in-process mesh and print every peer's state.
    Demo {
        #[arg(long, default_value_t = 3)]
        participants: usize,

        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Relay { bind, ice_servers } => commands::relay(bind, ice_servers).await,
        Commands::Join {
            url,
            participant,
            no_audio,
            no_video,
        } => commands::join(&url, participant.as_deref(), !no_audio, !no_video).await,
        Commands::Demo {
            participants,
            seconds,
        } => commands::demo(participants, seconds).await,
    }
}
