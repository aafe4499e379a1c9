//! Parley relay admin binary.
//!
//! Operates on a relay's redb database.
//!
//! # Usage
//!
//! ```bash
//! # Run fan-out for an actor joining a room with existing occupants
//! parley-server --db relay.redb join --actor bob --room r1 --peers alice,carol
//!
//! # List the session records of a room
//! parley-server --db relay.redb sessions --room r1
//! ```

use clap::{Parser, Subcommand};
use parley_server::{RedbStorage, RoomFanoutCoordinator, Storage, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Parley relay administration
#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(about = "Parley relay session administration")]
#[command(version)]
struct Args {
    /// Path to the relay database
    #[arg(long, default_value = "parley.redb")]
    db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Establish sessions between an actor and the occupants of a room
    Join {
        /// Joining actor
        #[arg(long)]
        actor: String,

        /// Room being joined
        #[arg(long)]
        room: String,

        /// Actors already present
        #[arg(long, value_delimiter = ',')]
        peers: Vec<String>,

        /// Extra attempts per persistence call
        #[arg(long, default_value = "2")]
        retries: u32,
    },

    /// List the durable session records of a room
    Sessions {
        /// Room to list
        #[arg(long)]
        room: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Opening relay database {}", args.db);
    let storage = RedbStorage::open(&args.db)?;

    match args.command {
        Command::Join { actor, room, peers, retries } => {
            let fanout = RoomFanoutCoordinator::with_retries(SystemEnv::new(), storage, retries);
            let report =
                fanout.establish_pairwise_sessions(&actor, &room, peers.iter().map(String::as_str));

            tracing::info!(
                created = ?report.created,
                existing = ?report.existing,
                failed = report.failed.len(),
                "{actor} joined {room}"
            );
        },
        Command::Sessions { room } => {
            let sessions = storage.list_room_sessions(&room)?;
            tracing::info!("{} session records in {room}", sessions.len());

            for session in sessions {
                tracing::info!(
                    session = %session.session_key,
                    messages = session.message_counter,
                    created_at = session.created_at_secs,
                    "session"
                );
            }
        },
    }

    Ok(())
}
