//! `slotswap` CLI — drive the slot-swap engine against a JSON state file.
//!
//! ## Usage
//!
//! ```sh
//! # Register users and give them slots (new slots start BUSY)
//! slotswap --state team.json add-user --name Alice --email alice@example.com
//! slotswap --state team.json add-slot --user 1 --title Standup \
//!     --start 2026-03-02T09:00:00Z --end 2026-03-02T10:00:00Z
//!
//! # Offer a slot on the marketplace and browse other users' offers
//! slotswap --state team.json set-status --user 1 --slot 1 --status swappable
//! slotswap --state team.json swappable --user 2
//!
//! # Propose, then answer as the target user
//! slotswap --state team.json propose --user 2 --my-slot 2 --their-slot 1
//! slotswap --state team.json respond --user 1 --request 1 --accept
//!
//! # Engine policy from TOML, debug logs on stderr
//! slotswap --config policy.toml -vv --state team.json cancel --user 2 --request 3
//! ```
//!
//! Results are printed as pretty JSON on stdout. On failure the error goes
//! to stderr and the process exits with 1 for a rejected operation or 2 for
//! a storage, I/O, or configuration problem. The state file is only
//! rewritten after a mutating command succeeds.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use slot_swap::{
    EngineConfig, Marketplace, MemoryStore, RequestId, SlotDetails, SlotId, SlotStatus,
    StoreError, StoreSnapshot, SwapEngine, SwapError, UserId,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "slotswap",
    version,
    about = "Swap calendar slots between users"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON state file (created on first write if missing)
    #[arg(long, global = true, default_value = "slotswap.json")]
    state: PathBuf,

    /// TOML file with engine policy switches
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Create a BUSY slot for a user
    AddSlot {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        title: String,
        /// Start time (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// End time (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
    },
    /// List or unlist one of your slots on the marketplace
    SetStatus {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        slot: u64,
        #[arg(long, value_enum)]
        status: StatusArg,
    },
    /// Offer one of your slots for another user's swappable slot
    Propose {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        my_slot: u64,
        #[arg(long)]
        their_slot: u64,
    },
    /// Accept or reject a request addressed to you
    Respond {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        request: u64,
        #[command(flatten)]
        decision: Decision,
    },
    /// Withdraw a pending request you made
    Cancel {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        request: u64,
    },
    /// Show swappable slots owned by other users
    Swappable {
        #[arg(long)]
        user: u64,
    },
    /// Show requests addressed to a user
    Incoming {
        #[arg(long)]
        user: u64,
    },
    /// Show requests made by a user
    Outgoing {
        #[arg(long)]
        user: u64,
    },
    /// Show a user's own slots
    Slots {
        #[arg(long)]
        user: u64,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Decision {
    #[arg(long)]
    accept: bool,
    #[arg(long)]
    reject: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Busy,
    Swappable,
}

impl From<StatusArg> for SlotStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Busy => SlotStatus::Busy,
            StatusArg::Swappable => SlotStatus::Swappable,
        }
    }
}

impl Commands {
    fn is_mutating(&self) -> bool {
        matches!(
            self,
            Commands::AddUser { .. }
                | Commands::AddSlot { .. }
                | Commands::SetStatus { .. }
                | Commands::Propose { .. }
                | Commands::Respond { .. }
                | Commands::Cancel { .. }
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let store = Arc::new(load_store(&cli.state)?);
    let engine = SwapEngine::with_config(Arc::clone(&store), config);
    let market = Marketplace::new(Arc::clone(&store));
    let mutating = cli.command.is_mutating();

    match cli.command {
        Commands::AddUser { name, email } => print_json(&store.register_user(&name, &email)?)?,
        Commands::AddSlot {
            user,
            title,
            start,
            end,
        } => {
            let details = SlotDetails {
                title,
                start_time: start,
                end_time: end,
            };
            print_json(&store.create_slot(UserId(user), details)?)?
        }
        Commands::SetStatus { user, slot, status } => {
            print_json(&engine.set_slot_status(UserId(user), SlotId(slot), status.into())?)?
        }
        Commands::Propose {
            user,
            my_slot,
            their_slot,
        } => print_json(&engine.propose(UserId(user), SlotId(my_slot), SlotId(their_slot))?)?,
        Commands::Respond {
            user,
            request,
            decision,
        } => {
            let request = if decision.accept {
                engine.accept(RequestId(request), UserId(user))?
            } else {
                engine.reject(RequestId(request), UserId(user))?
            };
            print_json(&request)?
        }
        Commands::Cancel { user, request } => {
            print_json(&engine.cancel(RequestId(request), UserId(user))?)?
        }
        Commands::Swappable { user } => print_json(&market.list_swappable_slots(UserId(user))?)?,
        Commands::Incoming { user } => print_json(&market.list_incoming_requests(UserId(user))?)?,
        Commands::Outgoing { user } => print_json(&market.list_outgoing_requests(UserId(user))?)?,
        Commands::Slots { user } => print_json(&store.list_user_slots(UserId(user))?)?,
    }

    if mutating {
        store
            .snapshot()
            .save(&cli.state)
            .map_err(|e| anyhow!("failed to save state: {}", e))?;
        debug!(path = %cli.state.display(), "state saved");
    }
    Ok(())
}

/// Map a failure to the process exit code: 1 when the operation itself was
/// refused, 2 for anything environmental. A bare `StoreError::Constraint`
/// comes from the record surface (duplicate email, inverted times) and counts
/// as a refusal; a store failure inside an engine transaction does not.
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(swap) = cause.downcast_ref::<SwapError>() {
            return if swap.is_validation() { 1 } else { 2 };
        }
        if let Some(StoreError::Constraint(_)) = cause.downcast_ref::<StoreError>() {
            return 1;
        }
    }
    2
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    // Config problems are environmental; keep the typed error out of the chain.
    EngineConfig::from_toml_str(&text).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

fn load_store(path: &Path) -> Result<MemoryStore> {
    let snapshot =
        StoreSnapshot::load(path).map_err(|e| anyhow!("failed to load state: {}", e))?;
    let store = MemoryStore::from_snapshot(snapshot)
        .map_err(|e| anyhow!("state file {} is inconsistent: {}", path.display(), e))?;
    info!(path = %path.display(), "state loaded");
    Ok(store)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", pretty);
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// the `-v` count when set.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
