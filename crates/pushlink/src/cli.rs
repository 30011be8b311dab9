//! Clap derive structures for the `pushlink` CLI.
//!
//! Defines the command tree, global flags, and argument parsers shared by
//! the handlers.

use clap::{Args, Parser, Subcommand, ValueEnum};

use pushlink_api::Collection;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pushlink -- register this host for push delivery and manage backend entities
#[derive(Debug, Parser)]
#[command(
    name = "pushlink",
    version,
    about = "Device registration and backend entity management for pushlink",
    long_about = "Drives the push registration handshake against a pushlink backend:\n\
        account token, login cookie, push registration id, device record.\n\n\
        Also exposes the backend's device/user/publication/subscription\n\
        collections for direct inspection.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "PUSHLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(long, short = 'b', env = "PUSHLINK_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PUSHLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "PUSHLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register an account for push delivery
    #[command(alias = "reg")]
    Register(RegisterArgs),

    /// Restart the handshake for the configured account
    Reregister(WaitArgs),

    /// Drop the push registration and the backend device record
    Unregister(WaitArgs),

    /// Unregister if needed, then forget the account
    Clear(WaitArgs),

    /// Show the persisted registration state
    #[command(alias = "st")]
    Status,

    /// Inspect and edit backend collections
    #[command(alias = "res", alias = "r")]
    Resource(ResourceArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),
}

// ── Registration ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WaitArgs {
    /// Seconds to wait for the handshake to settle
    #[arg(long, default_value = "60")]
    pub wait: u64,

    /// Registration id the push transport hands back (there is no
    /// platform push service on a desktop host)
    #[arg(long, env = "PUSHLINK_REG_ID")]
    pub reg_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Account name (defaults to the profile's `account`)
    pub account: Option<String>,

    #[command(flatten)]
    pub wait: WaitArgs,
}

// ── Resources ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ResourceArgs {
    #[command(subcommand)]
    pub command: ResourceCommand,
}

#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// List every entity in a collection
    #[command(alias = "ls")]
    List {
        /// device, user, publication, subscription
        #[arg(value_parser = parse_collection)]
        collection: Collection,
    },

    /// Fetch one entity
    Get {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        key: String,
    },

    /// Create an entity from key=value fields
    Create {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        #[arg(value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Replace an entity's fields
    Update {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        key: String,
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Delete one entity, or the whole collection with --all
    #[command(alias = "rm")]
    Delete {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        key: Option<String>,
        /// Delete every entity in the collection
        #[arg(long)]
        all: bool,
    },

    /// Post a message to an entity's message endpoint
    #[command(alias = "msg")]
    Message {
        #[arg(value_parser = parse_collection)]
        collection: Collection,
        key: String,
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or replace a profile
    Init(InitArgs),

    /// Show the current configuration
    Show,

    /// Set a profile field
    Set {
        /// Profile field name
        key: String,
        /// New value
        value: String,
    },

    /// Store the active profile's auth token in the system keyring
    SetToken,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Print the config and state file locations
    Path,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Backend application name
    #[arg(long)]
    pub app_name: String,

    /// Push sender id
    #[arg(long)]
    pub sender_id: String,

    /// Backend base URL (defaults to https://<app-name>.appspot.com)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Default account to register
    #[arg(long)]
    pub account: Option<String>,

    /// Resource label sent with the device record
    #[arg(long, default_value = "")]
    pub resource: String,

    /// Device id (a random one is generated if omitted)
    #[arg(long)]
    pub device_id: Option<String>,

    /// Environment variable holding the auth token
    #[arg(long)]
    pub auth_token_env: Option<String>,
}

// ── Value parsers ────────────────────────────────────────────────────

fn parse_collection(raw: &str) -> Result<Collection, String> {
    Collection::from_name(raw).ok_or_else(|| {
        format!("unknown collection '{raw}' (expected device, user, publication, subscription)")
    })
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty field name in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}
