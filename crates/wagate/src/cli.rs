//! Clap derive structures for the `wagate` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. Only
//! depends on clap so build.rs can pull it in for man page generation.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wagate -- manage messaging gateway devices from the command line
#[derive(Debug, Parser)]
#[command(
    name = "wagate",
    version,
    about = "Manage messaging gateway devices from the command line",
    long_about = "Sign in to a multi-device messaging gateway, pair and manage device\n\
        sessions, send messages, and follow live QR and connection events.",
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
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "WAGATE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL, including the /api prefix (overrides profile)
    #[arg(long, short = 'u', env = "WAGATE_API_BASE_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WAGATE_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "WAGATE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Sign in, register, and inspect the current session
    Auth(AuthArgs),

    /// Manage device sessions
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Send messages through a connected device
    #[command(alias = "msg", alias = "m")]
    Messages(MessagesArgs),

    /// Follow QR and connection events for a device session
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in with email and password
    Login {
        /// Account email (prompted when omitted)
        #[arg(long, short = 'e')]
        email: Option<String>,

        /// Account password (prompted when omitted)
        #[arg(long, env = "WAGATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        /// Display name (prompted when omitted)
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// Account email (prompted when omitted)
        #[arg(long, short = 'e')]
        email: Option<String>,

        /// Contact phone number
        #[arg(long)]
        phone: Option<String>,

        /// Account password (prompted when omitted)
        #[arg(long, env = "WAGATE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and forget the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show profile, gateway, and session state
    Status,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List device sessions
    #[command(alias = "ls")]
    List,

    /// Create a device session
    Create {
        /// Session name (unique per account)
        session_name: String,
    },

    /// Get the pairing QR code for a device
    Qr {
        /// Device ID or session name
        device: String,

        /// QR encoding to request
        #[arg(long, short = 'f', default_value = "image")]
        format: QrOutput,

        /// Write the QR image to this PNG file
        #[arg(long, short = 's', value_name = "PATH")]
        save: Option<PathBuf>,
    },

    /// Delete a device session
    #[command(alias = "rm")]
    Delete {
        /// Device ID or session name
        device: String,
    },

    /// Restart a device session
    Reconnect {
        /// Device ID or session name
        device: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QrOutput {
    /// PNG data URL plus the raw pairing string
    Image,
    /// Raw pairing string only
    Raw,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MESSAGES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MessagesArgs {
    #[command(subcommand)]
    pub command: MessagesCommand,
}

#[derive(Debug, Subcommand)]
pub enum MessagesCommand {
    /// Send a text, image, or document message
    #[command(group(
        ArgGroup::new("content")
            .required(true)
            .args(["text", "image", "document"])
    ))]
    Send {
        /// Device ID or session name to send from
        device: String,

        /// Recipient phone number
        to: String,

        /// Message text
        #[arg(long, short = 't')]
        text: Option<String>,

        /// Image file to attach
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,

        /// Document file to attach
        #[arg(long, value_name = "PATH")]
        document: Option<PathBuf>,

        /// Caption for an image or document
        #[arg(long, short = 'c', conflicts_with = "text")]
        caption: Option<String>,
    },

    /// Check whether a device can send right now
    Check {
        /// Device ID or session name
        device: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Session name to follow
    pub session: String,

    /// Keep following after the device connects
    #[arg(long)]
    pub follow: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file and token locations
    Path,

    /// Set the API base URL of the active profile
    SetUrl {
        /// API base URL, e.g. https://gateway.example.com/api
        url: String,
    },

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
