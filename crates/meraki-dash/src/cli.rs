//! Clap derive structures for the `meraki-dash` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// meraki-dash -- poll a Meraki Dashboard organization from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "meraki-dash",
    version,
    about = "Poll Cisco Meraki Dashboard sensors, access points and switches",
    long_about = "Reads a Meraki Dashboard organization through the v1 API.\n\n\
        Lists organizations, networks and devices, reads MT sensors on demand,\n\
        and runs the full hub/coordinator poller with `watch`.",
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
    /// Config profile to use
    #[arg(long, short = 'p', env = "MERAKI_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Dashboard API key (overrides profile and keyring)
    #[arg(long, env = "MERAKI_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Dashboard API base URL (must be a regional endpoint)
    #[arg(long, env = "MERAKI_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Organization ID (defaults to the first one the key can see)
    #[arg(long, env = "MERAKI_ORGANIZATION_ID", global = true)]
    pub org: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MERAKI_OUTPUT",
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
    #[arg(long, env = "MERAKI_TIMEOUT", global = true)]
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

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Device family filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceFamily {
    /// Environmental sensors
    Mt,
    /// Wireless access points
    Mr,
    /// Switches
    Ms,
    /// Cameras
    Mv,
}

impl From<DeviceFamily> for meraki_core::DeviceType {
    fn from(family: DeviceFamily) -> Self {
        match family {
            DeviceFamily::Mt => Self::Mt,
            DeviceFamily::Mr => Self::Mr,
            DeviceFamily::Ms => Self::Ms,
            DeviceFamily::Mv => Self::Mv,
        }
    }
}

/// Entity platform filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformFilter {
    Sensor,
    BinarySensor,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List organizations visible to the API key
    #[command(alias = "org")]
    Orgs(OrgsArgs),

    /// List networks in the organization
    #[command(alias = "net", alias = "n")]
    Networks(NetworksArgs),

    /// List devices in the organization
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Read MT sensors once
    #[command(alias = "mt")]
    Sensors(SensorsArgs),

    /// List the entities a poll produces
    #[command(alias = "ent", alias = "e")]
    Entities(EntitiesArgs),

    /// Run the poller and stream state changes and events
    Watch(WatchArgs),

    /// Dump a diagnostics snapshot of a full poll
    #[command(alias = "diag")]
    Diagnostics,

    /// Poll every hub once more and report the hubs that failed
    Refresh,

    /// Run device discovery on every network hub
    Discover,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Orgs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct OrgsArgs {
    #[command(subcommand)]
    pub command: OrgsCommand,
}

#[derive(Debug, Subcommand)]
pub enum OrgsCommand {
    /// List organizations
    #[command(alias = "ls")]
    List,
}

// ── Networks ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NetworksArgs {
    #[command(subcommand)]
    pub command: NetworksCommand,
}

#[derive(Debug, Subcommand)]
pub enum NetworksCommand {
    /// List networks
    #[command(alias = "ls")]
    List,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        /// Only devices of this family
        #[arg(long = "type", short = 't')]
        device_type: Option<DeviceFamily>,

        /// Only devices in this network
        #[arg(long)]
        network: Option<String>,
    },
}

// ── Sensors ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SensorsArgs {
    #[command(subcommand)]
    pub command: SensorsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SensorsCommand {
    /// Fetch the latest reading of every MT sensor
    Read {
        /// Limit to these serials (repeatable)
        #[arg(long, short = 's')]
        serial: Vec<String>,
    },
}

// ── Entities ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    #[command(subcommand)]
    pub command: EntitiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum EntitiesCommand {
    /// Run one full poll and list every entity with its state
    #[command(alias = "ls")]
    List {
        /// Only entities of this platform
        #[arg(long)]
        platform: Option<PlatformFilter>,

        /// Only entities of this device serial
        #[arg(long, short = 's')]
        serial: Option<String>,

        /// Hide unavailable entities
        #[arg(long)]
        available: bool,
    },
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Print sensor events only, not every state change
    #[arg(long)]
    pub events_only: bool,

    /// Only events and changes for these serials (repeatable)
    #[arg(long, short = 's')]
    pub serial: Vec<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Validate the active profile as a config entry (no network calls)
    Validate,

    /// Display the resolved profile with secrets redacted
    Show,

    /// Print the config file path
    Path,

    /// Store an API key in the system keyring
    SetKey,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
