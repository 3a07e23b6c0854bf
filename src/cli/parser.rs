use clap::{Parser, Subcommand, ValueEnum};

/// Command-line interface definition for rfieldclock
/// Offline-first field attendance client with an encrypted sync queue
#[derive(Parser)]
#[command(
    name = "rfieldclock",
    version = env!("CARGO_PKG_VERSION"),
    about = "Offline-first field attendance and incident client: punches, incidents and an encrypted sync queue",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    /// Act as this (previously logged-in) user instead of the last one
    #[arg(global = true, long = "user")]
    pub user: Option<String>,

    /// Override the remote server base URL
    #[arg(global = true, long = "remote")]
    pub remote: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CaptureMethod {
    Pin,
    Qr,
    Face,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database, the device key and the configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/vim/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Log in online, or offline against the credential cache
    Login {
        username: String,

        /// Password (falls back to $RFIELDCLOCK_PASSWORD)
        #[arg(long = "password", env = "RFIELDCLOCK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the current session (cached credentials stay)
    Logout,

    /// Record a check-in or check-out (kind is decided automatically)
    Punch {
        #[arg(long, value_enum, default_value = "qr")]
        method: CaptureMethod,

        /// Latitude of the device
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude of the device
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// 4-digit PIN (method pin only)
        #[arg(long)]
        pin: Option<String>,

        /// Pretend the punch happens at this RFC 3339 instant
        #[arg(long, hide = true)]
        at: Option<String>,
    },

    /// Report an incident, or list incidents and eligible dates
    Incident {
        /// Incident type (e.g. "medical", "permission")
        #[arg(long = "type", required_unless_present_any = ["list", "eligible"])]
        kind: Option<String>,

        #[arg(long, required_unless_present_any = ["list", "eligible"])]
        description: Option<String>,

        /// Date being justified (YYYY-MM-DD)
        #[arg(long, required_unless_present_any = ["list", "eligible"])]
        date: Option<String>,

        /// Files to attach
        #[arg(long = "attach")]
        attach: Vec<String>,

        #[arg(long, conflicts_with = "eligible", help = "List submitted incidents")]
        list: bool,

        #[arg(long, help = "List dates that can still be justified")]
        eligible: bool,

        #[arg(long, hide = true)]
        at: Option<String>,
    },

    /// Show reconciled daily attendance and statistics
    History {
        #[arg(
            long = "period",
            short = 'p',
            help = "Filter by year/month/day (YYYY, YYYY-MM, YYYY-MM-DD)"
        )]
        period: Option<String>,
    },

    /// Drain the pending queue once
    Sync,

    /// Show reachability, pending entries and offline expiration
    Status {
        #[arg(long, hide = true)]
        at: Option<String>,
    },

    /// Inspect the pending mutation queue
    Queue {
        /// Show every stored entry of every user, without decrypting
        #[arg(long)]
        all: bool,
    },

    /// List and manage notifications
    Notifications {
        #[arg(long = "read", value_name = "ID", help = "Mark a notification as read")]
        read: Option<String>,

        #[arg(long = "read-all", help = "Mark every notification as read")]
        read_all: bool,

        #[arg(long = "hide", value_name = "ID", help = "Hide a notification")]
        hide: Option<String>,

        #[arg(long = "unread", help = "Only print the unread count")]
        unread: bool,
    },

    /// Synthesize absences for weekdays with missing punches
    Backfill {
        #[arg(long, hide = true)]
        at: Option<String>,
    },

    /// Keep syncing in the foreground until Ctrl-C
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Print or manage the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,

        #[arg(
            long = "op",
            value_name = "OPERATION",
            help = "Only rows of this operation (punch, queue, sync, backfill, login, init...)"
        )]
        operation: Option<String>,

        #[arg(long = "tail", value_name = "N", help = "Only the last N rows")]
        tail: Option<usize>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Run an integrity check on the database")]
        check: bool,

        #[arg(long = "vacuum", help = "Compact the database file")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database statistics")]
        info: bool,
    },
}
