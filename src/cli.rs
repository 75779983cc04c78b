use clap::{Parser, Subcommand};

/// slicectl — operator CLI for testbed slice provisioning
#[derive(Parser)]
#[command(name = "slicectl", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a single-node slice and wait for it to stabilize
    Create {
        /// Target site; defaults to a site picked by the testbed
        #[arg(long)]
        site: Option<String>,

        /// Node image
        #[arg(long, default_value = "default_ubuntu_20")]
        image: String,

        /// CPU cores for the node
        #[arg(long, default_value_t = 2)]
        cores: u32,

        /// RAM in GB
        #[arg(long, default_value_t = 4)]
        ram: u32,

        /// Disk in GB
        #[arg(long, default_value_t = 10)]
        disk: u32,

        /// Slice name prefix; a Unix timestamp is appended for uniqueness
        #[arg(long, default_value = "wsl-demo")]
        name_prefix: String,

        /// Seconds to wait for the slice to reach a stable state
        #[arg(long, env = "SLICECTL_TIMEOUT_SECS", default_value_t = 600)]
        timeout: u64,

        /// Seconds between state polls
        #[arg(long, env = "SLICECTL_POLL_SECS", default_value_t = 15)]
        poll: u64,
    },

    /// List slices with node management IPs and SSH commands
    List {
        /// Only show slices matching this name
        #[arg(long)]
        name: Option<String>,

        /// Include Dead/Closing slices (default: active only)
        #[arg(long)]
        all: bool,

        /// Show project slices (not just your own)
        #[arg(long)]
        project: bool,
    },

    /// Verify configuration and renew bastion keys if needed
    RenewKeys,
}
