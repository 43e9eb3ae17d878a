use std::ffi::OsString;

use clap::{ArgGroup, Parser};
use kubeconf::csr::{DEFAULT_KEY_BITS, DEFAULT_TIMEOUT};
use kubeconf::locate::KUBECONFIG;
use kubeconf::update::DEFAULT_RELEASE_REPO;

/// Switch, prune, merge and provision kubeconfig contexts.
///
/// Without an action flag an interactive list selects the current context.
#[derive(Parser, Debug)]
#[command(name = "kc", disable_version_flag = true)]
#[command(group(
    ArgGroup::new("action")
        .args(["version", "update", "dry_update", "delete", "add", "add_user"])
))]
#[command(group(ArgGroup::new("edit").args(["delete", "add"])))]
pub struct Args {
    /// Show version
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Update kc to the newest release
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Show what an update would do
    #[arg(short = 'U', long)]
    pub dry_update: bool,

    /// Choose a context to delete; unused clusters and users go with it
    #[arg(short = 'd', long)]
    pub delete: bool,

    /// Merge this file into the kubeconfig. Use - to read from stdin
    #[arg(short = 'a', long = "add", value_name = "FILE")]
    pub add: Option<String>,

    /// Add a user context with a certificate issued by the cluster
    #[arg(long = "add-user", visible_alias = "au")]
    pub add_user: bool,

    /// Kubeconfig to work on; a path list uses its first entry
    #[arg(long, env = KUBECONFIG, value_name = "PATH", hide_env_values = true)]
    pub kubeconfig: Option<OsString>,

    /// Inline certificate files referenced by the merged file
    #[arg(long, requires = "add")]
    pub inline: bool,

    /// Print the resulting changes as a diff instead of writing them
    #[arg(long, requires = "edit")]
    pub dry_run: bool,

    /// RSA key size for new user certificates
    #[arg(long, default_value_t = DEFAULT_KEY_BITS, value_name = "BITS")]
    pub key_bits: u32,

    /// Seconds to wait for the cluster to issue a certificate
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs(), value_name = "SECS")]
    pub timeout: u64,

    /// GitHub repository releases are fetched from
    #[arg(long, env = "KC_RELEASE_REPO", default_value = DEFAULT_RELEASE_REPO, value_name = "OWNER/REPO")]
    pub release_repo: String,

    /// More log output; repeat for more
    #[arg(long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
