//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cloudpush_push::{PushOptions, RouteHints};

/// Push application bits to a Cloud Foundry v2 API.
///
/// The access token is read from `CLOUDPUSH_ACCESS_TOKEN`, never from
/// the command line.
#[derive(Parser, Debug)]
#[command(name = "cloudpush", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or update an application and upload its bits
    Push(PushArgs),
    /// Show or change the stored configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Application name
    pub app: String,

    /// Guid of the space the application lives in
    #[arg(long)]
    pub space: String,

    /// Application directory
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Route host; defaults to the application name
    #[arg(long)]
    pub host: Option<String>,

    /// Route domain; defaults to the first available domain
    #[arg(long)]
    pub domain: Option<String>,

    /// Fail when the same path appears twice with different content
    #[arg(long)]
    pub strict_resources: bool,
}

impl PushArgs {
    pub fn into_options(self) -> PushOptions {
        PushOptions {
            app_name: self.app,
            space_guid: self.space,
            path: self.path,
            route: RouteHints {
                host: self.host,
                domain: self.domain,
            },
            strict_resources: self.strict_resources,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Cloud Controller base URL
    #[arg(long)]
    pub api: Option<String>,

    /// Accept any TLS certificate
    #[arg(long)]
    pub skip_ssl_validation: Option<bool>,

    /// Seconds between job polls
    #[arg(long)]
    pub polling_interval: Option<u64>,

    /// Seconds a staging job may take
    #[arg(long)]
    pub polling_timeout: Option<u64>,
}

impl ConfigArgs {
    pub fn is_empty(&self) -> bool {
        self.api.is_none()
            && self.skip_ssl_validation.is_none()
            && self.polling_interval.is_none()
            && self.polling_timeout.is_none()
    }
}
