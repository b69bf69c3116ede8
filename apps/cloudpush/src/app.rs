//! Runs the parsed command.

use anyhow::{Context, bail};
use cloudpush_cc::Client;
use cloudpush_config::{Config, ENV_API, config_path};
use cloudpush_push::{CcActor, PushCoordinator, PushEvent};
use tracing::{info, warn};

use crate::cli::{Cli, Command, ConfigArgs, PushArgs};

/// Environment variable holding the bearer token.
pub const ENV_ACCESS_TOKEN: &str = "CLOUDPUSH_ACCESS_TOKEN";

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Push(args) => push(args).await,
        Command::Config(args) => configure(args),
    }
}

async fn push(args: PushArgs) -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    if config.api.is_empty() {
        bail!("no API endpoint configured: run `cloudpush config --api <URL>` or set {ENV_API}");
    }
    let token = std::env::var(ENV_ACCESS_TOKEN)
        .with_context(|| format!("{ENV_ACCESS_TOKEN} is not set"))?;

    let client = Client::new(&config.client_config(token)).context("building API client")?;
    let actor = CcActor::new(client);
    let mut coordinator = PushCoordinator::new(config.polling());

    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling push");
            cancel.cancel();
        }
    });

    let reporter = coordinator.take_events().map(|mut events| {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                report(&event);
            }
        })
    });

    let options = args.into_options();
    info!(app = %options.app_name, path = %options.path.display(), "pushing");
    let out = coordinator.push(&actor, &options).await;

    // Closing the channel ends the reporter.
    drop(coordinator);
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }

    for warning in out.warnings.iter() {
        eprintln!("warning: {warning}");
    }

    let pushed = out.value.with_context(|| format!("pushing {}", options.app_name))?;
    println!(
        "{} ({}) pushed: {} files kept, {} uploaded ({} bytes), route host {:?}",
        pushed.application.name,
        pushed.application.guid,
        pushed.diff.kept,
        pushed.diff.uploaded,
        pushed.diff.uploaded_bytes,
        pushed.route.host,
    );
    Ok(())
}

fn report(event: &PushEvent) {
    match event {
        PushEvent::StateChanged { app_name, state } => {
            info!(app = %app_name, state = %state, "push progress");
        }
        PushEvent::Completed { app_name, app_guid } => {
            info!(app = %app_name, app_guid = %app_guid, "push completed");
        }
        PushEvent::Failed { app_name, error } => {
            warn!(app = %app_name, error = %error, "push failed");
        }
    }
}

fn configure(args: ConfigArgs) -> anyhow::Result<()> {
    let path = config_path();
    let mut config = Config::load_from(&path).context("loading configuration")?;

    if !args.is_empty() {
        if let Some(api) = args.api {
            config.api = api;
        }
        if let Some(skip) = args.skip_ssl_validation {
            config.skip_ssl_validation = skip;
        }
        if let Some(secs) = args.polling_interval {
            config.polling_interval_secs = positive("--polling-interval", secs)?;
        }
        if let Some(secs) = args.polling_timeout {
            config.polling_timeout_secs = positive("--polling-timeout", secs)?;
        }
        config.save_to(&path).context("saving configuration")?;
        info!(path = %path.display(), "configuration updated");
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn positive(flag: &str, secs: u64) -> anyhow::Result<u64> {
    if secs == 0 {
        bail!("{flag} must be at least one second");
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seconds_rejected() {
        assert!(positive("--polling-interval", 0).is_err());
        assert_eq!(positive("--polling-timeout", 30).unwrap(), 30);
    }
}
