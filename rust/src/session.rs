//! Hold-session state entered after the sealed record has been printed.
//!
//! The CI runner stays alive while the operator copies the sealed line out
//! of the job log; the runtime token is only valid for as long as the job
//! runs. Holding ends on an external shutdown request or an optional
//! timeout, never on its own.

use std::future::Future;
use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HoldMode {
    Forever,
    Release,
    Timeout,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HoldPolicy {
    /// Wait until a shutdown request arrives.
    #[default]
    Forever,
    /// Return immediately.
    Release,
    /// Wait for a shutdown request or the deadline, whichever comes first.
    Timeout(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldOutcome {
    Released,
    Signalled,
    TimedOut,
}

impl HoldPolicy {
    pub fn from_mode(mode: HoldMode, seconds: Option<u64>) -> Result<Self, String> {
        match (mode, seconds) {
            (HoldMode::Forever, None) => Ok(HoldPolicy::Forever),
            (HoldMode::Release, None) => Ok(HoldPolicy::Release),
            (HoldMode::Timeout, Some(secs)) => Ok(HoldPolicy::Timeout(Duration::from_secs(secs))),
            (HoldMode::Timeout, None) => Err("hold mode 'timeout' requires seconds".to_string()),
            (_, Some(_)) => Err("hold seconds only apply to mode 'timeout'".to_string()),
        }
    }
}

/// Blocks according to `policy`. `shutdown` resolves when something outside
/// the process asks it to stop.
pub async fn hold<F>(policy: HoldPolicy, shutdown: F) -> HoldOutcome
where
    F: Future<Output = ()>,
{
    match policy {
        HoldPolicy::Release => HoldOutcome::Released,
        HoldPolicy::Forever => {
            shutdown.await;
            HoldOutcome::Signalled
        }
        HoldPolicy::Timeout(deadline) => {
            tokio::select! {
                _ = shutdown => HoldOutcome::Signalled,
                _ = tokio::time::sleep(deadline) => HoldOutcome::TimedOut,
            }
        }
    }
}

/// Resolves on SIGINT or SIGTERM. The handlers are installed when this is
/// called, so signals arriving before the first poll are not lost.
#[cfg(unix)]
pub fn shutdown_signal() -> impl Future<Output = ()> {
    use tokio::signal::unix::{signal, SignalKind};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());

    async move {
        let interrupt = async move {
            match interrupt {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    tracing::error!("cannot listen for SIGINT: {err}");
                    std::future::pending::<()>().await;
                }
            }
        };
        let terminate = async move {
            match terminate {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    tracing::error!("cannot listen for SIGTERM: {err}");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = interrupt => tracing::debug!("received SIGINT"),
            _ = terminate => tracing::debug!("received SIGTERM"),
        }
    }
}

/// Resolves on ctrl-c.
#[cfg(not(unix))]
pub fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
        tracing::debug!("received interrupt");
    }
}
