//! Process-signal glue for shutdown
//!
//! Waits for Ctrl-C (or SIGTERM on unix) and then drains the shutdown hooks
//! with a fresh context bounded by the configured timeout. Shutdown errors are
//! reported through the installed tracing subscriber and never propagated.

use crate::shutdown::{ShutdownContext, ShutdownManager};
use crate::{Application, DiError, Result};

#[cfg(feature = "logging")]
use tracing::{error, info};

/// Resolve once the process is asked to terminate
pub async fn termination_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

impl ShutdownManager {
    /// Wait for a termination signal, then run every hook.
    ///
    /// Hooks run on the blocking pool so a slow hook does not stall the
    /// runtime's signal handling.
    pub async fn wait_for_signal(&self) {
        if let Err(err) = termination_signal().await {
            #[cfg(feature = "logging")]
            error!(
                target: "armature_kernel",
                error = %err,
                "Failed to listen for termination signal; shutting down now"
            );
            #[cfg(not(feature = "logging"))]
            let _ = err;
        }

        #[cfg(feature = "logging")]
        info!(
            target: "armature_kernel",
            timeout = ?self.timeout(),
            "Termination signal received"
        );

        let manager = self.clone();
        let timeout = self.timeout();
        let outcome = tokio::task::spawn_blocking(move || {
            manager.shutdown(&ShutdownContext::with_timeout(timeout))
        })
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(join) => Err(DiError::Internal(format!("shutdown task failed: {join}"))),
        };

        report(result);
    }
}

impl Application {
    /// Block the current thread until a termination signal arrives, then run
    /// the shutdown hooks.
    ///
    /// Fails only if the signal runtime cannot be created.
    pub fn run_until_signal(&self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DiError::Internal(format!("failed to build signal runtime: {e}")))?;

        runtime.block_on(self.shutdown_manager().wait_for_signal());
        Ok(())
    }
}

fn report(result: Result<()>) {
    match result {
        Ok(()) => {
            #[cfg(feature = "logging")]
            info!(target: "armature_kernel", "Shutdown complete");
        }
        Err(err) => {
            #[cfg(feature = "logging")]
            error!(target: "armature_kernel", error = %err, "Shutdown did not complete");
            #[cfg(not(feature = "logging"))]
            let _ = err;
        }
    }
}
