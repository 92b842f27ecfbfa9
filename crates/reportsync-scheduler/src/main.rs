mod dispatch;
mod logging;
mod scheduler;

use chrono::Local;

use crate::{dispatch::ProcessDispatcher, scheduler::Scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = reportsync_core::load_app_config()?;
    let log_path = logging::init(&config)?;

    let missing = config.missing_settings();
    if !missing.is_empty() {
        tracing::warn!(
            missing = %missing.join(", "),
            "settings are empty; dispatched pipelines will retry until they are set"
        );
    }

    let dispatcher = ProcessDispatcher::from_config(&config)?;
    let mut scheduler = Scheduler::new(&config.schedule, Local::now().naive_local());
    for job in scheduler.jobs() {
        tracing::info!(
            report = %job.report,
            at = %job.at.format("%H:%M"),
            next_run = %job.next_run(),
            "scheduled daily job"
        );
    }
    tracing::info!(
        log_file = %log_path.display(),
        cli_bin = %dispatcher.program().display(),
        "scheduler started"
    );

    tokio::select! {
        () = scheduler.run(&dispatcher) => {},
        () = shutdown_signal() => {},
    }

    tracing::info!("scheduler stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
