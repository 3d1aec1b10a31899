use actix_web::dev::ServerHandle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

type ServerTask = JoinHandle<std::io::Result<()>>;

/// Stops the gateway on SIGINT or SIGTERM.
///
/// The HTTP server stops accepting first and drains in-flight requests, then the
/// background workers are told to stop and awaited by name.
pub struct ShutdownCoordinator {
    server: ServerHandle,
    server_task: ServerTask,
    workers: Vec<(&'static str, JoinHandle<()>)>,
    stop_workers: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new(server: ServerHandle, server_task: ServerTask, stop_workers: watch::Sender<bool>) -> Self {
        Self {
            server,
            server_task,
            workers: Vec::new(),
            stop_workers,
        }
    }

    pub fn with_worker(mut self, name: &'static str, handle: JoinHandle<()>) -> Self {
        self.workers.push((name, handle));
        self
    }

    /// Block until a termination signal arrives, then shut everything down.
    pub async fn wait_for_shutdown(self) -> std::io::Result<()> {
        let signal = wait_for_signal().await;
        info!(signal, "Shutdown requested");
        self.shutdown().await
    }

    async fn shutdown(self) -> std::io::Result<()> {
        info!("Stopping HTTP server");
        self.server.stop(true).await;

        // workers that already exited have dropped their receivers
        self.stop_workers.send_replace(true);

        let total = self.workers.len();
        let stopped = join_workers(self.workers).await;
        if stopped < total {
            warn!("{} of {} workers did not stop cleanly", total - stopped, total);
        }

        let result = match self.server_task.await {
            Ok(result) => result,
            Err(e) => {
                error!("HTTP server task panicked: {}", e);
                Err(std::io::Error::other(e))
            }
        };
        if let Err(e) = &result {
            error!("HTTP server stopped with error: {}", e);
        }

        info!("Shutdown complete");
        result
    }
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Await every worker in order. Returns how many exited without panicking.
async fn join_workers(workers: Vec<(&'static str, JoinHandle<()>)>) -> usize {
    let total = workers.len();
    let mut stopped = 0;

    for (name, handle) in workers {
        match handle.await {
            Ok(()) => {
                stopped += 1;
                info!(worker = name, "Worker stopped ({}/{})", stopped, total);
            }
            Err(e) => error!(worker = name, "Worker failed to stop: {}", e),
        }
    }
    stopped
}
