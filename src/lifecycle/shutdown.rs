//! Shutdown coordination for the bridge.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// A future that resolves once shutdown has been triggered.
    pub fn triggered(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the bridge's shutdown triggers: a line on standard input (the
/// operator pressing enter) or Ctrl+C.
pub fn spawn_triggers(shutdown: &Shutdown) {
    let on_stdin = shutdown.clone();
    tokio::spawn(async move {
        let mut line = String::new();
        // EOF also resolves read_line; either way, shut down
        let _ = BufReader::new(tokio::io::stdin()).read_line(&mut line).await;
        tracing::info!("stdin closed or line received, shutting down");
        on_stdin.trigger();
    });

    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            on_interrupt.trigger();
        }
    });
}
