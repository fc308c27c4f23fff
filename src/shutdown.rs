use tokio::sync::watch;

/// Stop signal for background handlers. The flag is latched, so a handler
/// that subscribes after shutdown still sees it.
///
/// ```no_run
/// use r2_uploader::shutdown::ShutdownCoordinator;
///
/// # async fn example() {
/// let coordinator = ShutdownCoordinator::new();
/// let mut stop = coordinator.subscribe();
///
/// tokio::spawn(async move {
///     let _ = stop.wait_for(|stopped| *stopped).await;
/// });
///
/// coordinator.shutdown();
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    stop_tx: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self { stop_tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    pub fn shutdown(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
