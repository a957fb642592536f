use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `cancel` once `interrupt` resolves with a received signal.
///
/// A listener that cannot be installed only logs; the monitor keeps running
/// until something else cancels it.
pub async fn cancel_on_interrupt<F>(interrupt: F, cancel: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match interrupt.await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down");
            cancel.cancel();
        }
        Err(e) => error!("Unable to listen for interrupt signal: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_interrupt_cancels() {
        let cancel = CancellationToken::new();
        cancel_on_interrupt(async { Ok(()) }, cancel.clone()).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_listener_failure_keeps_running() {
        let cancel = CancellationToken::new();
        cancel_on_interrupt(
            async { Err(io::Error::new(io::ErrorKind::Other, "no signal driver")) },
            cancel.clone(),
        )
        .await;
        assert!(!cancel.is_cancelled());
    }
}
