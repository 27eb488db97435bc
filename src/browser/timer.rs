use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A cancellable one-shot timer that posts an event when it fires.
///
/// Scheduling again cancels the pending shot, so a burst of calls results in a
/// single event `delay` after the last one.
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    pending: Option<CancellationToken>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Post `event` to `tx` after the delay unless rescheduled or cancelled
    /// first. Must be called within a tokio runtime.
    pub fn schedule<T: Send + 'static>(&mut self, tx: &mpsc::UnboundedSender<T>, event: T) {
        self.cancel();
        let token = CancellationToken::new();
        let child = token.clone();
        let tx = tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(event);
                }
            }
        });
        self.pending = Some(token);
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = DebounceTimer::new(Duration::from_millis(30));
        timer.schedule(&tx, 1);
        timer.schedule(&tx, 2);
        timer.schedule(&tx, 3);

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timer fired");
        assert_eq!(first, Some(3));
        let more = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(more.is_err());
    }

    #[tokio::test]
    async fn cancel_suppresses_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = DebounceTimer::new(Duration::from_millis(20));
        timer.schedule(&tx, "nav");
        timer.cancel();
        let got = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(got.is_err());
    }
}
