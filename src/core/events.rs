// ─── Progress / Log Reporter ───
// Fire-and-forget channel between the engine and whatever UI is attached.

use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// Structured progress update (task name, detail line, 0–100 percent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub task: String,
    pub details: String,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum LauncherEvent {
    Log(String),
    Progress(ProgressEvent),
}

/// Process-wide event channel.
///
/// Emission is synchronous and never blocks: with no subscribers the event is
/// dropped, and a slow subscriber skips events instead of stalling the
/// pipeline. There is no replay, so listeners must subscribe before the
/// operation they want to observe starts.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<LauncherEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn log(&self, text: impl Into<String>) {
        let _ = self.tx.send(LauncherEvent::Log(text.into()));
    }

    pub fn progress(&self, task: &str, details: impl Into<String>, percent: u8) {
        let _ = self.tx.send(LauncherEvent::Progress(ProgressEvent {
            task: task.to_string(),
            details: details.into(),
            percent: percent.min(100),
        }));
    }

    /// Subscribe to all future events. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<LauncherEvent>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once every bus handle is gone.
    /// Events missed because the subscriber lagged are skipped silently.
    pub async fn recv(&mut self) -> Option<LauncherEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("event subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive of everything queued so far.
    pub fn drain(&mut self) -> Vec<LauncherEvent> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => out.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        out
    }

    /// Convenience for tests and the UI bridge: queued progress events only.
    pub fn drain_progress(&mut self) -> Vec<ProgressEvent> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                LauncherEvent::Progress(p) => Some(p),
                LauncherEvent::Log(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.log("nobody listening");
        bus.progress("Init", "x", 0);
    }

    #[tokio::test]
    async fn subscriber_receives_log_and_progress() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        bus.log("hello");
        bus.progress("Syncing Files", "Checking a.jar...", 12);

        assert_eq!(sub.recv().await, Some(LauncherEvent::Log("hello".into())));
        assert_eq!(
            sub.recv().await,
            Some(LauncherEvent::Progress(ProgressEvent {
                task: "Syncing Files".into(),
                details: "Checking a.jar...".into(),
                percent: 12,
            }))
        );
    }

    #[test]
    fn late_subscriber_does_not_see_earlier_events() {
        let bus = EventBus::new(16);
        bus.log("before");
        let mut sub = bus.subscribe();
        bus.log("after");
        assert_eq!(sub.drain(), vec![LauncherEvent::Log("after".into())]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus = EventBus::new(16);
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn percent_is_clamped() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        bus.progress("Launch", "", 250);
        assert_eq!(sub.drain_progress()[0].percent, 100);
    }
}
