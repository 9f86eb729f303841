use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// How long a success or error message stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone)]
struct Notice {
    message: String,
    posted_at: Instant,
}

#[derive(Debug, Default)]
struct Slots {
    success: Option<Notice>,
    error: Option<Notice>,
}

/// Snapshot of what is currently on screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Notices {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// One success slot and one error slot. Posting replaces the slot's previous
/// message; the two slots never clear each other. Messages expire lazily once
/// the TTL has elapsed, so no timer task is needed.
#[derive(Debug, Clone)]
pub struct Notifier {
    slots: Arc<Mutex<Slots>>,
    ttl: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(NOTICE_TTL)
    }
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::default())),
            ttl,
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.with_slots(|s| {
            s.success = Some(Notice {
                message,
                posted_at: Instant::now(),
            })
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.with_slots(|s| {
            s.error = Some(Notice {
                message,
                posted_at: Instant::now(),
            })
        });
    }

    pub fn dismiss_success(&self) {
        self.with_slots(|s| s.success = None);
    }

    pub fn dismiss_error(&self) {
        self.with_slots(|s| s.error = None);
    }

    pub fn current_success(&self) -> Option<String> {
        self.current().success
    }

    pub fn current_error(&self) -> Option<String> {
        self.current().error
    }

    /// Live messages; expired ones are dropped as a side effect.
    pub fn current(&self) -> Notices {
        let ttl = self.ttl;
        self.with_slots(|s| {
            let now = Instant::now();
            for slot in [&mut s.success, &mut s.error] {
                if slot
                    .as_ref()
                    .is_some_and(|n| now.duration_since(n.posted_at) >= ttl)
                {
                    *slot = None;
                }
            }
            Notices {
                success: s.success.as_ref().map(|n| n.message.clone()),
                error: s.error.as_ref().map(|n| n.message.clone()),
            }
        })
    }

    fn with_slots<R>(&self, f: impl FnOnce(&mut Slots) -> R) -> R {
        // A poisoned lock only means a panic mid-update of two Option fields.
        let mut guard = match self.slots.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn messages_expire_after_ttl() {
        let notifier = Notifier::default();
        notifier.success("Note submitted successfully!");
        notifier.error("Search failed");

        tokio::time::advance(Duration::from_millis(3_900)).await;
        assert_eq!(
            notifier.current_success().as_deref(),
            Some("Note submitted successfully!")
        );

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(notifier.current(), Notices::default());
    }

    #[tokio::test(start_paused = true)]
    async fn reposting_replaces_and_restarts_the_clock() {
        let notifier = Notifier::default();
        notifier.error("first");
        tokio::time::advance(Duration::from_secs(3)).await;
        notifier.error("second");
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(notifier.current_error().as_deref(), Some("second"));
    }

    #[test]
    fn slots_are_independent() {
        let notifier = Notifier::default();
        notifier.success("saved");
        notifier.error("failed");
        notifier.dismiss_error();
        assert_eq!(notifier.current_success().as_deref(), Some("saved"));
        assert_eq!(notifier.current_error(), None);

        notifier.success("saved again");
        assert_eq!(notifier.current_error(), None);
    }
}
