//! Transient "extension active" indicator injected into the page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

/// Marker id checked before inserting, so the indicator is never duplicated.
pub const INDICATOR_ID: &str = "cover-letter-indicator";
pub const INDICATOR_LABEL: &str = "📝 Cover letter extension active";
pub const INDICATOR_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorNode {
    pub id: &'static str,
    pub label: &'static str,
    generation: u64,
}

/// The page's indicator slot. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct Indicator {
    slot: Arc<Mutex<Option<IndicatorNode>>>,
    generation: Arc<AtomicU64>,
}

impl Indicator {
    /// Inserts the indicator unless one is already shown, and schedules its removal.
    /// Returns whether a new node was inserted. Must run inside a tokio runtime.
    pub fn show(&self) -> bool {
        let generation = {
            let mut slot = self.lock();
            if slot.is_some() {
                return false;
            }
            let node = IndicatorNode {
                id: INDICATOR_ID,
                label: INDICATOR_LABEL,
                generation: self.generation.fetch_add(1, Ordering::SeqCst),
            };
            debug!(id = node.id, label = node.label, "Indicator shown");
            let generation = node.generation;
            *slot = Some(node);
            generation
        };

        let indicator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(INDICATOR_TTL).await;
            indicator.remove(generation);
        });
        true
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<IndicatorNode> {
        self.lock().clone()
    }

    #[cfg(test)]
    pub fn is_visible(&self) -> bool {
        self.lock().is_some()
    }

    fn remove(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|node| node.generation == generation) {
            *slot = None;
            debug!(id = INDICATOR_ID, "Indicator removed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<IndicatorNode>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_show_is_idempotent_while_visible() {
        let indicator = Indicator::default();
        assert!(indicator.show());
        assert!(!indicator.show());

        let node = indicator.current().unwrap();
        assert_eq!(node.id, INDICATOR_ID);
        assert_eq!(node.label, INDICATOR_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_indicator_is_removed_after_ttl() {
        let indicator = Indicator::default();
        indicator.show();

        tokio::time::sleep(INDICATOR_TTL - Duration::from_millis(1)).await;
        assert!(indicator.is_visible());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!indicator.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_indicator_can_be_shown_again_after_removal() {
        let indicator = Indicator::default();
        assert!(indicator.show());
        tokio::time::sleep(INDICATOR_TTL + Duration::from_millis(1)).await;
        assert!(indicator.show());
        assert!(indicator.is_visible());
    }
}
