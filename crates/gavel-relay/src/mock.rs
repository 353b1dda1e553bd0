//! Recording relay for tests: captures every published event and injects
//! failures on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use gavel_types::constants::DM_EVENT_KIND;
use gavel_types::IdentityKey;

use crate::event::RelayEvent;
use crate::publisher::RelayPublisher;

#[derive(Default)]
pub struct MockRelay {
    published: Mutex<Vec<RelayEvent>>,
    fail_all: AtomicBool,
    fail_next: AtomicUsize,
    fail_kind: Mutex<Option<u16>>,
}

impl MockRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish fails until switched back.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// The next `n` publishes fail, later ones succeed.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Publishes of the given kind fail until cleared with `None`.
    pub fn fail_kind(&self, kind: Option<u16>) {
        *self.fail_kind.lock().expect("mock relay lock poisoned") = kind;
    }

    /// Everything published so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<RelayEvent> {
        self.published
            .lock()
            .expect("mock relay lock poisoned")
            .clone()
    }

    #[must_use]
    pub fn events_of_kind(&self, kind: u16) -> Vec<RelayEvent> {
        self.events().into_iter().filter(|e| e.kind == kind).collect()
    }

    /// Direct messages routed to the given identity.
    #[must_use]
    pub fn dms_to(&self, recipient: &IdentityKey) -> Vec<RelayEvent> {
        let hex = recipient.to_hex();
        self.events_of_kind(DM_EVENT_KIND)
            .into_iter()
            .filter(|e| e.tag_value("p") == Some(hex.as_str()))
            .collect()
    }
}

#[async_trait]
impl RelayPublisher for MockRelay {
    async fn publish_event(&self, event: &RelayEvent) -> bool {
        if self.fail_all.load(Ordering::SeqCst) {
            return false;
        }
        if *self.fail_kind.lock().expect("mock relay lock poisoned") == Some(event.kind) {
            return false;
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return false;
        }
        self.published
            .lock()
            .expect("mock relay lock poisoned")
            .push(event.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn event(kind: u16) -> RelayEvent {
        RelayEvent::sign(
            &SigningKey::from_bytes(&[2u8; 32]),
            kind,
            vec![],
            String::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn records_in_order() {
        let relay = MockRelay::new();
        assert!(relay.publish_event(&event(4)).await);
        assert!(relay.publish_event(&event(1022)).await);
        assert_eq!(relay.events().len(), 2);
        assert_eq!(relay.events_of_kind(1022).len(), 1);
    }

    #[tokio::test]
    async fn fail_next_counts_down() {
        let relay = MockRelay::new();
        relay.fail_next(2);
        assert!(!relay.publish_event(&event(4)).await);
        assert!(!relay.publish_event(&event(4)).await);
        assert!(relay.publish_event(&event(4)).await);
        assert_eq!(relay.events().len(), 1);
    }

    #[tokio::test]
    async fn fail_all_blocks_everything() {
        let relay = MockRelay::new();
        relay.set_fail_all(true);
        assert!(!relay.publish_event(&event(4)).await);
        relay.set_fail_all(false);
        assert!(relay.publish_event(&event(4)).await);
    }
}
