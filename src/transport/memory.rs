//! In-process channel with a single global order.

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::document::Operation;
use crate::wire;

use super::{Delivered, Subscription, Transport, TransportError};

#[derive(Debug)]
struct StoredRecord {
    client_id: String,
    payload: String,
}

#[derive(Debug, Default)]
struct HubInner {
    records: Vec<StoredRecord>,
    subscribers: Vec<Sender<Delivered>>,
    offline: bool,
}

impl HubInner {
    /// Append one encoded record and fan it out to live subscribers.
    fn append(&mut self, client_id: &str, payload: String) {
        let seq = self.records.len() as u64;
        match wire::decode(&payload) {
            Ok(op) => {
                let delivered = Delivered {
                    seq,
                    client_id: client_id.to_string(),
                    op,
                };
                self.subscribers
                    .retain(|tx| tx.send(delivered.clone()).is_ok());
            }
            Err(err) => {
                tracing::debug!(seq, %err, "dropping malformed record");
            }
        }
        self.records.push(StoredRecord {
            client_id: client_id.to_string(),
            payload,
        });
    }
}

/// Shared in-memory channel. Clones refer to the same channel.
///
/// Every record passes through the wire codec, so participants only ever see
/// what a remote transport would deliver.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubInner>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a participant to this channel.
    pub fn connect(&self, client_id: impl Into<String>) -> MemoryTransport {
        MemoryTransport {
            hub: self.clone(),
            client_id: client_id.into(),
        }
    }

    /// Make every subsequent publish fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Append a raw payload as if `client_id` had published it.
    pub fn inject_raw(&self, client_id: &str, payload: impl Into<String>) {
        self.lock().append(client_id, payload.into());
    }

    /// Number of records on the channel, including malformed ones.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// One participant's handle on a [`MemoryHub`].
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    hub: MemoryHub,
    client_id: String,
}

impl MemoryTransport {
    pub const fn hub(&self) -> &MemoryHub {
        &self.hub
    }
}

impl Transport for MemoryTransport {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn publish(&self, batch: &[Operation]) -> Result<(), TransportError> {
        let payloads = batch
            .iter()
            .map(wire::encode)
            .collect::<Result<Vec<_>, _>>()?;

        let mut inner = self.hub.lock();
        if inner.offline {
            return Err(TransportError::Offline);
        }
        for payload in payloads {
            inner.append(&self.client_id, payload);
        }
        Ok(())
    }

    fn subscribe(&self) -> Result<Subscription, TransportError> {
        let (tx, rx) = mpsc::channel();
        self.hub.lock().subscribers.push(tx);
        Ok(Subscription::new(rx))
    }

    fn history(&self) -> Result<Vec<Delivered>, TransportError> {
        let inner = self.hub.lock();
        Ok(inner
            .records
            .iter()
            .enumerate()
            .filter_map(|(seq, record)| {
                let op = wire::decode(&record.payload).ok()?;
                Some(Delivered {
                    seq: seq as u64,
                    client_id: record.client_id.clone(),
                    op,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Cursor, Insert};
    use std::time::Duration;

    fn add(text: &str) -> Operation {
        Operation::Insert(Insert {
            line: 0,
            pos: 0,
            text: text.to_string(),
        })
    }

    #[test]
    fn test_publisher_receives_own_operations() {
        let hub = MemoryHub::new();
        let alice = hub.connect("alice");
        let sub = alice.subscribe().unwrap();

        alice.publish(&[add("a")]).unwrap();

        let delivered = sub.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(delivered.client_id, "alice");
        assert_eq!(delivered.op, add("a"));
        assert_eq!(delivered.seq, 0);
    }

    #[test]
    fn test_all_subscribers_see_same_order() {
        let hub = MemoryHub::new();
        let alice = hub.connect("alice");
        let bob = hub.connect("bob");
        let sub_a = alice.subscribe().unwrap();
        let sub_b = bob.subscribe().unwrap();

        alice.publish(&[add("1"), add("2")]).unwrap();
        bob.publish(&[add("3")]).unwrap();
        alice.publish(&[add("4")]).unwrap();

        let seen_a: Vec<_> = sub_a.try_iter().map(|d| (d.seq, d.op)).collect();
        let seen_b: Vec<_> = sub_b.try_iter().map(|d| (d.seq, d.op)).collect();
        assert_eq!(seen_a.len(), 4);
        assert_eq!(seen_a, seen_b);
    }

    #[test]
    fn test_history_replays_from_start() {
        let hub = MemoryHub::new();
        let alice = hub.connect("alice");
        alice
            .publish(&[
                Operation::NewDocument("x".to_string()),
                Operation::CursorMove(Cursor::at(1, 0)),
            ])
            .unwrap();

        let late = hub.connect("late");
        let history = late.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].op, Operation::NewDocument("x".to_string()));
        assert_eq!(history[1].seq, 1);
    }

    #[test]
    fn test_offline_publish_fails_and_records_nothing() {
        let hub = MemoryHub::new();
        let alice = hub.connect("alice");
        hub.set_offline(true);
        assert!(matches!(
            alice.publish(&[add("a")]),
            Err(TransportError::Offline)
        ));
        assert!(hub.is_empty());

        hub.set_offline(false);
        alice.publish(&[add("a")]).unwrap();
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_malformed_records_are_skipped_but_keep_their_position() {
        let hub = MemoryHub::new();
        let alice = hub.connect("alice");
        let sub = alice.subscribe().unwrap();

        hub.inject_raw("mallory", "{\"name\":\"add\",\"data\":42}");
        alice.publish(&[add("a")]).unwrap();

        let delivered: Vec<_> = sub.try_iter().collect();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].seq, 1);
        assert_eq!(alice.history().unwrap().len(), 1);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let hub = MemoryHub::new();
        let alice = hub.connect("alice");
        drop(alice.subscribe().unwrap());
        alice.publish(&[add("a")]).unwrap();
        assert!(hub.lock().subscribers.is_empty());
    }
}
