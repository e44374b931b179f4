//! Relay Transport
//!
//! The pub/sub boundary the battle layer talks to: topic publish and
//! subscribe with presence. Sends are fire-and-forget and never block
//! the simulation. [`LocalRelay`] is an in-process implementation used
//! by tests and the demo binary; a hosted relay backend implements the
//! same [`Transport`] trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Transport failures. All degrade to offline status; none are fatal to
/// the simulation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is gone; publish/subscribe is impossible.
    #[error("transport is offline")]
    Offline,
    /// Payload could not be encoded for the wire.
    #[error("payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A message delivered to a channel subscriber.
#[derive(Clone, Debug)]
pub struct Envelope {
    /// Channel topic the message arrived on.
    pub topic: String,
    /// Event name (see [`crate::net::protocol`]).
    pub event: String,
    /// Connection id of the sender.
    pub client_id: String,
    /// JSON payload.
    pub data: Value,
}

/// A member currently present on a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceMember {
    /// Connection id.
    pub client_id: String,
    /// Display name announced at enter.
    pub name: String,
}

/// Everything a subscriber can receive from a channel.
#[derive(Clone, Debug)]
pub enum RelayDelivery {
    /// A published message from another client.
    Message(Envelope),
    /// A client entered presence on the channel.
    PresenceEnter(PresenceMember),
    /// A client left presence on the channel.
    PresenceLeave {
        /// Connection id of the departing client.
        client_id: String,
    },
}

/// The pub/sub surface the battle layer requires.
///
/// Own messages are never echoed back to their publisher.
pub trait Transport {
    /// The opaque connection id assigned at connect.
    fn client_id(&self) -> &str;

    /// Fire-and-forget publish to a topic.
    fn publish(&self, topic: &str, event: &str, data: Value) -> Result<(), TransportError>;

    /// Subscribe to a topic; replaces any previous subscription held by
    /// this connection on the same topic.
    fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<RelayDelivery>;

    /// Drop this connection's subscription to a topic.
    fn unsubscribe(&self, topic: &str);

    /// Announce presence on a topic.
    fn presence_enter(&self, topic: &str, name: &str) -> Result<(), TransportError>;

    /// Withdraw presence from a topic.
    fn presence_leave(&self, topic: &str);

    /// Current members present on a topic.
    fn presence_members(&self, topic: &str) -> Vec<PresenceMember>;
}

#[derive(Default)]
struct ChannelState {
    subscribers: HashMap<String, mpsc::UnboundedSender<RelayDelivery>>,
    members: BTreeMap<String, String>,
}

#[derive(Default)]
struct RelayHub {
    channels: HashMap<String, ChannelState>,
}

impl RelayHub {
    fn channel(&mut self, topic: &str) -> &mut ChannelState {
        self.channels.entry(topic.to_string()).or_default()
    }

    fn fan_out(&mut self, topic: &str, sender_id: &str, delivery: RelayDelivery) {
        if let Some(channel) = self.channels.get_mut(topic) {
            channel
                .subscribers
                .retain(|sub_id, tx| sub_id == sender_id || tx.send(delivery.clone()).is_ok());
        }
    }
}

/// In-process relay hub. Cheap to clone; clones share the hub.
#[derive(Clone, Default)]
pub struct LocalRelay {
    hub: Arc<Mutex<RelayHub>>,
}

impl LocalRelay {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection and mint its opaque id.
    pub fn connect(&self) -> RelayConnection {
        let id = Uuid::new_v4().to_string();
        debug!(client_id = %id, "relay connection opened");
        RelayConnection {
            hub: Arc::clone(&self.hub),
            id,
        }
    }
}

/// One client's handle onto a [`LocalRelay`].
pub struct RelayConnection {
    hub: Arc<Mutex<RelayHub>>,
    id: String,
}

impl Transport for RelayConnection {
    fn client_id(&self) -> &str {
        &self.id
    }

    fn publish(&self, topic: &str, event: &str, data: Value) -> Result<(), TransportError> {
        let envelope = Envelope {
            topic: topic.to_string(),
            event: event.to_string(),
            client_id: self.id.clone(),
            data,
        };
        let mut hub = self.hub.lock().map_err(|_| TransportError::Offline)?;
        hub.fan_out(topic, &self.id, RelayDelivery::Message(envelope));
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<RelayDelivery> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut hub) = self.hub.lock() {
            hub.channel(topic).subscribers.insert(self.id.clone(), tx);
        }
        rx
    }

    fn unsubscribe(&self, topic: &str) {
        if let Ok(mut hub) = self.hub.lock() {
            if let Some(channel) = hub.channels.get_mut(topic) {
                channel.subscribers.remove(&self.id);
            }
        }
    }

    fn presence_enter(&self, topic: &str, name: &str) -> Result<(), TransportError> {
        let mut hub = self.hub.lock().map_err(|_| TransportError::Offline)?;
        hub.channel(topic)
            .members
            .insert(self.id.clone(), name.to_string());
        let member = PresenceMember {
            client_id: self.id.clone(),
            name: name.to_string(),
        };
        hub.fan_out(topic, &self.id, RelayDelivery::PresenceEnter(member));
        Ok(())
    }

    fn presence_leave(&self, topic: &str) {
        if let Ok(mut hub) = self.hub.lock() {
            if let Some(channel) = hub.channels.get_mut(topic) {
                channel.members.remove(&self.id);
            }
            hub.fan_out(
                topic,
                &self.id,
                RelayDelivery::PresenceLeave {
                    client_id: self.id.clone(),
                },
            );
        }
    }

    fn presence_members(&self, topic: &str) -> Vec<PresenceMember> {
        match self.hub.lock() {
            Ok(hub) => hub
                .channels
                .get(topic)
                .map(|c| {
                    c.members
                        .iter()
                        .map(|(id, name)| PresenceMember {
                            client_id: id.clone(),
                            name: name.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_reaches_other_subscribers_not_self() {
        let relay = LocalRelay::new();
        let a = relay.connect();
        let b = relay.connect();

        let mut rx_a = a.subscribe("room");
        let mut rx_b = b.subscribe("room");

        a.publish("room", "game-data", json!({"type": "accept", "text": "hi"}))
            .unwrap();

        match rx_b.try_recv().unwrap() {
            RelayDelivery::Message(env) => {
                assert_eq!(env.client_id, a.client_id());
                assert_eq!(env.event, "game-data");
            }
            other => panic!("unexpected delivery: {other:?}"),
        }
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_presence_enter_list_leave() {
        let relay = LocalRelay::new();
        let host = relay.connect();
        let guest = relay.connect();

        let mut host_rx = host.subscribe("room");
        host.presence_enter("room", "Host").unwrap();

        let _guest_rx = guest.subscribe("room");
        guest.presence_enter("room", "Guest").unwrap();

        // Host observes the guest entering.
        let entered = loop {
            match host_rx.try_recv().unwrap() {
                RelayDelivery::PresenceEnter(m) => break m,
                _ => continue,
            }
        };
        assert_eq!(entered.name, "Guest");

        // Both appear in the member list.
        let members = guest.presence_members("room");
        assert_eq!(members.len(), 2);

        guest.presence_leave("room");
        assert_eq!(host.presence_members("room").len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let relay = LocalRelay::new();
        let a = relay.connect();
        let b = relay.connect();

        let mut rx_b = b.subscribe("room");
        b.unsubscribe("room");
        a.publish("room", "game-data", json!({})).unwrap();
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let relay = LocalRelay::new();
        assert_ne!(relay.connect().client_id(), relay.connect().client_id());
    }
}
