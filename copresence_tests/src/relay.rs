//! In-process relay connecting the test clients, built on crossbeam channels
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use bevy_platform::collections::HashMap;
use copresence::prelude::*;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use rand::Rng;
use tracing::{error, trace};

/// Scene notification produced by one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayPayload {
    Join(SceneName),
    Leave(SceneName),
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub from: ParticipantId,
    pub payload: RelayPayload,
}

impl RelayMessage {
    pub fn into_event<H>(self) -> PresenceEvent<H> {
        match self.payload {
            RelayPayload::Join(scene) => PresenceEvent::Join {
                actor: self.from,
                scene,
            },
            RelayPayload::Leave(scene) => PresenceEvent::Leave {
                actor: self.from,
                scene,
            },
            RelayPayload::Disconnected => PresenceEvent::Disconnected { actor: self.from },
        }
    }
}

/// Broadcasts every message to all the connected peers, the sender included.
///
/// Messages from one sender are always delivered in the order they were sent;
/// messages from different senders can be interleaved arbitrarily.
pub struct LocalRelay {
    inbound_tx: Sender<RelayMessage>,
    inbound: Receiver<RelayMessage>,
    peers: Vec<(ParticipantId, Sender<RelayMessage>)>,
}

impl Default for LocalRelay {
    fn default() -> Self {
        let (inbound_tx, inbound) = crossbeam_channel::unbounded();
        Self {
            inbound_tx,
            inbound,
            peers: Vec::new(),
        }
    }
}

impl LocalRelay {
    /// Connect a new peer; returns the sender used to publish messages and the receiver for the broadcasts
    pub fn connect(&mut self, id: ParticipantId) -> (Sender<RelayMessage>, Receiver<RelayMessage>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.peers.push((id, tx));
        (self.inbound_tx.clone(), rx)
    }

    /// Stop delivering to the peer, and let the others know that it left
    pub fn disconnect(&mut self, id: ParticipantId) {
        self.peers.retain(|(peer, _)| *peer != id);
        self.inbound_tx
            .send(RelayMessage {
                from: id,
                payload: RelayPayload::Disconnected,
            })
            .ok();
    }

    fn collect(&mut self) -> Vec<RelayMessage> {
        let mut messages = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    error!("relay channel is disconnected");
                    break;
                }
            }
        }
        messages
    }

    fn deliver(&self, peer: &Sender<RelayMessage>, message: RelayMessage) {
        if peer.send(message).is_err() {
            error!("could not deliver relay message");
        }
    }

    /// Deliver every pending message to every peer, in the order they were sent
    pub fn flush(&mut self) {
        let messages = self.collect();
        for (id, peer) in &self.peers {
            for message in &messages {
                trace!(to = ?id, ?message, "relay");
                self.deliver(peer, message.clone());
            }
        }
    }

    /// Deliver every pending message to every peer, interleaving the senders randomly
    /// while preserving the order of each sender's messages.
    pub fn flush_interleaved(&mut self, rng: &mut impl Rng) {
        let messages = self.collect();
        for (_, peer) in &self.peers {
            let mut queues: HashMap<ParticipantId, VecDeque<RelayMessage>> = HashMap::default();
            let mut senders = Vec::new();
            for message in &messages {
                if !queues.contains_key(&message.from) {
                    senders.push(message.from);
                }
                queues
                    .entry(message.from)
                    .or_default()
                    .push_back(message.clone());
            }
            while !senders.is_empty() {
                let index = rng.random_range(0..senders.len());
                let sender = senders[index];
                let queue = queues.entry(sender).or_default();
                if let Some(message) = queue.pop_front() {
                    self.deliver(peer, message);
                }
                if queue.is_empty() {
                    senders.swap_remove(index);
                }
            }
        }
    }
}
