use std::collections::HashMap;

use crate::message::Message;
use crate::unicast::UnicastTable;

/// One (receiver, last-refresh) pair under a root's multicast tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastEntry {
    pub receiver_id: u8,
    pub last_refresh: u32,
}

/// Outcome of processing an inbound DATA message.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DataOutcome {
    /// Payload to append to the per-(receiver, root) sink, if this node is
    /// itself one of the root's receivers.
    pub deliver: bool,
    /// Message to re-emit toward the remaining children, if any.
    pub forward: Option<Message>,
}

/// Per-root reverse-path multicast trees. Borrows the unicast table by
/// parameter on every call rather than holding a reference to it, so there is
/// no ownership cycle between the two tables, unlike `node.py`'s
/// `MulticastRoutingTable`, which keeps a back-reference to its owning node.
#[derive(Debug, Clone, Default)]
pub struct MulticastTable {
    self_id: u8,
    /// The root this node permanently watches as a receiver, if any. Its
    /// self-entry is exempt from expiry and refreshed every tick.
    receiver_root: Option<u8>,
    entries: HashMap<u8, Vec<MulticastEntry>>,
}

impl MulticastTable {
    pub fn new(self_id: u8) -> Self {
        Self { self_id, receiver_root: None, entries: HashMap::new() }
    }

    /// A receiver-mode node starts out already carrying a permanent
    /// self-entry for the sender it observes.
    pub fn new_receiver(self_id: u8, observed_sender_id: u8) -> Self {
        let mut table = Self::new(self_id);
        table.receiver_root = Some(observed_sender_id);
        table
            .entries
            .insert(observed_sender_id, vec![MulticastEntry { receiver_id: self_id, last_refresh: 0 }]);
        table
    }

    pub fn roots(&self) -> impl Iterator<Item = &u8> {
        self.entries.keys()
    }

    pub fn entries(&self, root: u8) -> &[MulticastEntry] {
        self.entries.get(&root).map_or(&[], |v| v.as_slice())
    }

    /// Multicast expiry, with the receiver self-entry refreshed first.
    pub fn purge_expired(&mut self, now: u32, expiry: u32) {
        if let Some(root) = self.receiver_root {
            if let Some(entries) = self.entries.get_mut(&root) {
                for entry in entries.iter_mut() {
                    if entry.receiver_id == self.self_id {
                        entry.last_refresh = now;
                    }
                }
            }
        }
        for entries in self.entries.values_mut() {
            entries.retain(|entry| {
                entry.receiver_id == self.self_id || now.saturating_sub(entry.last_refresh) <= expiry
            });
        }
        self.entries.retain(|_, entries| !entries.is_empty());
    }

    /// JOIN emission: one refresh per root currently in the table,
    /// suppressed when parent/next-hop cannot both be determined.
    pub fn join_messages(&self, unicast: &UnicastTable) -> Vec<Message> {
        let mut messages = Vec::new();
        for &root in self.entries.keys() {
            let Some(parent) = unicast.parent(root) else { continue };
            let Some(next_hop) = unicast.next_hop_toward(parent) else { continue };
            messages.push(Message::Join { rid: self.self_id, sid: root, pid: parent, nid: next_hop });
        }
        messages
    }

    /// JOIN processing. Returns a message to forward, if any.
    pub fn process_join(&mut self, rid: u8, sid: u8, pid: u8, nid: u8, now: u32, unicast: &UnicastTable) -> Option<Message> {
        if nid != self.self_id {
            return None;
        }
        if pid != self.self_id {
            let next_hop = unicast.next_hop_toward(pid)?;
            return Some(Message::Join { rid, sid, pid, nid: next_hop });
        }

        let entries = self.entries.entry(sid).or_default();
        match entries.iter_mut().find(|entry| entry.receiver_id == rid) {
            Some(entry) => entry.last_refresh = now,
            None => entries.push(MulticastEntry { receiver_id: rid, last_refresh: now }),
        }
        None
    }

    /// DATA processing. `payload` is the opaque string carried by the
    /// inbound message; a forwarded message carries it on unchanged with
    /// `sender` replaced by this node's id.
    pub fn process_data(&self, sender: u8, root: u8, payload: &str, unicast: &UnicastTable) -> DataOutcome {
        let Some(entries) = self.entries.get(&root) else {
            return DataOutcome::default();
        };
        if unicast.parent(root) != Some(sender) {
            return DataOutcome::default();
        }

        let mut deliver = false;
        let mut forward_needed = false;
        for entry in entries {
            if entry.receiver_id == self.self_id {
                deliver = true;
            } else {
                forward_needed = true;
            }
        }

        let forward = forward_needed.then(|| Message::Data {
            sender: self.self_id,
            root,
            payload: payload.to_string(),
        });
        DataOutcome { deliver, forward }
    }
}
