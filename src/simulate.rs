use std::collections::HashMap;

use crate::engine::{Engine, NodeEffect, NodeEvent};
use crate::message::Message;
use crate::protocol::Protocol;

/// In-process test harness driving a set of [`Engine`]s over a fixed
/// topology, with no temporary files and no real clock — the test-suite
/// analogue of the teacher's `dsys::Simulate`, generalized from its
/// single-destination `Send`/`Broadcast` effect to this system's topology
/// fan-out (a node's outbound line reaches every configured out-neighbor,
/// exactly as the controller does over the real file transport).
///
/// A message emitted during tick `t` is only delivered to neighbors at the
/// start of tick `t + 1`, the same one-tick relay delay the controller
/// imposes over the real file transport.
pub struct Simulate {
    engines: HashMap<u8, Engine>,
    topology: HashMap<u8, Vec<u8>>,
    pending: HashMap<u8, Vec<Message>>,
    delivered: HashMap<(u8, u8), Vec<String>>,
    time: u32,
}

impl Simulate {
    pub fn new(topology: HashMap<u8, Vec<u8>>) -> Self {
        Self { engines: HashMap::new(), topology, pending: HashMap::new(), delivered: HashMap::new(), time: 0 }
    }

    pub fn insert(&mut self, id: u8, engine: Engine) {
        self.engines.insert(id, engine);
        self.pending.entry(id).or_default();
    }

    pub fn engine(&self, id: u8) -> &Engine {
        &self.engines[&id]
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    /// Payloads appended so far to the per-(receiver, root) sink.
    pub fn delivered(&self, receiver: u8, root: u8) -> &[String] {
        self.delivered.get(&(receiver, root)).map_or(&[], |v| v.as_slice())
    }

    /// Advances every engine by one tick: emission, then dispatch of
    /// messages that were in flight since the previous tick.
    pub fn tick(&mut self) {
        let now = self.time;
        let mut next_pending: HashMap<u8, Vec<Message>> = HashMap::new();

        let mut ids: Vec<u8> = self.engines.keys().copied().collect();
        ids.sort_unstable();

        for &id in &ids {
            let effects = self.engines.get_mut(&id).unwrap().update(NodeEvent::Tick(now));
            self.apply_effects(id, effects, &mut next_pending);
        }

        for &id in &ids {
            let inbound = self.pending.get_mut(&id).map(std::mem::take).unwrap_or_default();
            for message in inbound {
                let effects = self.engines.get_mut(&id).unwrap().update(NodeEvent::Handle(now, message));
                self.apply_effects(id, effects, &mut next_pending);
            }
        }

        self.pending = next_pending;
        self.time += 1;
    }

    pub fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    fn apply_effects(&mut self, from: u8, effects: Vec<NodeEffect>, next_pending: &mut HashMap<u8, Vec<Message>>) {
        for effect in effects {
            match effect {
                NodeEffect::Emit(message) => {
                    if let Some(neighbors) = self.topology.get(&from) {
                        for &to in neighbors {
                            next_pending.entry(to).or_default().push(message.clone());
                        }
                    }
                }
                NodeEffect::Deliver { root, payload } => {
                    self.delivered.entry((from, root)).or_default().push(payload);
                }
                NodeEffect::Note(_) => {}
            }
        }
    }
}
