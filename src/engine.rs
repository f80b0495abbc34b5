use crate::distance::Distance;
use crate::message::Message;
use crate::multicast::MulticastTable;
use crate::protocol::Protocol;
use crate::unicast::UnicastTable;

/// A node's mode and mode-dependent payload: a sender originates data under
/// its own root, a receiver watches another node's root, and a plain
/// forwarder carries neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    None,
    Sender { send_string: String },
    Receiver { observed_sender_id: u8 },
}

/// The five periods and the expiry window, all measured in ticks.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub hello_period: u32,
    pub dvector_period: u32,
    pub in_dist_period: u32,
    pub join_period: u32,
    pub data_period: u32,
    pub expiry: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { hello_period: 5, dvector_period: 5, in_dist_period: 5, join_period: 5, data_period: 10, expiry: 30 }
    }
}

/// Events the engine reacts to. Time is carried explicitly on `Tick` and
/// `Handle` rather than tracked internally, so that outbound advertisements
/// for tick `t` and inbound dispatch arriving during tick `t` always see the
/// same `t`: inbound processing happens after emission, using the state held
/// at the start of the tick, the same order `node.py`'s main loop follows.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Init,
    Tick(u32),
    Handle(u32, Message),
}

/// Effects an engine step can produce. Turning these into actual file writes
/// is entirely the runtime shell's job — the core holds no file handle and
/// makes no syscall, unlike `node.py`'s `Node`, which opens its own log and
/// output files directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEffect {
    /// A line to append to this node's outbound stream.
    Emit(Message),
    /// A payload to append to the per-(receiver, root) sink.
    Deliver { root: u8, payload: String },
    /// A free-form line to append to this node's log.
    Note(String),
}

/// The per-node protocol engine: neighbor liveness, unicast routing, and
/// multicast routing. Holds no I/O handle and reads no clock; every
/// observable effect is returned from [`Protocol::update`].
#[derive(Debug, Clone)]
pub struct Engine {
    id: u8,
    mode: Mode,
    config: EngineConfig,
    unicast: UnicastTable,
    multicast: MulticastTable,
}

impl Engine {
    pub fn new(id: u8, mode: Mode, config: EngineConfig) -> Self {
        let multicast = match &mode {
            Mode::Receiver { observed_sender_id } => MulticastTable::new_receiver(id, *observed_sender_id),
            Mode::None | Mode::Sender { .. } => MulticastTable::new(id),
        };
        Self { id, mode, config, unicast: UnicastTable::new(id), multicast }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn unicast(&self) -> &UnicastTable {
        &self.unicast
    }

    pub fn multicast(&self) -> &MulticastTable {
        &self.multicast
    }

    pub fn in_distance(&self, k: u8) -> Distance {
        self.unicast.in_distance(k)
    }

    pub fn out_distance(&self, k: u8) -> Distance {
        self.unicast.out_distance(k)
    }

    /// Maybe-HELLO, purge, maybe-DVECTOR, maybe-IN-DISTANCE, multicast purge
    /// and maybe-JOIN, then maybe-DATA if sending — in that fixed order.
    fn tick(&mut self, now: u32) -> Vec<NodeEffect> {
        let mut effects = Vec::new();

        if now % self.config.hello_period == 0 {
            effects.push(NodeEffect::Emit(Message::Hello { sender: self.id }));
        }

        self.unicast.purge_expired(now, self.config.expiry);

        if now % self.config.dvector_period == 0 {
            effects.push(NodeEffect::Emit(Message::DVector {
                sender: self.id,
                origin: self.id,
                distances: self.unicast.out_distance_vector(),
                in_neighbors: self.unicast.in_neighbors(),
            }));
        }

        if now % self.config.in_dist_period == 0 {
            effects.push(NodeEffect::Emit(Message::InDistance {
                sender: self.id,
                distances: self.unicast.in_distance_vector(),
            }));
        }

        self.multicast.purge_expired(now, self.config.expiry);
        if now % self.config.join_period == 0 {
            for message in self.multicast.join_messages(&self.unicast) {
                effects.push(NodeEffect::Emit(message));
            }
        }

        if let Mode::Sender { send_string } = &self.mode {
            if now % self.config.data_period == 0 {
                effects.push(NodeEffect::Emit(Message::Data {
                    sender: self.id,
                    root: self.id,
                    payload: send_string.clone(),
                }));
            }
        }

        effects
    }

    /// Dispatches one already-parsed inbound message.
    fn handle(&mut self, now: u32, message: Message) -> Vec<NodeEffect> {
        match message {
            Message::Hello { sender } => {
                self.unicast.refresh_in_neighbor(sender, now);
                Vec::new()
            }
            Message::InDistance { sender, distances } => {
                self.unicast.apply_in_distance(sender, &distances);
                Vec::new()
            }
            Message::DVector { sender, origin, distances, in_neighbors } => {
                let mut effects = Vec::new();
                if in_neighbors.contains(&self.id) {
                    self.unicast.update_out_distances(origin, &distances);
                    self.unicast.mark_out_refreshed(origin, now);
                }
                if self.unicast.should_flood(sender, origin) {
                    effects.push(NodeEffect::Emit(Message::DVector {
                        sender: self.id,
                        origin,
                        distances,
                        in_neighbors,
                    }));
                }
                effects
            }
            Message::Join { rid, sid, pid, nid } => {
                match self.multicast.process_join(rid, sid, pid, nid, now, &self.unicast) {
                    Some(forward) => vec![NodeEffect::Emit(forward)],
                    None => Vec::new(),
                }
            }
            Message::Data { sender, root, payload } => {
                let outcome = self.multicast.process_data(sender, root, &payload, &self.unicast);
                let mut effects = Vec::new();
                if outcome.deliver {
                    effects.push(NodeEffect::Deliver { root, payload });
                }
                if let Some(forward) = outcome.forward {
                    effects.push(NodeEffect::Emit(forward));
                }
                effects
            }
        }
    }
}

impl Protocol<NodeEvent> for Engine {
    type Effect = Vec<NodeEffect>;

    fn update(&mut self, event: NodeEvent) -> Self::Effect {
        match event {
            NodeEvent::Init => Vec::new(),
            NodeEvent::Tick(now) => self.tick(now),
            NodeEvent::Handle(now, message) => self.handle(now, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_tick_emits_on_schedule() {
        let mut engine = Engine::new(0, Mode::None, EngineConfig::default());
        let effects = engine.update(NodeEvent::Tick(0));
        assert!(effects.contains(&NodeEffect::Emit(Message::Hello { sender: 0 })));
        let effects = engine.update(NodeEvent::Tick(1));
        assert!(!effects.iter().any(|e| matches!(e, NodeEffect::Emit(Message::Hello { .. }))));
    }

    #[test]
    fn sender_emits_data_every_data_period() {
        let mut engine =
            Engine::new(0, Mode::Sender { send_string: "hi".to_string() }, EngineConfig::default());
        let effects = engine.update(NodeEvent::Tick(0));
        assert!(effects.contains(&NodeEffect::Emit(Message::Data { sender: 0, root: 0, payload: "hi".to_string() })));
        let effects = engine.update(NodeEvent::Tick(5));
        assert!(!effects.iter().any(|e| matches!(e, NodeEffect::Emit(Message::Data { .. }))));
    }

    #[test]
    fn forwarder_never_emits_data() {
        let mut engine = Engine::new(0, Mode::None, EngineConfig::default());
        for t in 0..20 {
            let effects = engine.update(NodeEvent::Tick(t));
            assert!(!effects.iter().any(|e| matches!(e, NodeEffect::Emit(Message::Data { .. }))));
        }
    }

    #[test]
    fn hello_then_in_distance_builds_route() {
        let mut node1 = Engine::new(1, Mode::None, EngineConfig::default());
        node1.update(NodeEvent::Handle(0, Message::Hello { sender: 0 }));
        assert_eq!(node1.in_distance(0), Distance::finite(1));
    }

    #[test]
    fn receiver_mode_preseeds_multicast_self_entry() {
        let engine = Engine::new(3, Mode::Receiver { observed_sender_id: 0 }, EngineConfig::default());
        assert_eq!(engine.multicast().entries(0).len(), 1);
        assert_eq!(engine.multicast().entries(0)[0].receiver_id, 3);
    }
}
