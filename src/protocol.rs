//! The minimal event/effect shape the teacher's `dsys::protocol` module uses
//! to drive its node cores, trimmed to the one piece this system needs: a
//! single protocol producing a list of effects per event. The teacher's
//! combinators for composing several distinct protocols (`Then`, `EachThen`,
//! `Multiplex`, `Generate`) have no caller here, since this system has
//! exactly one protocol, and are not carried over.

/// A state machine driven by discrete events, each producing zero or more
/// effects.
pub trait Protocol<Event> {
    type Effect;

    fn update(&mut self, event: Event) -> Self::Effect;
}

/// An effect value that can be empty, built from one atom, and concatenated
/// with another of the same type. `Engine::update` returns `Vec<NodeEffect>`,
/// for which this is simply list concatenation.
pub trait Composite: Sized {
    type Atom;

    const NOP: Self;

    fn pure(atom: Self::Atom) -> Self;

    fn compose(self, other: Self) -> Self;
}

impl<E> Composite for Vec<E> {
    type Atom = E;

    const NOP: Self = Vec::new();

    fn pure(atom: Self::Atom) -> Self {
        vec![atom]
    }

    fn compose(mut self, other: Self) -> Self {
        self.extend(other);
        self
    }
}
