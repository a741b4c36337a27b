//! Forward edges of one producer.
//!
//! Slots are addressed by the dependent's id, so delivering a freshly produced
//! value is a walk over the populated slots, no lookup structure involved.

use crate::domain::{BlockId, Connector, Link};

/// One value edge out of a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conn {
    pub dependent: BlockId,
    pub source: Connector,
    pub target: Connector,
}

impl Conn {
    pub fn from_link(link: &Link) -> Self {
        Self {
            dependent: link.target.block,
            source: link.source.clone(),
            target: link.target.clone(),
        }
    }

    pub fn describe(&self) -> String {
        format!("{} -> {}", self.source, self.target)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Conns {
    slots: Vec<Vec<Conn>>,
    len: usize,
}

impl Conns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `conn` at `index`, growing the slot array to fit.
    pub fn add(&mut self, index: usize, conn: Conn) {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, Vec::new);
        }
        self.slots[index].push(conn);
        self.len += 1;
    }

    /// Visit every conn in slot order; empty slots are skipped.
    pub fn for_each(&self, mut f: impl FnMut(&Conn)) {
        self.iter().for_each(|conn| f(conn));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conn> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
