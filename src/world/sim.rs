//! # Reference World
//!
//! An in-memory host implementing every collaborator seam, used by the test
//! suite and by anyone embedding the emulator without a real 3-D world.
//! Signal and visual state are sparse maps; unknown positions read as
//! unpowered and unoccupied, which exercises the codec's treat-unreadable-
//! as-zero contract for free.

use hashbrown::{HashMap, HashSet};

use super::{ClaimCheck, MaterialTag, Notify, SignalIo};
use crate::geom::Position;
use crate::types::OwnerId;

#[derive(Debug, Default)]
pub struct SimWorld {
    signals: HashMap<Position, bool>,
    visuals: HashMap<Position, MaterialTag>,
    denied: HashSet<Position>,
    notifications: Vec<(OwnerId, String)>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a position as unclaimable by anyone.
    pub fn deny(&mut self, position: Position) {
        self.denied.insert(position);
    }

    /// Remove the visual at `position`, as if the block was broken.
    pub fn break_visual(&mut self, position: Position) {
        self.visuals.remove(&position);
    }

    /// Messages delivered so far, draining the log.
    pub fn drain_notifications(&mut self) -> Vec<(OwnerId, String)> {
        std::mem::take(&mut self.notifications)
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }
}

impl SignalIo for SimWorld {
    fn signal(&self, position: Position) -> bool {
        self.signals.get(&position).copied().unwrap_or(false)
    }

    fn set_signal(&mut self, position: Position, high: bool) {
        if high {
            self.signals.insert(position, true);
        } else {
            self.signals.remove(&position);
        }
    }

    fn visual(&self, position: Position) -> Option<MaterialTag> {
        self.visuals.get(&position).copied()
    }

    fn set_visual(&mut self, position: Position, tag: MaterialTag) {
        self.visuals.insert(position, tag);
    }
}

impl ClaimCheck for SimWorld {
    fn can_claim(&self, _owner: OwnerId, position: Position) -> bool {
        !self.denied.contains(&position)
    }
}

impl Notify for SimWorld {
    fn notify(&mut self, owner: OwnerId, message: &str) {
        self.notifications.push((owner, message.to_string()));
    }
}
