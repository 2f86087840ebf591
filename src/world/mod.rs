//! # World Collaborator Seams
//!
//! The peripheral core never owns the 3-D world; it consumes it through the
//! traits in this module. The surrounding host (a game server, a test
//! harness, the bundled [`SimWorld`]) implements them:
//!
//! - [`SignalIo`]: binary signal levels plus human-visible material feedback
//! - [`ClaimCheck`]: may an owner occupy a given position at creation time
//! - [`Notify`]: best-effort owner messaging, fire-and-forget
//!
//! All three are object-safe so hosts can hand the core `&mut dyn` references
//! where generics are inconvenient.
//!
//! ## Material Tags
//!
//! [`MaterialTag`] is opaque to the core's logic: the state machine only ever
//! compares tags for equality (the stale-origin check) and writes them back
//! out for visual feedback. The palette types ([`Materials`], [`ColorScheme`])
//! live in [`palette`].

pub mod palette;
pub mod sim;

pub use palette::{ColorScheme, ColorSchemes, Materials};
pub use sim::SimWorld;

use crate::geom::Position;
use crate::types::OwnerId;

/// Human-visible material at a position. Opaque to core logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialTag(pub &'static str);

impl std::fmt::Display for MaterialTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Binary signal levels and visual state at world positions.
pub trait SignalIo {
    /// Active/high state at `position`. A position that cannot carry a
    /// signal (foreign block, unloaded space) reads as `false`; the codec
    /// degrades gracefully rather than failing a whole bus read.
    fn signal(&self, position: Position) -> bool;

    fn set_signal(&mut self, position: Position, high: bool);

    /// Visible material at `position`, if any is known to the host.
    fn visual(&self, position: Position) -> Option<MaterialTag>;

    fn set_visual(&mut self, position: Position, tag: MaterialTag);
}

/// Position-claim permission check, consulted once per position when a
/// connection is registered or reopened.
pub trait ClaimCheck {
    fn can_claim(&self, owner: OwnerId, position: Position) -> bool;
}

/// Best-effort owner notification. Implementations must not block the tick
/// loop; a lost message is acceptable, a stalled step is not.
pub trait Notify {
    fn notify(&mut self, owner: OwnerId, message: &str);
}
