//! # pagebus - Signal-Driven Storage Peripheral Emulator
//!
//! pagebus emulates a memory-mapped storage peripheral placed in a simulated
//! 3-D world: a device addressed and driven entirely by binary signal lines
//! (an address bus, a strobe line, and a data bus), whose reads and writes
//! are serviced against a page-oriented backing file in a per-owner
//! sandboxed directory.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pagebus::{
//!     ConnMode, ConnectionProperties, MemoryCatalog, OwnerId, Registry,
//!     SimWorld,
//! };
//!
//! let mut world = SimWorld::new();
//! let mut registry = Registry::new("./owners", Default::default(), MemoryCatalog::new());
//!
//! let id = registry.register(OwnerId(1), properties, &mut world)?;
//!
//! // One call per discrete time unit, from the host's scheduler:
//! registry.step_all(&mut world);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Registry (admission, quotas, policy)  │
//! ├─────────────────────────────────────────┤
//! │  StorageConnection (transaction machine)│
//! ├────────────────────┬────────────────────┤
//! │  Bus Codec         │  Paged Store       │
//! ├────────────────────┼────────────────────┤
//! │  Geometry (Layout) │  Sandbox (quotas)  │
//! ├────────────────────┴────────────────────┤
//! │  World seams (SignalIo/ClaimCheck/...)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! Single-threaded, cooperative, tick-driven. The host invokes `step_all`
//! (or per-connection `step`) once per discrete time unit; a step always
//! runs to completion, state only advances monotonically, and blocking
//! page-sized file I/O happens synchronously inside the step. No file
//! handle survives across ticks.
//!
//! ## Module Overview
//!
//! - [`geom`]: positions, offsets, bus-line layouts and named presets
//! - [`world`]: collaborator traits plus the in-memory [`SimWorld`] host
//! - [`bus`]: MSB-first codec between words and signal positions
//! - [`store`]: sandbox confinement, quota walking, page file I/O
//! - [`connection`]: the Idle/Active transaction state machine
//! - [`registry`]: connection arena, admission checks, catalog mirror
//! - [`config`]: timing constants, property ranges, quota limits
//! - [`error`]: the typed rejection taxonomy

pub mod bus;
pub mod config;
pub mod connection;
pub mod error;
pub mod geom;
pub mod registry;
pub mod store;
pub mod types;
pub mod world;

pub use config::QuotaLimits;
pub use connection::{ConnMode, ConnectionProperties, StorageConnection};
pub use error::{Error, QuotaKind, Result};
pub use geom::{BlockOffset, Direction, Layout, Layouts, Position};
pub use registry::{Catalog, ConnectionMeta, MemoryCatalog, Registry};
pub use store::{PageFile, Sandbox};
pub use types::{ConnectionId, OwnerId};
pub use world::{ColorScheme, ColorSchemes, MaterialTag, Materials, SimWorld};
