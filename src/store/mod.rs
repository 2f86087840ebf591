//! # Paged Store
//!
//! The storage side of the peripheral: per-owner sandboxed directories of
//! page-oriented backing files.
//!
//! ## Directory Structure
//!
//! ```text
//! base_dir/
//! ├── 00000000000000a1/     # one sandbox per owner
//! │   ├── boot.bin          # backing files, arrays of fixed-size pages
//! │   └── save/game.bin     # subdirectories are allowed
//! └── 00000000000000b2/
//!     └── disk.bin
//! ```
//!
//! Only files carrying the recognized extension count toward quota
//! accounting; anything else in a sandbox is invisible to pagebus.
//!
//! ## Access Discipline
//!
//! Every page read or write opens and closes the file within the call. No
//! file descriptor is held across scheduler ticks, so external tooling and
//! quota recalculation never observe a connection holding a handle open
//! indefinitely. The registry's reader/writer policy is the sole guard
//! against interleaved access to a shared file.
//!
//! - [`sandbox`]: path confinement and on-demand quota walking
//! - [`page_file`]: bounded page reads, quota-checked growth and writes

pub mod page_file;
pub mod sandbox;

pub use page_file::{page_size_bytes, PageFile};
pub use sandbox::Sandbox;
