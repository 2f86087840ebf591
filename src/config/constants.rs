//! # Configuration Constants
//!
//! All numeric configuration values for pagebus, grouped so that
//! interdependent values stay together.
//!
//! ## Dependency Graph
//!
//! ```text
//! SUB_TICKS_PER_UNIT (2)
//!       │
//!       ├─> effective latency  = latency   * SUB_TICKS_PER_UNIT steps
//!       │
//!       └─> effective data rate = data_rate * SUB_TICKS_PER_UNIT steps/word
//!             The timing contract documented on StorageConnection::step
//!             (first word at 2L, completion at 2L + N*2R) assumes this
//!             value. Changing it changes every stored timing expectation.
//!
//! MAX_ADDRESS_BITS (16)
//!       │
//!       └─> page_count is clamped to 2^address_bits, so the largest
//!           addressable page space is 65536 pages.
//!
//! MAX_WORD_SIZE (32)
//!       │
//!       └─> words are packed into u32 by the bus codec; a wider word
//!           would silently truncate.
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `MAX_WORD_SIZE <= 32` (codec words travel as `u32`)
//! 2. `MIN_ADDRESS_BITS >= 1` and `MIN_WORD_SIZE >= 1` (a zero-width bus
//!    has no positions to read)

// ============================================================================
// TIMING MODEL
// The external scheduler invokes step() once per discrete time unit; the
// state machine counts two sub-ticks per abstract latency/data-rate unit.
// ============================================================================

/// Scheduler steps per abstract latency/data-rate unit.
pub const SUB_TICKS_PER_UNIT: u32 = 2;

const _: () = assert!(SUB_TICKS_PER_UNIT >= 1, "timer would never expire");

// ============================================================================
// PROPERTY RANGES
// Bounds validated when connection properties are constructed
// ============================================================================

/// Minimum width of the address bus in bits.
pub const MIN_ADDRESS_BITS: u32 = 1;

/// Maximum width of the address bus in bits.
pub const MAX_ADDRESS_BITS: u32 = 16;

/// Minimum width of one transferred word in bits.
pub const MIN_WORD_SIZE: u32 = 1;

/// Maximum width of one transferred word in bits.
/// Words are packed into `u32` by the bus codec.
pub const MAX_WORD_SIZE: u32 = 32;

const _: () = assert!(MAX_WORD_SIZE <= 32, "codec words travel as u32");

/// Maximum size of one page in bytes (16 MiB). A larger page could never
/// commit under any total-space quota worth running, and the bound keeps
/// `page_size_words * word_size` comfortably inside `u32` arithmetic.
pub const MAX_PAGE_SIZE_BYTES: u32 = 16 * 1024 * 1024;

const _: () = assert!(
    (MAX_PAGE_SIZE_BYTES as u64) * 8 <= u32::MAX as u64,
    "page bit counts must fit u32"
);

// ============================================================================
// SANDBOX LAYOUT
// ============================================================================

/// Extension of files recognized as connection backing storage. Quota
/// accounting (space and file count) only considers files carrying this
/// extension; anything else in the sandbox is invisible to pagebus.
pub const PAGE_FILE_EXTENSION: &str = "bin";

// ============================================================================
// DEFAULT QUOTA LIMITS
// Overridable per deployment through QuotaLimits
// ============================================================================

/// Default cap on a single backing file length (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default cap on total recognized data under one owner sandbox (16 MiB).
pub const DEFAULT_MAX_TOTAL_SPACE: u64 = 16 * 1024 * 1024;

/// Default cap on recognized data files per owner sandbox.
pub const DEFAULT_MAX_FILE_COUNT: u32 = 64;

/// Default cap on concurrently enabled connections per owner.
pub const DEFAULT_MAX_ENABLED_CONNECTIONS: u32 = 3;
