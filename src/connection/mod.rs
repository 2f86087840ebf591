//! # Storage Connection
//!
//! The transaction state machine at the heart of the peripheral. A
//! connection sits Idle until its strobe line is asserted, then runs exactly
//! one page-sized transaction and returns to Idle:
//!
//! ```text
//!            strobe high, address decoded
//!   Idle ───────────────────────────────────> Active
//!    ^                                          │
//!    │   cursor consumed whole page, timer due  │
//!    └──────────────────────────────────────────┘
//!                  (finalize: commit / reset lines)
//! ```
//!
//! ## Timing
//!
//! An external scheduler calls [`StorageConnection::step`] once per discrete
//! time unit. The machine counts two sub-ticks per abstract latency or
//! data-rate unit, so with latency `L`, data rate `R` and `N` words per page
//! the first word transfers at tick `2L` and the transaction completes at
//! `2L + N*2R` (give or take the terminal check). The timing runs the same
//! whether or not the address is in range or the backing file is healthy;
//! only the data differs.
//!
//! ## Word/Cursor Bit Order
//!
//! Bit `i` of a transferred word (bit 0 = LSB) maps to cursor bit `i`, and
//! the cursor advances LSB-first within each page byte. On the bus itself
//! the codec packs MSB-first. This exact order is preserved for
//! compatibility with files written by existing devices.
//!
//! ## Failure Absorption
//!
//! I/O errors inside a transaction never escape a step: a failed page read
//! leaves the buffer zero-filled, a failed or quota-rejected commit leaves
//! the file untouched, and in both cases the owner is notified best-effort.
//! The only error [`StorageConnection::step`] returns is `StaleOrigin`,
//! which tells the registry to unregister the connection.

pub mod properties;

pub use properties::{ConnMode, ConnectionProperties};

use smallvec::SmallVec;
use tracing::{info, warn};

use crate::bus;
use crate::config::{QuotaLimits, SUB_TICKS_PER_UNIT};
use crate::error::{Error, Result};
use crate::geom::{Position, STROBE_OFFSET};
use crate::store::{PageFile, Sandbox};
use crate::types::OwnerId;
use crate::world::{Materials, Notify, SignalIo};

/// Transient state of one in-flight transaction. Exists only between strobe
/// assertion and finalization; never more than one per connection.
#[derive(Debug)]
struct TxnState {
    /// Target page, as decoded from the address bus.
    address: u32,
    /// Page-sized transfer buffer.
    page: Vec<u8>,
    /// Sub-ticks until the next word transfer (or the terminal check).
    timer: i64,
    /// Byte the cursor sits in.
    byte_position: usize,
    /// Bit within that byte, 0..8, advancing LSB-first.
    bit_position: u32,
}

enum Phase {
    Wait,
    Transfer,
    Finish,
}

/// One live storage device: immutable properties plus at most one in-flight
/// transaction.
#[derive(Debug)]
pub struct StorageConnection {
    props: ConnectionProperties,
    owner: OwnerId,
    materials: Materials,
    limits: QuotaLimits,
    sandbox: Sandbox,
    file: PageFile,
    strobe: Position,
    address_start: Position,
    data_start: Position,
    transaction: Option<TxnState>,
}

impl StorageConnection {
    /// Build a connection from validated properties. Resolves the backing
    /// file inside the owner sandbox; fails with `PathEscape` without
    /// touching the filesystem if the name escapes.
    pub fn new(
        props: ConnectionProperties,
        owner: OwnerId,
        materials: Materials,
        limits: QuotaLimits,
        sandbox: Sandbox,
    ) -> Result<Self> {
        let path = sandbox.resolve(&props.file)?;
        let file = PageFile::new(path, props.page_size_bytes(), props.page_count);
        Ok(Self {
            strobe: props.origin.offset(STROBE_OFFSET),
            address_start: props.origin.offset(props.layout.address),
            data_start: props.origin.offset(props.layout.data),
            props,
            owner,
            materials,
            limits,
            sandbox,
            file,
            transaction: None,
        })
    }

    pub fn props(&self) -> &ConnectionProperties {
        &self.props
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn is_active(&self) -> bool {
        self.transaction.is_some()
    }

    /// Every world position this connection occupies: origin, strobe, and
    /// both bus lines.
    pub fn positions(&self) -> SmallVec<[Position; 16]> {
        let mut all = SmallVec::new();
        all.push(self.props.origin);
        all.push(self.strobe);
        for i in 0..self.props.address_bits as i32 {
            all.push(self.props.layout.address_spacing.walk(self.address_start, i));
        }
        for i in 0..self.props.word_size as i32 {
            all.push(self.props.layout.data_spacing.walk(self.data_start, i));
        }
        all
    }

    /// Paint the device into the world: origin marker, mode-colored strobe,
    /// and the scheme's address/data materials.
    pub fn place<W: SignalIo>(&self, world: &mut W) {
        world.set_visual(self.props.origin, self.materials.origin);
        world.set_visual(self.strobe, self.strobe_material());
        for i in 0..self.props.address_bits as i32 {
            let pos = self.props.layout.address_spacing.walk(self.address_start, i);
            world.set_visual(pos, self.props.scheme.address);
        }
        for i in 0..self.props.word_size as i32 {
            let pos = self.props.layout.data_spacing.walk(self.data_start, i);
            world.set_visual(pos, self.props.scheme.data);
        }
    }

    /// Advance the connection by one scheduler tick.
    ///
    /// Idle with the strobe low is a no-op. Strobe high opens a transaction
    /// and immediately performs its first Active step, so bus feedback
    /// happens on the same tick. The only returned error is
    /// [`Error::StaleOrigin`].
    pub fn step<H: SignalIo + Notify>(&mut self, host: &mut H) -> Result<()> {
        if host.visual(self.props.origin) != Some(self.materials.origin) {
            return Err(Error::StaleOrigin {
                origin: self.props.origin,
            });
        }

        if self.transaction.is_none() {
            if !host.signal(self.strobe) {
                return Ok(());
            }
            self.begin(host);
        }
        self.advance(host);
        Ok(())
    }

    /// Force the terminal condition on any in-flight transaction, as if the
    /// cursor had consumed the whole page: a write-mode buffer is committed.
    /// Used by the disable path; a no-op when Idle.
    pub fn finalize<H: SignalIo + Notify>(&mut self, host: &mut H) {
        self.finish(host);
    }

    /// Discard any in-flight transaction without committing. Used by the
    /// destruction path.
    pub fn abort(&mut self) {
        self.transaction = None;
    }

    /// Swap the backing file. The caller (the registry's reopen path) has
    /// already validated the new name and finalized any in-flight
    /// transaction.
    pub(crate) fn set_backing(&mut self, file_name: String, file: PageFile) {
        self.props.file = file_name;
        self.file = file;
    }

    fn strobe_material(&self) -> crate::world::MaterialTag {
        match self.props.mode {
            ConnMode::Read => self.materials.read_bit,
            ConnMode::Write => self.materials.write_bit,
        }
    }

    fn begin<H: SignalIo + Notify>(&mut self, host: &mut H) {
        let address = bus::read_bits(
            &*host,
            self.address_start,
            self.props.address_bits,
            self.props.layout.address_spacing,
        );
        info!(mode = %self.props.mode, address, file = %self.props.file, "transaction opened");

        let mut page = vec![0u8; self.props.page_size_bytes() as usize];
        if self.props.mode == ConnMode::Read && address < self.props.page_count {
            match self.file.read_page(address) {
                Ok(data) => page = data,
                Err(err) => {
                    // Deterministic even on I/O failure: the device serves
                    // zeroes and the transaction runs its full timing.
                    warn!(address, error = %err, "page read failed, serving zeroes");
                    host.notify(
                        self.owner,
                        &format!("read of '{}' page {address} failed: {err}", self.props.file),
                    );
                }
            }
        }

        self.transaction = Some(TxnState {
            address,
            page,
            timer: i64::from(self.props.latency) * i64::from(SUB_TICKS_PER_UNIT),
            byte_position: 0,
            bit_position: 0,
        });
        host.set_visual(self.strobe, self.materials.on_block);
    }

    fn advance<H: SignalIo + Notify>(&mut self, host: &mut H) {
        let phase = match self.transaction.as_mut() {
            None => return,
            Some(txn) => {
                txn.timer -= 1;
                if txn.timer > 0 {
                    Phase::Wait
                } else if txn.byte_position >= txn.page.len() {
                    Phase::Finish
                } else {
                    txn.timer =
                        i64::from(self.props.data_rate) * i64::from(SUB_TICKS_PER_UNIT);
                    Phase::Transfer
                }
            }
        };

        match phase {
            Phase::Wait => {}
            Phase::Finish => self.finish(host),
            Phase::Transfer => match self.props.mode {
                ConnMode::Read => self.drive_word(host),
                ConnMode::Write => self.sample_word(host),
            },
        }
    }

    /// Pop one word off the page buffer and drive it onto the data bus.
    /// Bits past the end of the buffer drive low.
    fn drive_word<H: SignalIo>(&mut self, host: &mut H) {
        let Some(txn) = self.transaction.as_mut() else {
            return;
        };

        let mut word = 0u32;
        for index in 0..self.props.word_size {
            if txn.byte_position >= txn.page.len() {
                break;
            }
            if txn.page[txn.byte_position] & (1 << txn.bit_position) != 0 {
                word |= 1 << index;
            }
            txn.bit_position += 1;
            if txn.bit_position >= 8 {
                txn.bit_position = 0;
                txn.byte_position += 1;
            }
        }

        bus::write_bits(
            host,
            self.data_start,
            self.props.word_size,
            self.props.layout.data_spacing,
            word,
        );
    }

    /// Sample one word off the data bus and splice it into the page buffer
    /// at the cursor.
    fn sample_word<H: SignalIo>(&mut self, host: &mut H) {
        let word = bus::read_bits(
            &*host,
            self.data_start,
            self.props.word_size,
            self.props.layout.data_spacing,
        );

        let Some(txn) = self.transaction.as_mut() else {
            return;
        };
        for index in 0..self.props.word_size {
            if txn.byte_position >= txn.page.len() {
                break;
            }
            let mask = 1u8 << txn.bit_position;
            if word & (1 << index) != 0 {
                txn.page[txn.byte_position] |= mask;
            } else {
                txn.page[txn.byte_position] &= !mask;
            }
            txn.bit_position += 1;
            if txn.bit_position >= 8 {
                txn.bit_position = 0;
                txn.byte_position += 1;
            }
        }
    }

    /// Active -> Idle: commit a write-mode buffer, restore the idle visuals
    /// on both bus lines, clear the transaction. Signal levels are only
    /// driven low on lines this device drives itself (the data bus in Read
    /// mode); the address bus and a Write-mode data bus belong to the host,
    /// and whatever it holds there must survive into the next transaction.
    fn finish<H: SignalIo + Notify>(&mut self, host: &mut H) {
        let Some(txn) = self.transaction.take() else {
            return;
        };
        info!(mode = %self.props.mode, address = txn.address, "transaction closed");

        host.set_visual(self.strobe, self.strobe_material());
        for i in 0..self.props.address_bits as i32 {
            let pos = self.props.layout.address_spacing.walk(self.address_start, i);
            host.set_visual(pos, self.props.scheme.address);
        }
        for i in 0..self.props.word_size as i32 {
            let pos = self.props.layout.data_spacing.walk(self.data_start, i);
            if self.props.mode == ConnMode::Read {
                host.set_signal(pos, false);
            }
            host.set_visual(pos, self.props.scheme.data);
        }

        if self.props.mode == ConnMode::Write && txn.address < self.props.page_count {
            if let Err(err) =
                self.file
                    .write_page(txn.address, &txn.page, &self.limits, &self.sandbox)
            {
                warn!(address = txn.address, error = %err, "page commit rejected");
                host.notify(
                    self.owner,
                    &format!(
                        "write to '{}' page {} failed: {err}",
                        self.props.file, txn.address
                    ),
                );
            }
        }
    }
}
