//! # Bus Codec
//!
//! Bit-exact translation between a logical word and a run of binary signal
//! positions. The first position of a run carries the most significant bit;
//! walking continues along the supplied spacing, so the codec is independent
//! of the layout that produced the geometry.
//!
//! Codec operations are total: a position whose signal state cannot be read
//! contributes a 0 bit instead of failing the whole bus read, and writes
//! simply drive whatever positions they are given. The codec never allocates
//! or releases positions.
//!
//! ## Bit Order
//!
//! `read_bits` packs MSB-first: the value of an `n`-bit run is
//! `sum(signal(p_i) << (n - 1 - i))`. `write_bits` is the exact mirror.
//! How word bits map onto a page buffer's byte/bit cursor is the state
//! machine's concern, not the codec's.

use crate::geom::{BlockOffset, Position};
use crate::world::SignalIo;

/// Read `count` positions starting at `start`, packing MSB-first into a word.
pub fn read_bits<W: SignalIo + ?Sized>(
    world: &W,
    start: Position,
    count: u32,
    spacing: BlockOffset,
) -> u32 {
    let mut value = 0u32;
    let mut position = start;
    for index in 0..count {
        if world.signal(position) {
            value |= 1 << (count - index - 1);
        }
        position = position.offset(spacing);
    }
    value
}

/// Drive `count` positions starting at `start` with the bits of `value`,
/// MSB first.
pub fn write_bits<W: SignalIo + ?Sized>(
    world: &mut W,
    start: Position,
    count: u32,
    spacing: BlockOffset,
    value: u32,
) {
    let mut position = start;
    for index in 0..count {
        world.set_signal(position, value & (1 << (count - index - 1)) != 0);
        position = position.offset(spacing);
    }
}
