//! # Connection Properties
//!
//! The immutable device configuration carried by every connection. Hosts
//! build the struct literally and call [`ConnectionProperties::validated`]
//! before handing it to the registry; the registry refuses anything else.

use crate::config::{
    MAX_ADDRESS_BITS, MAX_PAGE_SIZE_BYTES, MAX_WORD_SIZE, MIN_ADDRESS_BITS, MIN_WORD_SIZE,
};
use crate::error::{Error, Result};
use crate::geom::{Layout, Position};
use crate::store::page_size_bytes;
use crate::world::ColorScheme;

/// Whether the device serves reads from or accepts writes to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnMode {
    Read,
    Write,
}

impl std::fmt::Display for ConnMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnMode::Read => "read",
            ConnMode::Write => "write",
        })
    }
}

/// Immutable configuration of one storage device.
#[derive(Debug, Clone)]
pub struct ConnectionProperties {
    pub mode: ConnMode,
    pub origin: Position,
    pub layout: Layout,
    /// Rendering only; opaque to the state machine.
    pub scheme: ColorScheme,
    /// Width of the address bus, 1..=16 bits.
    pub address_bits: u32,
    /// Width of one transferred word, 1..=32 bits.
    pub word_size: u32,
    /// Words per page; one transaction always moves a whole page.
    pub page_size_words: u32,
    /// Addressable pages; clamped to `2^address_bits` by validation.
    pub page_count: u32,
    /// Latency units between strobe assertion and the first word.
    pub latency: u32,
    /// Latency units between successive words.
    pub data_rate: u32,
    /// Backing file name, owner-relative.
    pub file: String,
}

impl ConnectionProperties {
    /// Range-check everything and clamp `page_count` to the address space.
    pub fn validated(mut self) -> Result<Self> {
        fn reject(reason: impl Into<String>) -> Error {
            Error::InvalidProperties {
                reason: reason.into(),
            }
        }

        if !(MIN_ADDRESS_BITS..=MAX_ADDRESS_BITS).contains(&self.address_bits) {
            return Err(reject(format!(
                "address bits must be {MIN_ADDRESS_BITS}..={MAX_ADDRESS_BITS}, got {}",
                self.address_bits
            )));
        }
        if !(MIN_WORD_SIZE..=MAX_WORD_SIZE).contains(&self.word_size) {
            return Err(reject(format!(
                "word size must be {MIN_WORD_SIZE}..={MAX_WORD_SIZE}, got {}",
                self.word_size
            )));
        }
        if self.page_size_words == 0 {
            return Err(reject("page size must be at least one word"));
        }
        // Sized in u64 so a huge word count cannot overflow the check itself.
        let page_bytes =
            (u64::from(self.page_size_words) * u64::from(self.word_size)).div_ceil(8);
        if page_bytes > u64::from(MAX_PAGE_SIZE_BYTES) {
            return Err(reject(format!(
                "page size must be at most {MAX_PAGE_SIZE_BYTES} bytes, got {page_bytes}"
            )));
        }
        if self.data_rate == 0 {
            return Err(reject("data rate must be at least one tick per word"));
        }
        if !self.layout.has_valid_spacing() {
            return Err(reject("layout spacing must be nonzero"));
        }
        if self.file.is_empty() {
            return Err(reject("backing file name must not be empty"));
        }

        self.page_count = self.page_count.min(1 << self.address_bits);
        if self.page_count == 0 {
            return Err(reject("page count must be at least one"));
        }

        Ok(self)
    }

    /// Bytes per page: `ceil(page_size_words * word_size / 8)`.
    pub fn page_size_bytes(&self) -> u32 {
        page_size_bytes(self.page_size_words, self.word_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Direction, Layouts};
    use crate::world::{ColorSchemes, MaterialTag};

    fn props() -> ConnectionProperties {
        let layout = (Layouts::new().default_spec())(Direction::East, 4, 8);
        ConnectionProperties {
            mode: ConnMode::Read,
            origin: Position::new(0, 64, 0),
            layout,
            scheme: ColorSchemes::new().default_scheme(),
            address_bits: 4,
            word_size: 8,
            page_size_words: 8,
            page_count: 16,
            latency: 4,
            data_rate: 2,
            file: "disk.bin".to_string(),
        }
    }

    #[test]
    fn valid_properties_pass() {
        let validated = props().validated().unwrap();
        assert_eq!(validated.page_count, 16);
        assert_eq!(validated.page_size_bytes(), 8);
    }

    #[test]
    fn page_count_clamps_to_address_space() {
        let mut p = props();
        p.page_count = 500;
        assert_eq!(p.validated().unwrap().page_count, 16);
    }

    #[test]
    fn out_of_range_widths_rejected() {
        let mut p = props();
        p.address_bits = 0;
        assert!(p.validated().is_err());

        let mut p = props();
        p.address_bits = 17;
        assert!(p.validated().is_err());

        let mut p = props();
        p.word_size = 33;
        assert!(p.validated().is_err());
    }

    #[test]
    fn oversized_pages_rejected_without_overflow() {
        // Passes the nonzero check but would overflow u32 byte arithmetic.
        let mut p = props();
        p.page_size_words = u32::MAX / 8;
        p.word_size = 32;
        assert!(matches!(
            p.validated(),
            Err(Error::InvalidProperties { .. })
        ));

        // Exactly at the cap with 8-bit words is still accepted.
        let mut p = props();
        p.page_size_words = MAX_PAGE_SIZE_BYTES;
        assert_eq!(
            p.validated().unwrap().page_size_bytes(),
            MAX_PAGE_SIZE_BYTES
        );
    }

    #[test]
    fn degenerate_layout_rejected() {
        let mut p = props();
        p.layout.data_spacing = crate::geom::BlockOffset::ZERO;
        assert!(matches!(
            p.validated(),
            Err(Error::InvalidProperties { .. })
        ));
    }

    #[test]
    fn non_byte_aligned_words_round_up() {
        let mut p = props();
        p.word_size = 12;
        p.page_size_words = 5;
        let p = p.validated().unwrap();
        assert_eq!(p.page_size_bytes(), 8); // 60 bits

        let mut p = props();
        p.scheme = ColorScheme {
            address: MaterialTag("blue_wool"),
            data: MaterialTag("brown_wool"),
        };
        p.word_size = 1;
        p.page_size_words = 1;
        assert_eq!(p.validated().unwrap().page_size_bytes(), 1);
    }
}
