//! # Page File
//!
//! A backing file viewed as an array of fixed-size pages. Addressing is
//! plain arithmetic: page `a` occupies bytes `a * page_size_bytes ..
//! (a + 1) * page_size_bytes`.
//!
//! ## Policy
//!
//! - An address at or beyond the configured page count is silently skipped,
//!   for reads and writes alike. Address lines can present any value
//!   representable in the bus width, so an out-of-range address is normal
//!   input, not an error.
//! - Reading past end-of-file yields zero bytes. A page that was never
//!   written reads as all zeroes, matching what a fresh device would hold.
//! - Growth is checked against the file-size and total-space quotas before
//!   any byte is written; a rejected write leaves the prior content intact.
//! - The file handle is opened and closed within each call.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::QuotaLimits;
use crate::error::{Error, QuotaKind, Result};
use crate::store::Sandbox;

/// Bytes needed to hold `page_size_words` words of `word_size` bits each.
/// Words are bit-packed, so the page is rounded up to a whole byte.
pub const fn page_size_bytes(page_size_words: u32, word_size: u32) -> u32 {
    (page_size_words * word_size).div_ceil(8)
}

#[derive(Debug, Clone)]
pub struct PageFile {
    path: PathBuf,
    page_size_bytes: u32,
    page_count: u32,
}

impl PageFile {
    pub fn new<P: Into<PathBuf>>(path: P, page_size_bytes: u32, page_count: u32) -> Self {
        Self {
            path: path.into(),
            page_size_bytes,
            page_count,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size_bytes(&self) -> u32 {
        self.page_size_bytes
    }

    /// Read page `address`. Out-of-range addresses and absent files read as
    /// a zero page without touching the filesystem state.
    pub fn read_page(&self, address: u32) -> Result<Vec<u8>> {
        let mut page = vec![0u8; self.page_size_bytes as usize];
        if address >= self.page_count {
            return Ok(page);
        }

        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(page),
            Err(err) => return Err(Error::Io(err)),
        };

        file.seek(SeekFrom::Start(
            u64::from(address) * u64::from(self.page_size_bytes),
        ))?;

        // Short reads past end-of-file leave the tail zero-filled.
        let mut filled = 0;
        while filled < page.len() {
            match file.read(&mut page[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(Error::Io(err)),
            }
        }

        Ok(page)
    }

    /// Write `page` to `address`, growing the file if needed. Growth is
    /// subject to the quota check; on rejection nothing is written and the
    /// prior persisted content stands.
    pub fn write_page(
        &self,
        address: u32,
        page: &[u8],
        limits: &QuotaLimits,
        sandbox: &Sandbox,
    ) -> Result<()> {
        if address >= self.page_count {
            return Ok(());
        }

        let offset = u64::from(address) * u64::from(self.page_size_bytes);
        let required_len = offset + page.len() as u64;

        // Quota is judged before the file is opened, so a rejected write on
        // a fresh path leaves no empty file behind.
        let current_len = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == ErrorKind::NotFound => 0,
            Err(err) => return Err(Error::Io(err)),
        };
        if required_len > current_len {
            if required_len > limits.max_file_size {
                return Err(Error::QuotaExceeded {
                    kind: QuotaKind::FileSize,
                    limit: limits.max_file_size,
                    required: required_len,
                });
            }

            // Growth accounting uses the pre-write lengths: what the walk
            // observes on disk right now, plus the bytes this write adds.
            let growth = required_len - current_len;
            let used = sandbox.space_used();
            if used + growth > limits.max_total_space {
                return Err(Error::QuotaExceeded {
                    kind: QuotaKind::TotalSpace,
                    limit: limits.max_total_space,
                    required: used + growth,
                });
            }
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        if required_len > current_len {
            file.set_len(required_len)?;
        }
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page)?;
        Ok(())
    }
}
