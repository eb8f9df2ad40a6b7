//! RAM-backed header store for host tests and simulations.
//!
//! Keeps the last [`WRITE_LOG_CAPACITY`] saves so tests can check how often
//! the medium was written, and can be told to fail reads or writes, or to
//! behave like a region full of foreign data until it is erased.

use heapless::Vec;

use super::HeaderStore;
use crate::chamber::{Header, HEADER_LEN};
use crate::error::Error;

/// Number of saves remembered by [`MemoryStore::writes`].
pub const WRITE_LOG_CAPACITY: usize = 32;

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    cell: Option<[u8; HEADER_LEN]>,
    writes: Vec<[u8; HEADER_LEN], WRITE_LOG_CAPACITY>,
    write_count: usize,
    read_count: usize,
    erase_count: usize,
    fail_reads: bool,
    fail_writes: bool,
    corrupt: bool,
}

impl MemoryStore {
    /// Storage that has never been written.
    pub fn erased() -> Self {
        Self::default()
    }

    /// Storage holding arbitrary bytes (possibly garbage).
    pub fn with_bytes(bytes: [u8; HEADER_LEN]) -> Self {
        Self {
            cell: Some(bytes),
            ..Self::default()
        }
    }

    pub fn with_header(header: Header) -> Self {
        Self::with_bytes(header.to_bytes())
    }

    /// Every subsequent `load` returns [`Error::Storage`].
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Every subsequent `save` returns [`Error::Storage`] and leaves the
    /// contents untouched.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Every `load` and `save` returns [`Error::CorruptStorage`] until the
    /// region is erased.
    pub fn corrupted(mut self) -> Self {
        self.corrupt = true;
        self
    }

    pub fn contents(&self) -> Option<[u8; HEADER_LEN]> {
        self.cell
    }

    /// Most recent successful saves, oldest first.
    pub fn writes(&self) -> &[[u8; HEADER_LEN]] {
        &self.writes
    }

    /// Total successful saves, including ones dropped from the log.
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Number of `load` calls, failed ones included.
    pub fn read_count(&self) -> usize {
        self.read_count
    }

    pub fn erase_count(&self) -> usize {
        self.erase_count
    }
}

impl HeaderStore for MemoryStore {
    async fn load(&mut self) -> Result<Option<[u8; HEADER_LEN]>, Error> {
        self.read_count += 1;
        if self.corrupt {
            return Err(Error::CorruptStorage);
        }
        if self.fail_reads {
            return Err(Error::Storage);
        }
        Ok(self.cell)
    }

    async fn save(&mut self, header: &[u8; HEADER_LEN]) -> Result<(), Error> {
        if self.corrupt {
            return Err(Error::CorruptStorage);
        }
        if self.fail_writes {
            return Err(Error::Storage);
        }
        self.cell = Some(*header);
        if self.writes.is_full() {
            self.writes.remove(0);
        }
        let _ = self.writes.push(*header);
        self.write_count += 1;
        Ok(())
    }

    async fn erase(&mut self) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Error::Storage);
        }
        self.cell = None;
        self.corrupt = false;
        self.erase_count += 1;
        Ok(())
    }
}
