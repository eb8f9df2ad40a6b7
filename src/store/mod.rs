//! Non-volatile chamber state.
//!
//! The medium only has to load and save one fixed-size header
//! ([`HeaderStore`]). [`StateStore`] layers the chamber contract on top:
//! first-boot initialisation, fail-closed reads and the single commit write.
//!
//! There is no journaling. If power drops in the middle of a save the header
//! may come back invalid on the next boot, which is recovered like erased
//! storage (chamber 0). A region the medium cannot parse at all is erased
//! and written again. The worst case is the wrong chamber, never a crash.

pub mod memory;

#[cfg(feature = "embedded")]
pub mod flash;

use core::future::Future;

use crate::chamber::{Chamber, Header, HEADER_LEN};
use crate::error::Error;

pub use memory::MemoryStore;

/// Raw access to the persisted header bytes.
pub trait HeaderStore {
    /// Read the header. `Ok(None)` means nothing has ever been stored.
    fn load(&mut self) -> impl Future<Output = Result<Option<[u8; HEADER_LEN]>, Error>>;

    /// Replace the header.
    fn save(&mut self, header: &[u8; HEADER_LEN]) -> impl Future<Output = Result<(), Error>>;

    /// Wipe the whole storage region. Afterwards `load` returns `Ok(None)`.
    fn erase(&mut self) -> impl Future<Output = Result<(), Error>>;
}

/// Chamber index persisted through a [`HeaderStore`].
pub struct StateStore<S> {
    medium: S,
    total: u8,
    /// Chamber validated by `initialize_if_absent`, consumed by the next
    /// `read_chamber` so a boot loads the header once.
    validated: Option<Chamber>,
}

impl<S: HeaderStore> StateStore<S> {
    /// Wrap `medium` for a rotation of `total` chambers.
    ///
    /// # Panics
    ///
    /// If `total` is zero.
    pub fn new(medium: S, total: u8) -> Self {
        assert!(total >= 1, "a rotation needs at least one chamber");
        Self {
            medium,
            total,
            validated: None,
        }
    }

    pub fn total(&self) -> u8 {
        self.total
    }

    pub fn medium(&self) -> &S {
        &self.medium
    }

    pub fn into_inner(self) -> S {
        self.medium
    }

    /// Write a fresh header at chamber 0 unless a valid one is already
    /// present. Safe to call on every boot; returns `true` if it wrote.
    ///
    /// A header whose index is out of range for the configured chamber count
    /// is treated the same as a missing one.
    pub async fn initialize_if_absent(&mut self) -> bool {
        match self.current().await {
            Ok(chamber) => {
                self.validated = Some(chamber);
                false
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Chamber header invalid ({}), initialising to 0", _e);

                if let Err(_e) = self.write_chamber(Chamber::FIRST).await {
                    #[cfg(feature = "defmt")]
                    defmt::error!("Chamber header init failed: {}", _e);
                }
                // A failed init still reads as chamber 0.
                self.validated = Some(Chamber::FIRST);
                true
            }
        }
    }

    /// The persisted chamber. Any fault reads as chamber 0.
    ///
    /// Right after [`initialize_if_absent`](Self::initialize_if_absent) this
    /// returns the chamber it already validated without touching the medium.
    pub async fn read_chamber(&mut self) -> Chamber {
        if let Some(chamber) = self.validated.take() {
            return chamber;
        }
        match self.current().await {
            Ok(chamber) => chamber,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Chamber read failed ({}), using chamber 0", _e);
                Chamber::FIRST
            }
        }
    }

    /// Persist `chamber` as the one to evaluate on the next boot.
    ///
    /// If the medium reports [`Error::CorruptStorage`] the region is erased
    /// and the write retried once.
    pub async fn write_chamber(&mut self, chamber: Chamber) -> Result<(), Error> {
        self.validated = None;
        let header = Header::new(chamber).to_bytes();

        match self.medium.save(&header).await {
            Err(Error::CorruptStorage) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Storage region corrupt, erasing");

                self.medium.erase().await?;
                self.medium.save(&header).await
            }
            result => result,
        }
    }

    async fn current(&mut self) -> Result<Chamber, Error> {
        let bytes = self.medium.load().await?.ok_or(Error::CorruptHeader)?;
        Header::from_bytes(&bytes)
            .ok_or(Error::CorruptHeader)?
            .chamber(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chamber::Header;
    use embassy_futures::block_on;

    fn store(medium: MemoryStore) -> StateStore<MemoryStore> {
        StateStore::new(medium, 3)
    }

    fn chamber(i: u8) -> Chamber {
        Chamber::new(i, 3).unwrap()
    }

    #[test]
    fn fresh_store_is_initialised_to_chamber_zero() {
        let mut s = store(MemoryStore::erased());
        assert!(block_on(s.initialize_if_absent()));
        assert_eq!(s.medium().contents(), Some(Header::new(Chamber::FIRST).to_bytes()));
        assert_eq!(block_on(s.read_chamber()), Chamber::FIRST);
    }

    #[test]
    fn initialise_is_idempotent() {
        let mut s = store(MemoryStore::with_header(Header::new(chamber(2))));
        for _ in 0..5 {
            assert!(!block_on(s.initialize_if_absent()));
        }
        assert_eq!(block_on(s.read_chamber()), chamber(2));
        assert_eq!(s.medium().write_count(), 0);
    }

    #[test]
    fn foreign_magic_is_reset() {
        let mut s = store(MemoryStore::with_bytes([0xAA, 0x55, 0x01]));
        assert!(block_on(s.initialize_if_absent()));
        assert_eq!(block_on(s.read_chamber()), Chamber::FIRST);
    }

    #[test]
    fn out_of_range_index_is_reset() {
        let mut s = store(MemoryStore::with_header(Header {
            magic: crate::config::HEADER_MAGIC,
            chamber: 7,
        }));
        assert!(block_on(s.initialize_if_absent()));
        assert_eq!(block_on(s.read_chamber()), Chamber::FIRST);
        assert_eq!(s.medium().write_count(), 1);
    }

    #[test]
    fn read_without_init_fails_closed() {
        let mut s = store(MemoryStore::with_bytes([0x43, 0x52, 0x09]));
        assert_eq!(block_on(s.read_chamber()), Chamber::FIRST);
        assert_eq!(s.medium().write_count(), 0);
    }

    #[test]
    fn read_error_fails_closed() {
        let mut s = store(MemoryStore::with_header(Header::new(chamber(1))).failing_reads());
        assert_eq!(block_on(s.read_chamber()), Chamber::FIRST);
    }

    #[test]
    fn write_error_is_reported() {
        let mut s = store(MemoryStore::erased().failing_writes());
        assert_eq!(block_on(s.write_chamber(chamber(1))), Err(Error::Storage));
        // Initialisation swallows the failure; reads keep falling back to 0.
        assert!(block_on(s.initialize_if_absent()));
        assert_eq!(block_on(s.read_chamber()), Chamber::FIRST);
    }

    #[test]
    fn corrupt_region_is_erased_and_reinitialised() {
        let mut s = store(MemoryStore::erased().corrupted());
        assert!(block_on(s.initialize_if_absent()));
        assert_eq!(block_on(s.read_chamber()), Chamber::FIRST);
        assert_eq!(s.medium().erase_count(), 1);
        assert_eq!(s.medium().contents(), Some(Header::new(Chamber::FIRST).to_bytes()));

        // The region is usable again: later commits land without erasing.
        block_on(s.write_chamber(chamber(1))).unwrap();
        assert_eq!(block_on(s.read_chamber()), chamber(1));
        assert_eq!(s.medium().erase_count(), 1);
    }

    #[test]
    fn erase_failure_is_reported() {
        let mut s = store(MemoryStore::erased().corrupted().failing_writes());
        assert_eq!(block_on(s.write_chamber(chamber(1))), Err(Error::Storage));
        assert_eq!(s.medium().write_count(), 0);
    }

    #[test]
    fn init_then_read_loads_once() {
        for medium in [
            MemoryStore::erased(),
            MemoryStore::with_header(Header::new(chamber(2))),
            MemoryStore::with_bytes([0xAA, 0x55, 0x01]),
        ] {
            let mut s = store(medium);
            block_on(s.initialize_if_absent());
            block_on(s.read_chamber());
            assert_eq!(s.medium().read_count(), 1);
        }
    }

    #[test]
    fn read_after_write_goes_to_the_medium() {
        let mut s = store(MemoryStore::with_header(Header::new(chamber(2))));
        block_on(s.initialize_if_absent());
        block_on(s.write_chamber(chamber(0))).unwrap();
        assert_eq!(block_on(s.read_chamber()), chamber(0));
        assert_eq!(s.medium().read_count(), 2);
    }

    #[test]
    #[should_panic]
    fn zero_chambers_is_rejected() {
        let _ = StateStore::new(MemoryStore::erased(), 0);
    }

    #[test]
    fn write_then_read() {
        let mut s = store(MemoryStore::erased());
        block_on(s.write_chamber(chamber(2))).unwrap();
        assert_eq!(block_on(s.read_chamber()), chamber(2));
    }
}
