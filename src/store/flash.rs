//! Chamber header kept in the nRF52840's internal flash.
//!
//! Uses the `sequential-storage` crate's key-value map over the pages
//! reserved in `config.rs` (and cut out of the image in `memory.x`).
//!
//! Storage layout:
//!   - One map item under `KEY_CHAMBER_HEADER` holding the raw header.
//!   - Items are appended sequentially; the flash pages are managed by
//!     `sequential-storage`, which handles wear levelling and GC. A new item
//!     is fully written before the previous one stops being current.
//!   - Pages holding anything else (e.g. leftovers from an older image)
//!     report `Corrupted`; that surfaces as `Error::CorruptStorage` and the
//!     state store answers it with `erase`.

use core::ops::Range;

use defmt::{debug, error, info, warn};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;

use super::HeaderStore;
use crate::chamber::HEADER_LEN;
use crate::config::{FLASH_PAGE_SIZE, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use crate::error::Error;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Key for the chamber header in the map storage.
const KEY_CHAMBER_HEADER: u8 = 0x01;

/// Scratch buffer for map operations (key + header + item overhead, word
/// aligned).
const MAX_RECORD_SIZE: usize = 32;

/// Map a `sequential-storage` failure onto the crate error.
fn storage_error<E: core::fmt::Debug>(e: sequential_storage::Error<E>) -> Error {
    match e {
        sequential_storage::Error::Corrupted { .. } => {
            warn!("Storage region corrupted");
            Error::CorruptStorage
        }
        e => {
            error!("Flash error: {:?}", defmt::Debug2Format(&e));
            Error::Storage
        }
    }
}

/// [`HeaderStore`] on top of any async NOR flash.
pub struct FlashStore<F> {
    flash: F,
    range: Range<u32>,
}

impl<F: NorFlash> FlashStore<F> {
    /// Use the configured storage pages of `flash`.
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            range: STORAGE_START..STORAGE_END,
        }
    }
}

impl<F: NorFlash> HeaderStore for FlashStore<F> {
    async fn load(&mut self) -> Result<Option<[u8; HEADER_LEN]>, Error> {
        let mut buf = [0u8; MAX_RECORD_SIZE];

        match sequential_storage::map::fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut buf,
            &KEY_CHAMBER_HEADER,
        )
        .await
        {
            Ok(Some(data)) => match <[u8; HEADER_LEN]>::try_from(data) {
                Ok(header) => {
                    debug!("Loaded chamber header {:x}", header);
                    Ok(Some(header))
                }
                Err(_) => {
                    warn!("Chamber header has wrong length: {}", data.len());
                    Err(Error::CorruptHeader)
                }
            },
            Ok(None) => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn save(&mut self, header: &[u8; HEADER_LEN]) -> Result<(), Error> {
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let item: &[u8] = header;

        sequential_storage::map::store_item::<u8, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut buf,
            &KEY_CHAMBER_HEADER,
            &item,
        )
        .await
        .map_err(storage_error)?;

        debug!("Saved chamber header {:x}", header);
        Ok(())
    }

    async fn erase(&mut self) -> Result<(), Error> {
        sequential_storage::erase_all(&mut self.flash, self.range.clone())
            .await
            .map_err(storage_error)?;

        info!("Storage region erased");
        Ok(())
    }
}
