//! Configuration persistence on NOR flash.
//!
//! Blob layout (little endian):
//!
//! ```text
//! 0   magic "CCFG"
//! 4   format version (u8), 3 bytes padding
//! 8   payload length (u32)
//! 12  CRC-32/ISO-HDLC of payload (u32)
//! 16  postcard-encoded Config
//! ```

use crc::{Crc, CRC_32_ISO_HDLC};
use embedded_storage::nor_flash::NorFlash;

use crate::config::{Config, ConfigError};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub const MAGIC: [u8; 4] = *b"CCFG";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 16;

/// Largest blob (header plus payload) this store reads or writes.
pub const BLOB_CAPACITY: usize = 1024;

/// Error type for persistence operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistenceError {
    /// Storage is erased; nothing was ever saved.
    Absent,
    /// Bad magic, bad length, CRC mismatch or undecodable payload.
    Corrupt,
    /// Written by a newer firmware.
    UnsupportedVersion,
    /// Decoded fine but failed validation.
    Invalid(ConfigError),
    /// Config does not fit the blob buffer.
    Encode,
    /// Flash driver error.
    Storage,
}

impl From<ConfigError> for PersistenceError {
    fn from(err: ConfigError) -> Self {
        PersistenceError::Invalid(err)
    }
}

/// Load/save contract for the persisted [`Config`].
///
/// `Ok` means success; every failure reason is an `Err` variant.
pub trait ConfigStore {
    fn load_config(&mut self) -> Result<Config, PersistenceError>;
    fn save_config(&mut self, config: &Config) -> Result<(), PersistenceError>;
}

impl<S: ConfigStore + ?Sized> ConfigStore for &mut S {
    fn load_config(&mut self) -> Result<Config, PersistenceError> {
        (**self).load_config()
    }

    fn save_config(&mut self, config: &Config) -> Result<(), PersistenceError> {
        (**self).save_config(config)
    }
}

/// Load the stored config, or fall back to the default and persist it.
///
/// A failed save is logged and otherwise ignored: the default stays in use
/// for this boot.
pub fn load_or_default<S: ConfigStore>(store: &mut S) -> Config {
    match store.load_config() {
        Ok(config) => {
            info!("config loaded");
            config
        }
        Err(e) => {
            warn!("config load failed: {:?}, using defaults", e);
            let config = Config::default();
            if let Err(e) = store.save_config(&config) {
                error!("config save failed: {:?}", e);
            }
            config
        }
    }
}

/// [`ConfigStore`] on a region of NOR flash starting at `offset`.
///
/// The region must be erase-aligned and at least [`BLOB_CAPACITY`] bytes
/// rounded up to the erase size.
pub struct FlashStore<F> {
    flash: F,
    offset: u32,
}

impl<F: NorFlash> FlashStore<F> {
    pub fn new(flash: F, offset: u32) -> Self {
        Self { flash, offset }
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    fn read(&mut self, at: usize, buf: &mut [u8]) -> Result<(), PersistenceError> {
        self.flash
            .read(self.offset + at as u32, buf)
            .map_err(|_| PersistenceError::Storage)
    }
}

fn round_up(n: usize, to: usize) -> usize {
    n.div_ceil(to) * to
}

impl<F: NorFlash> ConfigStore for FlashStore<F> {
    fn load_config(&mut self) -> Result<Config, PersistenceError> {
        let mut buf = [0u8; BLOB_CAPACITY];
        self.read(0, &mut buf[..HEADER_LEN])?;

        let magic = &buf[0..4];
        if magic == [0xFF; 4] {
            return Err(PersistenceError::Absent);
        }
        if magic != MAGIC {
            return Err(PersistenceError::Corrupt);
        }
        match buf[4] {
            FORMAT_VERSION => {}
            v if v > FORMAT_VERSION && v != 0xFF => {
                return Err(PersistenceError::UnsupportedVersion)
            }
            _ => return Err(PersistenceError::Corrupt),
        }

        let len = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;
        let crc = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
        if len == 0 || len > BLOB_CAPACITY - HEADER_LEN {
            return Err(PersistenceError::Corrupt);
        }

        let payload = &mut buf[HEADER_LEN..HEADER_LEN + len];
        self.flash
            .read(self.offset + HEADER_LEN as u32, payload)
            .map_err(|_| PersistenceError::Storage)?;
        if CRC32.checksum(payload) != crc {
            return Err(PersistenceError::Corrupt);
        }

        let config: Config =
            postcard::from_bytes(payload).map_err(|_| PersistenceError::Corrupt)?;
        config.validate()?;
        Ok(config)
    }

    fn save_config(&mut self, config: &Config) -> Result<(), PersistenceError> {
        config.validate()?;

        let mut buf = [0xFFu8; BLOB_CAPACITY];
        let len = postcard::to_slice(config, &mut buf[HEADER_LEN..])
            .map_err(|_| PersistenceError::Encode)?
            .len();
        let crc = CRC32.checksum(&buf[HEADER_LEN..HEADER_LEN + len]);

        buf[0..4].copy_from_slice(&MAGIC);
        buf[4] = FORMAT_VERSION;
        buf[5..8].fill(0);
        buf[8..12].copy_from_slice(&(len as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&crc.to_le_bytes());

        let total = HEADER_LEN + len;
        let write_len = round_up(total, F::WRITE_SIZE);
        if write_len > BLOB_CAPACITY {
            return Err(PersistenceError::Encode);
        }
        let erase_len = round_up(write_len, F::ERASE_SIZE) as u32;

        self.flash
            .erase(self.offset, self.offset + erase_len)
            .map_err(|_| PersistenceError::Storage)?;
        self.flash
            .write(self.offset, &buf[..write_len])
            .map_err(|_| PersistenceError::Storage)?;
        debug!("config saved, {} bytes", total);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    extern crate std;

    use embedded_storage::nor_flash::{
        ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
    };
    use std::vec;
    use std::vec::Vec;

    /// In-memory NOR flash: erase sets 0xFF, writes can only clear bits.
    pub struct MockFlash {
        pub mem: Vec<u8>,
        pub erases: usize,
        pub writes: usize,
        pub fail_writes: bool,
    }

    impl MockFlash {
        pub fn new(size: usize) -> Self {
            Self {
                mem: vec![0xFF; size],
                erases: 0,
                writes: 0,
                fail_writes: false,
            }
        }
    }

    impl ErrorType for MockFlash {
        type Error = NorFlashErrorKind;
    }

    impl ReadNorFlash for MockFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            let src = self
                .mem
                .get(start..start + bytes.len())
                .ok_or(NorFlashErrorKind::OutOfBounds)?;
            bytes.copy_from_slice(src);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.mem.len()
        }
    }

    impl NorFlash for MockFlash {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = 4096;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            if from as usize % Self::ERASE_SIZE != 0 || to as usize % Self::ERASE_SIZE != 0 {
                return Err(NorFlashErrorKind::NotAligned);
            }
            let range = self
                .mem
                .get_mut(from as usize..to as usize)
                .ok_or(NorFlashErrorKind::OutOfBounds)?;
            range.fill(0xFF);
            self.erases += 1;
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            if self.fail_writes {
                return Err(NorFlashErrorKind::Other);
            }
            if offset as usize % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
                return Err(NorFlashErrorKind::NotAligned);
            }
            let start = offset as usize;
            let dst = self
                .mem
                .get_mut(start..start + bytes.len())
                .ok_or(NorFlashErrorKind::OutOfBounds)?;
            for (d, s) in dst.iter_mut().zip(bytes) {
                *d &= *s;
            }
            self.writes += 1;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockFlash;
    use super::*;
    use crate::config::BackendKind;
    use crate::mode::HoldPolicy;

    const OFFSET: u32 = 4096;

    fn store() -> FlashStore<MockFlash> {
        FlashStore::new(MockFlash::new(8192), OFFSET)
    }

    #[test]
    fn test_erased_flash_is_absent() {
        assert_eq!(store().load_config(), Err(PersistenceError::Absent));
    }

    #[test]
    fn test_save_then_load() {
        let mut s = store();
        let mut config = Config::default();
        config.hold_policy = HoldPolicy::RequireHold;
        config.backends.push(BackendKind::InputViewer).unwrap();

        s.save_config(&config).unwrap();
        assert_eq!(s.load_config(), Ok(config));

        let flash = s.into_inner();
        assert_eq!(&flash.mem[OFFSET as usize..OFFSET as usize + 4], b"CCFG");
        // The region before the store offset is untouched.
        assert!(flash.mem[..OFFSET as usize].iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn test_payload_bit_flip_is_corrupt() {
        let mut s = store();
        s.save_config(&Config::default()).unwrap();
        let mut flash = s.into_inner();
        flash.mem[OFFSET as usize + HEADER_LEN + 2] ^= 0x01;
        let mut s = FlashStore::new(flash, OFFSET);
        assert_eq!(s.load_config(), Err(PersistenceError::Corrupt));
    }

    /// Write a well-formed blob around `config` without validating it.
    fn write_raw(flash: &mut MockFlash, config: &Config) {
        let mut payload = [0u8; BLOB_CAPACITY];
        let payload = postcard::to_slice(config, &mut payload).unwrap();
        let at = OFFSET as usize;
        flash.mem[at..at + 4].copy_from_slice(&MAGIC);
        flash.mem[at + 4] = FORMAT_VERSION;
        flash.mem[at + 5..at + 8].fill(0);
        flash.mem[at + 8..at + 12].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        flash.mem[at + 12..at + 16].copy_from_slice(&CRC32.checksum(payload).to_le_bytes());
        flash.mem[at + HEADER_LEN..at + HEADER_LEN + payload.len()].copy_from_slice(payload);
    }

    #[test]
    fn test_decodable_invalid_config_falls_back() {
        let mut config = Config::default();
        config.backends.clear();
        let mut flash = MockFlash::new(8192);
        write_raw(&mut flash, &config);

        let mut s = FlashStore::new(flash, OFFSET);
        assert_eq!(
            s.load_config(),
            Err(PersistenceError::Invalid(ConfigError::NoBackends))
        );

        assert_eq!(load_or_default(&mut s), Config::default());
        assert_eq!(s.load_config(), Ok(Config::default()));
        assert_eq!(s.into_inner().writes, 1);
    }

    #[test]
    fn test_bad_magic_and_newer_version() {
        let mut s = store();
        s.save_config(&Config::default()).unwrap();
        let mut flash = s.into_inner();

        flash.mem[OFFSET as usize + 4] = FORMAT_VERSION + 1;
        let mut s = FlashStore::new(flash, OFFSET);
        assert_eq!(s.load_config(), Err(PersistenceError::UnsupportedVersion));

        let mut flash = s.into_inner();
        flash.mem[OFFSET as usize] = b'X';
        let mut s = FlashStore::new(flash, OFFSET);
        assert_eq!(s.load_config(), Err(PersistenceError::Corrupt));
    }

    #[test]
    fn test_invalid_config_is_rejected_on_save() {
        let mut s = store();
        let mut config = Config::default();
        config.backends.clear();
        assert_eq!(
            s.save_config(&config),
            Err(PersistenceError::Invalid(ConfigError::NoBackends))
        );
        assert_eq!(s.into_inner().erases, 0);
    }

    #[test]
    fn test_fallback_saves_default_and_reloads() {
        let mut s = store();
        let config = load_or_default(&mut s);
        assert_eq!(config, Config::default());
        assert_eq!(s.load_config(), Ok(Config::default()));

        // Second boot loads without writing.
        let config = load_or_default(&mut s);
        assert_eq!(config, Config::default());
        assert_eq!(s.into_inner().writes, 1);
    }

    #[test]
    fn test_fallback_survives_write_failure() {
        let mut flash = MockFlash::new(8192);
        flash.fail_writes = true;
        let mut s = FlashStore::new(flash, OFFSET);
        assert_eq!(load_or_default(&mut s), Config::default());
        assert_eq!(s.save_config(&Config::default()), Err(PersistenceError::Storage));
    }
}
