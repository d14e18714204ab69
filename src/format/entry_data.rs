//! Reading and decoding entry data.
//!
//! Reading an entry is split in two steps so containers can be read with
//! sequential I/O and parallel decompression: [`RawEntry::read`] copies the
//! stored bytes out of the source, [`RawEntry::decode`] inflates and verifies
//! them and needs no access to the source.

use std::io::{Read, Seek, SeekFrom};

use flate2::read::DeflateDecoder;

use crate::{Error, Result};

use super::{
    CentralEntry, LOCAL_FILE_HEADER_SIGNATURE, LOCAL_FILE_HEADER_SIZE, flags, le_u16, le_u32,
    method,
};

/// The stored bytes of one entry, not yet decompressed.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Position of the record in the central directory.
    pub index: usize,
    /// The central directory record.
    pub header: CentralEntry,
    /// Data exactly as stored in the container.
    pub stored: Vec<u8>,
}

impl RawEntry {
    /// Copies the stored data of `header` out of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceLimitExceeded`] if the declared uncompressed
    /// size exceeds `max_size`, [`Error::UnsupportedFeature`] for encrypted
    /// entries, and I/O or format errors if the local header is damaged.
    pub fn read<R: Read + Seek>(
        source: &mut R,
        index: usize,
        header: &CentralEntry,
        max_size: u64,
    ) -> Result<Self> {
        if header.flags & flags::ENCRYPTED != 0 {
            return Err(Error::UnsupportedFeature {
                feature: "encrypted entries",
            });
        }
        if header.uncompressed_size > max_size {
            return Err(Error::ResourceLimitExceeded(format!(
                "entry '{}' is {} bytes, limit is {}",
                header.name, header.uncompressed_size, max_size
            )));
        }

        source.seek(SeekFrom::Start(header.local_header_offset))?;
        let mut local = [0u8; LOCAL_FILE_HEADER_SIZE];
        source.read_exact(&mut local)?;
        if le_u32(&local, 0) != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(Error::EntryRead {
                container: String::new(),
                entry: header.name.clone(),
                reason: format!(
                    "bad local header signature at offset {:#x}",
                    header.local_header_offset
                ),
            });
        }

        // Name and extra field lengths may differ from the central record.
        let name_len = le_u16(&local, 26) as i64;
        let extra_len = le_u16(&local, 28) as i64;
        source.seek(SeekFrom::Current(name_len + extra_len))?;

        let mut stored = Vec::new();
        source
            .by_ref()
            .take(header.compressed_size)
            .read_to_end(&mut stored)?;
        if (stored.len() as u64) < header.compressed_size {
            return Err(Error::EntryRead {
                container: String::new(),
                entry: header.name.clone(),
                reason: format!(
                    "data truncated: expected {} bytes, found {}",
                    header.compressed_size,
                    stored.len()
                ),
            });
        }

        Ok(Self {
            index,
            header: header.clone(),
            stored,
        })
    }

    /// Returns the entry key.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Decompresses the stored data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedMethod`] for methods other than stored
    /// and deflate, [`Error::CrcMismatch`] if `verify_crc` is set and the
    /// checksum differs, and [`Error::EntryRead`] for corrupt streams or size
    /// mismatches.
    pub fn decode(&self, verify_crc: bool) -> Result<Vec<u8>> {
        let expected_size = self.header.uncompressed_size;
        let data = match self.header.method {
            method::STORED => self.stored.clone(),
            method::DEFLATED => {
                let mut out = Vec::with_capacity(expected_size.min(1 << 20) as usize);
                // One extra byte detects streams longer than declared.
                DeflateDecoder::new(self.stored.as_slice())
                    .take(expected_size + 1)
                    .read_to_end(&mut out)
                    .map_err(|e| self.corrupt(format!("deflate stream: {e}")))?;
                out
            }
            other => {
                return Err(Error::UnsupportedMethod {
                    entry: self.header.name.clone(),
                    method: other,
                });
            }
        };

        if data.len() as u64 != expected_size {
            return Err(self.corrupt(format!(
                "size mismatch: expected {} bytes, got {}",
                expected_size,
                data.len()
            )));
        }

        if verify_crc {
            let actual = crc32fast::hash(&data);
            if actual != self.header.crc32 {
                return Err(Error::CrcMismatch {
                    entry: self.header.name.clone(),
                    expected: self.header.crc32,
                    actual,
                });
            }
        }

        Ok(data)
    }

    fn corrupt(&self, reason: String) -> Error {
        Error::EntryRead {
            container: String::new(),
            entry: self.header.name.clone(),
            reason,
        }
    }
}
