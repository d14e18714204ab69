//! Zip container writer.

use std::io::{self, Write};

use flate2::Compression;
use flate2::write::DeflateEncoder;

use crate::write::CompressionLevel;
use crate::{Error, Result};

use super::{
    CENTRAL_DIRECTORY_SIGNATURE, DOS_EPOCH_DATE, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    LOCAL_FILE_HEADER_SIGNATURE, VERSION_DEFLATED, VERSION_STORED, flags, method,
};

/// Central directory information kept for each written entry.
#[derive(Debug, Clone)]
struct WrittenEntry {
    name: String,
    flags: u16,
    method: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    local_header_offset: u32,
}

impl WrittenEntry {
    fn version_needed(&self) -> u16 {
        if self.method == method::DEFLATED {
            VERSION_DEFLATED
        } else {
            VERSION_STORED
        }
    }
}

/// Writes entries into a zip container.
///
/// Entries are written in the order they are added; the writer does not
/// check for duplicate names. Only a `Write` sink is needed: each entry is
/// compressed in memory first, so sizes and CRC go directly into the local
/// header.
///
/// # Example
///
/// ```rust
/// use jarkit::format::ContainerWriter;
/// use jarkit::CompressionLevel;
///
/// let mut writer = ContainerWriter::new(Vec::new());
/// writer.add_entry("com/A.class", &[0xCA, 0xFE, 0xBA, 0xBE], CompressionLevel::Default)?;
/// writer.add_entry("readme.txt", b"hello", CompressionLevel::Store)?;
/// let bytes = writer.finish()?;
/// assert_eq!(&bytes[..2], b"PK");
/// # Ok::<(), jarkit::Error>(())
/// ```
pub struct ContainerWriter<W: Write> {
    inner: W,
    offset: u64,
    entries: Vec<WrittenEntry>,
}

impl<W: Write> std::fmt::Debug for ContainerWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerWriter")
            .field("offset", &self.offset)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<W: Write> ContainerWriter<W> {
    /// Creates a writer that emits a container into `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            offset: 0,
            entries: Vec::new(),
        }
    }

    /// Returns the number of entries written so far.
    pub fn entries_written(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.offset
    }

    /// Compresses and writes one entry.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sink fails and
    /// [`Error::UnsupportedFeature`] if the entry or archive would need zip64.
    pub fn add_entry(&mut self, name: &str, data: &[u8], level: CompressionLevel) -> Result<()> {
        let uncompressed_size = to_u32(data.len() as u64)?;
        let crc32 = crc32fast::hash(data);

        let (entry_method, compressed) = match level.deflate_level() {
            None => (method::STORED, None),
            Some(deflate_level) => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(deflate_level));
                encoder.write_all(data)?;
                (method::DEFLATED, Some(encoder.finish()?))
            }
        };
        let payload = compressed.as_deref().unwrap_or(data);

        let entry = WrittenEntry {
            name: name.to_string(),
            flags: name_flags(name),
            method: entry_method,
            crc32,
            compressed_size: to_u32(payload.len() as u64)?,
            uncompressed_size,
            local_header_offset: to_u32(self.offset)?,
        };

        let mut header = Vec::with_capacity(30 + name.len());
        header.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        header.extend_from_slice(&entry.version_needed().to_le_bytes());
        header.extend_from_slice(&entry.flags.to_le_bytes());
        header.extend_from_slice(&entry.method.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes());
        header.extend_from_slice(&DOS_EPOCH_DATE.to_le_bytes());
        header.extend_from_slice(&entry.crc32.to_le_bytes());
        header.extend_from_slice(&entry.compressed_size.to_le_bytes());
        header.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
        header.extend_from_slice(&to_u16(name.len())?.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes());
        header.extend_from_slice(name.as_bytes());

        self.write(&header)?;
        self.write(payload)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Writes a directory record.
    ///
    /// A trailing `/` is appended to `name` if missing.
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        if name.ends_with('/') {
            self.add_entry(name, &[], CompressionLevel::Store)
        } else {
            self.add_entry(&format!("{name}/"), &[], CompressionLevel::Store)
        }
    }

    /// Writes the central directory and returns the inner sink.
    pub fn finish(mut self) -> Result<W> {
        if self.entries.len() >= u16::MAX as usize {
            return Err(Error::UnsupportedFeature { feature: "zip64" });
        }

        let cd_offset = to_u32(self.offset)?;
        let entries = std::mem::take(&mut self.entries);
        for entry in &entries {
            let mut record = Vec::with_capacity(46 + entry.name.len());
            record.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
            record.extend_from_slice(&VERSION_DEFLATED.to_le_bytes());
            record.extend_from_slice(&entry.version_needed().to_le_bytes());
            record.extend_from_slice(&entry.flags.to_le_bytes());
            record.extend_from_slice(&entry.method.to_le_bytes());
            record.extend_from_slice(&0u16.to_le_bytes());
            record.extend_from_slice(&DOS_EPOCH_DATE.to_le_bytes());
            record.extend_from_slice(&entry.crc32.to_le_bytes());
            record.extend_from_slice(&entry.compressed_size.to_le_bytes());
            record.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            record.extend_from_slice(&to_u16(entry.name.len())?.to_le_bytes());
            // extra field length, comment length, disk number, internal attributes
            record.extend_from_slice(&[0u8; 8]);
            record.extend_from_slice(&0u32.to_le_bytes());
            record.extend_from_slice(&entry.local_header_offset.to_le_bytes());
            record.extend_from_slice(entry.name.as_bytes());
            self.write(&record)?;
        }
        let cd_size = to_u32(self.offset - u64::from(cd_offset))?;

        let count = (entries.len() as u16).to_le_bytes();
        let mut end = Vec::with_capacity(22);
        end.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        end.extend_from_slice(&[0u8; 4]);
        end.extend_from_slice(&count);
        end.extend_from_slice(&count);
        end.extend_from_slice(&cd_size.to_le_bytes());
        end.extend_from_slice(&cd_offset.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes());
        self.write(&end)?;

        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)?;
        self.offset += buf.len() as u64;
        Ok(())
    }
}

fn name_flags(name: &str) -> u16 {
    if name.is_ascii() { 0 } else { flags::UTF8 }
}

fn to_u32(value: u64) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v != u32::MAX)
        .ok_or(Error::UnsupportedFeature { feature: "zip64" })
}

fn to_u16(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::UnsupportedFeature {
        feature: "entry names longer than 65535 bytes",
    })
}
