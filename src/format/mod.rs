//! Zip container format constants and low-level codec.
//!
//! Jar files are zip archives. This module implements the part of the zip
//! format jars use: a central directory of named entries, each stored or
//! compressed with raw DEFLATE. Zip64 extensions, encryption and multi-disk
//! archives are rejected with [`Error::UnsupportedFeature`].
//!
//! [`Error::UnsupportedFeature`]: crate::Error::UnsupportedFeature

pub mod entry_data;
pub mod index;
pub mod writer;

pub use entry_data::RawEntry;
pub use index::{CentralEntry, ContainerIndex};
pub use writer::ContainerWriter;

/// Local file header signature (`PK\x03\x04`).
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Central directory file header signature (`PK\x01\x02`).
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;

/// End of central directory record signature (`PK\x05\x06`).
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// Zip64 end of central directory locator signature (`PK\x06\x07`).
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;

/// Fixed size of a local file header, without name and extra field.
pub const LOCAL_FILE_HEADER_SIZE: usize = 30;

/// Fixed size of a central directory header, without variable fields.
pub const CENTRAL_DIRECTORY_HEADER_SIZE: usize = 46;

/// Fixed size of the end of central directory record, without comment.
pub const END_OF_CENTRAL_DIRECTORY_SIZE: usize = 22;

/// Size of the zip64 end of central directory locator.
pub const ZIP64_LOCATOR_SIZE: usize = 20;

/// Largest archive comment, which bounds the end-of-archive search.
pub const MAX_COMMENT_SIZE: usize = u16::MAX as usize;

/// Compression method identifiers.
pub mod method {
    /// No compression.
    pub const STORED: u16 = 0;
    /// Raw DEFLATE.
    pub const DEFLATED: u16 = 8;
}

/// General purpose bit flags.
pub mod flags {
    /// Entry data is encrypted.
    pub const ENCRYPTED: u16 = 0x0001;
    /// Sizes and CRC follow the data in a data descriptor.
    pub const DATA_DESCRIPTOR: u16 = 0x0008;
    /// Entry name is UTF-8.
    pub const UTF8: u16 = 0x0800;
}

/// Version needed to extract stored entries (1.0).
pub const VERSION_STORED: u16 = 10;

/// Version needed to extract deflated entries (2.0).
pub const VERSION_DEFLATED: u16 = 20;

/// DOS date for 1980-01-01, the earliest representable date.
///
/// Written entries carry this date and a zero time so identical store
/// content always produces identical bytes.
pub const DOS_EPOCH_DATE: u16 = (1 << 5) | 1;

/// Reads a little-endian `u16` at `offset`.
pub(crate) fn le_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// Reads a little-endian `u32` at `offset`.
pub(crate) fn le_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Decodes an entry name.
///
/// Names flagged UTF-8 and plain ASCII names decode exactly. Other bytes are
/// decoded lossily, which keeps keys usable as map keys.
pub(crate) fn decode_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
