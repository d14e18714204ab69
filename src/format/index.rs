//! Central directory parsing.

use std::io::{Read, Seek, SeekFrom};

use crate::entry::is_directory_key;
use crate::{Error, Result};

use super::{
    CENTRAL_DIRECTORY_HEADER_SIZE, CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    END_OF_CENTRAL_DIRECTORY_SIZE, MAX_COMMENT_SIZE, ZIP64_LOCATOR_SIGNATURE, ZIP64_LOCATOR_SIZE,
    decode_name, le_u16, le_u32,
};

/// One record of the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralEntry {
    /// Entry key.
    pub name: String,
    /// General purpose flags.
    pub flags: u16,
    /// Compression method.
    pub method: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Size of the data as stored.
    pub compressed_size: u64,
    /// Size of the data after decompression.
    pub uncompressed_size: u64,
    /// Offset of the entry's local header from the start of the archive.
    pub local_header_offset: u64,
}

impl CentralEntry {
    /// Returns true if this record describes a directory.
    pub fn is_directory(&self) -> bool {
        is_directory_key(&self.name)
    }
}

/// The parsed central directory of a container, in directory order.
#[derive(Debug, Clone, Default)]
pub struct ContainerIndex {
    entries: Vec<CentralEntry>,
}

impl ContainerIndex {
    /// Reads the central directory from a seekable source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if no end of central directory
    /// record is found or the directory is malformed, and
    /// [`Error::UnsupportedFeature`] for zip64 or multi-disk archives.
    pub fn read<R: Read + Seek>(source: &mut R, name: &str) -> Result<Self> {
        let (cd_offset, cd_size, total_entries) = find_end_of_directory(source, name)?;

        source.seek(SeekFrom::Start(cd_offset))?;
        let mut directory = Vec::new();
        source
            .by_ref()
            .take(cd_size)
            .read_to_end(&mut directory)?;
        if (directory.len() as u64) < cd_size {
            return Err(invalid(name, "central directory is truncated"));
        }

        let entries = parse_directory(&directory, total_entries, name)?;
        Ok(Self { entries })
    }

    /// Returns all records in directory order.
    pub fn entries(&self) -> &[CentralEntry] {
        &self.entries
    }

    /// Returns the number of records, directories included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the directory has no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the first record with the given key.
    pub fn find(&self, key: &str) -> Option<&CentralEntry> {
        self.entries.iter().find(|e| e.name == key)
    }
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidContainer {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Locates the end of central directory record.
///
/// Returns `(directory offset, directory size, entry count)`.
fn find_end_of_directory<R: Read + Seek>(source: &mut R, name: &str) -> Result<(u64, u64, usize)> {
    let file_len = source.seek(SeekFrom::End(0))?;
    if file_len < END_OF_CENTRAL_DIRECTORY_SIZE as u64 {
        return Err(invalid(name, "too small to be a zip archive"));
    }

    let tail_len = file_len.min((END_OF_CENTRAL_DIRECTORY_SIZE + MAX_COMMENT_SIZE) as u64);
    let tail_start = file_len - tail_len;
    source.seek(SeekFrom::Start(tail_start))?;
    let mut tail = vec![0u8; tail_len as usize];
    source.read_exact(&mut tail)?;

    // Scan backwards; the comment may itself contain the signature bytes,
    // so require the comment length to reach exactly the end of the file.
    let signature = END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();
    let mut pos = tail.len() - END_OF_CENTRAL_DIRECTORY_SIZE;
    let record = loop {
        if tail[pos..pos + 4] == signature {
            let comment_len = le_u16(&tail, pos + 20) as usize;
            if pos + END_OF_CENTRAL_DIRECTORY_SIZE + comment_len == tail.len() {
                break pos;
            }
        }
        if pos == 0 {
            return Err(invalid(name, "end of central directory not found"));
        }
        pos -= 1;
    };

    if record >= ZIP64_LOCATOR_SIZE
        && le_u32(&tail, record - ZIP64_LOCATOR_SIZE) == ZIP64_LOCATOR_SIGNATURE
    {
        return Err(Error::UnsupportedFeature { feature: "zip64" });
    }

    let disk = le_u16(&tail, record + 4);
    let cd_disk = le_u16(&tail, record + 6);
    let entries_on_disk = le_u16(&tail, record + 8);
    let total_entries = le_u16(&tail, record + 10);
    let cd_size = le_u32(&tail, record + 12);
    let cd_offset = le_u32(&tail, record + 16);

    if disk != 0 || cd_disk != 0 || entries_on_disk != total_entries {
        return Err(Error::UnsupportedFeature {
            feature: "multi-disk archives",
        });
    }
    if total_entries == u16::MAX || cd_size == u32::MAX || cd_offset == u32::MAX {
        return Err(Error::UnsupportedFeature { feature: "zip64" });
    }

    let record_offset = tail_start + record as u64;
    if u64::from(cd_offset) + u64::from(cd_size) > record_offset {
        return Err(invalid(name, "central directory overlaps end record"));
    }

    Ok((u64::from(cd_offset), u64::from(cd_size), total_entries as usize))
}

fn parse_directory(directory: &[u8], expected: usize, name: &str) -> Result<Vec<CentralEntry>> {
    let mut entries = Vec::with_capacity(expected);
    let mut pos = 0usize;

    while entries.len() < expected {
        if directory.len() < pos + CENTRAL_DIRECTORY_HEADER_SIZE {
            return Err(invalid(name, "central directory ends early"));
        }
        let header = &directory[pos..];
        if le_u32(header, 0) != CENTRAL_DIRECTORY_SIGNATURE {
            return Err(invalid(
                name,
                &format!("bad central directory signature at record {}", entries.len()),
            ));
        }

        let name_len = le_u16(header, 28) as usize;
        let extra_len = le_u16(header, 30) as usize;
        let comment_len = le_u16(header, 32) as usize;
        let record_len = CENTRAL_DIRECTORY_HEADER_SIZE + name_len + extra_len + comment_len;
        if header.len() < record_len {
            return Err(invalid(name, "central directory record is truncated"));
        }

        let compressed_size = le_u32(header, 20);
        let uncompressed_size = le_u32(header, 24);
        let local_header_offset = le_u32(header, 42);
        if compressed_size == u32::MAX
            || uncompressed_size == u32::MAX
            || local_header_offset == u32::MAX
        {
            return Err(Error::UnsupportedFeature { feature: "zip64" });
        }

        let raw_name =
            &header[CENTRAL_DIRECTORY_HEADER_SIZE..CENTRAL_DIRECTORY_HEADER_SIZE + name_len];
        entries.push(CentralEntry {
            name: decode_name(raw_name),
            flags: le_u16(header, 8),
            method: le_u16(header, 10),
            crc32: le_u32(header, 16),
            compressed_size: u64::from(compressed_size),
            uncompressed_size: u64::from(uncompressed_size),
            local_header_offset: u64::from(local_header_offset),
        });

        pos += record_len;
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ContainerWriter;
    use crate::write::CompressionLevel;
    use std::io::Cursor;

    fn build(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ContainerWriter::new(Vec::new());
        for (name, data) in entries {
            writer.add_entry(name, data, CompressionLevel::Default).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_read_index_in_order() {
        let bytes = build(&[("b.txt", b"bb"), ("a/", b""), ("a/C.class", b"ccc")]);
        let index = ContainerIndex::read(&mut Cursor::new(bytes), "t.jar").unwrap();

        let names: Vec<_> = index.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b.txt", "a/", "a/C.class"]);
        assert!(index.entries()[1].is_directory());
        assert_eq!(index.find("a/C.class").unwrap().uncompressed_size, 3);
        assert!(index.find("missing").is_none());
    }

    #[test]
    fn test_empty_archive() {
        let bytes = build(&[]);
        assert_eq!(bytes.len(), END_OF_CENTRAL_DIRECTORY_SIZE);
        let index = ContainerIndex::read(&mut Cursor::new(bytes), "empty.jar").unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_not_a_zip() {
        let bytes = b"this is definitely not a zip archive at all".to_vec();
        let err = ContainerIndex::read(&mut Cursor::new(bytes), "x.jar").unwrap_err();
        assert!(matches!(err, Error::InvalidContainer { .. }));
    }

    #[test]
    fn test_too_small() {
        let err = ContainerIndex::read(&mut Cursor::new(vec![0x50, 0x4b]), "x.jar").unwrap_err();
        assert!(matches!(err, Error::InvalidContainer { .. }));
    }

    #[test]
    fn test_corrupt_directory_signature() {
        let mut bytes = build(&[("a.txt", b"hello")]);
        let cd_offset = le_u32(&bytes, bytes.len() - 6) as usize;
        bytes[cd_offset] = 0;
        let err = ContainerIndex::read(&mut Cursor::new(bytes), "x.jar").unwrap_err();
        assert!(matches!(err, Error::InvalidContainer { .. }));
    }

    #[test]
    fn test_zip64_locator_rejected() {
        let mut bytes = build(&[]);
        let mut locator = Vec::new();
        locator.extend_from_slice(&ZIP64_LOCATOR_SIGNATURE.to_le_bytes());
        locator.extend_from_slice(&[0u8; ZIP64_LOCATOR_SIZE - 4]);
        bytes.splice(0..0, locator);
        let err = ContainerIndex::read(&mut Cursor::new(bytes), "x.jar").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { feature: "zip64" }));
    }
}
