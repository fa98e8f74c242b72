//! # File Header Definitions
//!
//! Zerocopy header structs occupying the start of page 0 in each rookdb
//! file type.
//!
//! ## Index File Header (9 bytes)
//!
//! ```text
//! Offset  Size  Field        Description
//! ------  ----  -----------  ---------------------------------------
//! 0       4     root_pid     Root page id, -1 when the tree is empty
//! 4       1     (pad)        Unused byte, part of the file format
//! 5       4     tree_height  Levels from root to leaf inclusive, 0 when empty
//! ```
//!
//! The pad byte between the two fields is load-bearing: `tree_height`
//! sits at offset 5, and readers of existing index files depend on that.
//!
//! ## Table File Header (16 bytes)
//!
//! ```text
//! Offset  Size  Field         Description
//! ------  ----  ------------  --------------------------------
//! 0       8     magic         "rookdtbl"
//! 8       2     version       Format version, currently 1
//! 10      2     (reserved)
//! 12      4     record_count  Number of records in the file
//! ```
//!
//! All multi-byte fields are little-endian; the zerocopy wrapper types
//! handle conversion and make the structs safe to overlay on unaligned
//! page bytes.

use eyre::{ensure, Result};
use zerocopy::little_endian::{I32, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const INDEX_HEADER_SIZE: usize = 9;
pub const TABLE_HEADER_SIZE: usize = 16;

pub const TABLE_MAGIC: &[u8; 8] = b"rookdtbl";
pub const CURRENT_VERSION: u16 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct IndexFileHeader {
    root_pid: I32,
    pad: u8,
    tree_height: I32,
}

const _: () = assert!(std::mem::size_of::<IndexFileHeader>() == INDEX_HEADER_SIZE);

impl IndexFileHeader {
    pub fn new(root_pid: i32, tree_height: i32) -> Self {
        Self {
            root_pid: I32::new(root_pid),
            pad: 0,
            tree_height: I32::new(tree_height),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= INDEX_HEADER_SIZE,
            "invalid index file format: header truncated ({} < {} bytes)",
            bytes.len(),
            INDEX_HEADER_SIZE
        );
        Self::ref_from_bytes(&bytes[..INDEX_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse IndexFileHeader: {:?}", e))
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= INDEX_HEADER_SIZE,
            "invalid index file format: header truncated ({} < {} bytes)",
            bytes.len(),
            INDEX_HEADER_SIZE
        );
        Self::mut_from_bytes(&mut bytes[..INDEX_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse IndexFileHeader: {:?}", e))
    }

    pub fn write_to(&self, bytes: &mut [u8]) -> Result<()> {
        ensure!(
            bytes.len() >= INDEX_HEADER_SIZE,
            "buffer too small for IndexFileHeader: {} < {}",
            bytes.len(),
            INDEX_HEADER_SIZE
        );
        bytes[..INDEX_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn root_pid(&self) -> i32 {
        self.root_pid.get()
    }

    pub fn set_root_pid(&mut self, pid: i32) {
        self.root_pid = I32::new(pid);
    }

    pub fn tree_height(&self) -> i32 {
        self.tree_height.get()
    }

    pub fn set_tree_height(&mut self, height: i32) {
        self.tree_height = I32::new(height);
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TableFileHeader {
    magic: [u8; 8],
    version: U16,
    reserved: [u8; 2],
    record_count: U32,
}

const _: () = assert!(std::mem::size_of::<TableFileHeader>() == TABLE_HEADER_SIZE);

impl TableFileHeader {
    pub fn new() -> Self {
        Self {
            magic: *TABLE_MAGIC,
            version: U16::new(CURRENT_VERSION),
            reserved: [0; 2],
            record_count: U32::new(0),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= TABLE_HEADER_SIZE,
            "invalid table file format: header truncated ({} < {} bytes)",
            bytes.len(),
            TABLE_HEADER_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..TABLE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse TableFileHeader: {:?}", e))?;

        ensure!(
            &header.magic == TABLE_MAGIC,
            "invalid table file format: bad magic bytes"
        );
        ensure!(
            header.version.get() == CURRENT_VERSION,
            "invalid table file format: unsupported version {} (expected {})",
            header.version.get(),
            CURRENT_VERSION
        );

        Ok(header)
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= TABLE_HEADER_SIZE,
            "invalid table file format: header truncated ({} < {} bytes)",
            bytes.len(),
            TABLE_HEADER_SIZE
        );
        Self::mut_from_bytes(&mut bytes[..TABLE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse TableFileHeader: {:?}", e))
    }

    pub fn write_to(&self, bytes: &mut [u8]) -> Result<()> {
        ensure!(
            bytes.len() >= TABLE_HEADER_SIZE,
            "buffer too small for TableFileHeader: {} < {}",
            bytes.len(),
            TABLE_HEADER_SIZE
        );
        bytes[..TABLE_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn record_count(&self) -> u32 {
        self.record_count.get()
    }

    pub fn set_record_count(&mut self, count: u32) {
        self.record_count = U32::new(count);
    }
}

impl Default for TableFileHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_header_is_9_bytes_with_height_at_offset_5() {
        let header = IndexFileHeader::new(7, 3);
        let mut buf = [0u8; 16];
        header.write_to(&mut buf).unwrap();

        assert_eq!(&buf[..4], &7i32.to_le_bytes());
        assert_eq!(buf[4], 0);
        assert_eq!(&buf[5..9], &3i32.to_le_bytes());
    }

    #[test]
    fn index_header_empty_tree_sentinel() {
        let header = IndexFileHeader::new(-1, 0);
        let mut buf = [0u8; 16];
        header.write_to(&mut buf).unwrap();

        let parsed = IndexFileHeader::from_bytes(&buf).unwrap();
        assert_eq!(parsed.root_pid(), -1);
        assert_eq!(parsed.tree_height(), 0);
    }

    #[test]
    fn index_header_mutation_in_place() {
        let mut buf = [0u8; 16];
        IndexFileHeader::new(-1, 0).write_to(&mut buf).unwrap();

        {
            let header = IndexFileHeader::from_bytes_mut(&mut buf).unwrap();
            header.set_root_pid(42);
            header.set_tree_height(2);
        }

        let parsed = IndexFileHeader::from_bytes(&buf).unwrap();
        assert_eq!(parsed.root_pid(), 42);
        assert_eq!(parsed.tree_height(), 2);
    }

    #[test]
    fn table_header_round_trip() {
        let mut buf = [0u8; 32];
        TableFileHeader::new().write_to(&mut buf).unwrap();

        {
            let header = TableFileHeader::from_bytes_mut(&mut buf).unwrap();
            header.set_record_count(123);
        }

        let parsed = TableFileHeader::from_bytes(&buf).unwrap();
        assert_eq!(parsed.record_count(), 123);
    }

    #[test]
    fn table_header_rejects_bad_magic() {
        let buf = [0u8; 32];
        let result = TableFileHeader::from_bytes(&buf);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("magic"));
    }
}
