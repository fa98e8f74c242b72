//! # Record Files
//!
//! Heap storage for table tuples: an append-only file of `(key, value)`
//! records addressed by [`RecordId`]. The secondary index stores record
//! ids verbatim and never interprets them; only the select path comes
//! back here to fetch tuples.
//!
//! ## File Layout
//!
//! Page 0 carries the table header (magic, version, record count). Data
//! pages hold fixed 128-byte slots, eight per page:
//!
//! ```text
//! Slot (128 bytes):
//! +----------+-------------+--------------------------+
//! | key (4)  | val_len (2) | value bytes (<= 122)     |
//! +----------+-------------+--------------------------+
//! ```
//!
//! A record id is the (page, slot) pair of the slot holding the record.
//! Records are never deleted or updated, so the record count in the
//! header fully determines which slots are live: record `n` lives at
//! page `1 + n / 8`, slot `n % 8`.

use std::path::Path;

use eyre::{ensure, Result, WrapErr};

use crate::storage::{AccessMode, PageFile, TableFileHeader, PAGE_SIZE};

pub const RECORD_SLOT_SIZE: usize = 128;
pub const RECORDS_PER_PAGE: usize = PAGE_SIZE / RECORD_SLOT_SIZE;
pub const MAX_VALUE_LEN: usize = RECORD_SLOT_SIZE - 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordId {
    pub page: u32,
    pub slot: u32,
}

impl RecordId {
    pub fn new(page: u32, slot: u32) -> Self {
        Self { page, slot }
    }

    fn from_index(index: u32) -> Self {
        Self {
            page: 1 + index / RECORDS_PER_PAGE as u32,
            slot: index % RECORDS_PER_PAGE as u32,
        }
    }

    fn to_index(self) -> Option<u32> {
        if self.page == 0 || self.slot >= RECORDS_PER_PAGE as u32 {
            return None;
        }
        let index = (self.page as u64 - 1) * RECORDS_PER_PAGE as u64 + self.slot as u64;
        u32::try_from(index).ok()
    }
}

#[derive(Debug)]
pub struct RecordFile {
    file: PageFile,
    record_count: u32,
}

impl RecordFile {
    pub fn open<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        let mut file = PageFile::open(&path, mode)?;

        if file.end_pid() == 0 {
            if mode == AccessMode::Write {
                let pid = file.allocate_page()?;
                TableFileHeader::new().write_to(file.page_mut(pid)?)?;
            }
            return Ok(Self {
                file,
                record_count: 0,
            });
        }

        let header = TableFileHeader::from_bytes(file.page(0)?)?;
        let record_count = header.record_count();

        Ok(Self { file, record_count })
    }

    pub fn append(&mut self, key: i32, value: &str) -> Result<RecordId> {
        ensure!(
            value.len() <= MAX_VALUE_LEN,
            "value too long: {} bytes (max {})",
            value.len(),
            MAX_VALUE_LEN
        );

        let rid = RecordId::from_index(self.record_count);
        if rid.page == self.file.end_pid() {
            self.file.allocate_page()?;
        }

        let offset = rid.slot as usize * RECORD_SLOT_SIZE;
        let page = self.file.page_mut(rid.page)?;
        page[offset..offset + 4].copy_from_slice(&key.to_le_bytes());
        page[offset + 4..offset + 6].copy_from_slice(&(value.len() as u16).to_le_bytes());
        page[offset + 6..offset + 6 + value.len()].copy_from_slice(value.as_bytes());

        self.record_count += 1;
        let header = TableFileHeader::from_bytes_mut(self.file.page_mut(0)?)?;
        header.set_record_count(self.record_count);

        Ok(rid)
    }

    pub fn read(&self, rid: RecordId) -> Result<(i32, String)> {
        let index = rid
            .to_index()
            .filter(|&i| i < self.record_count)
            .ok_or_else(|| eyre::eyre!("no record at ({}, {})", rid.page, rid.slot))?;
        let rid = RecordId::from_index(index);

        let offset = rid.slot as usize * RECORD_SLOT_SIZE;
        let page = self.file.page(rid.page)?;

        let mut raw = [0u8; 4];
        raw.copy_from_slice(&page[offset..offset + 4]);
        let key = i32::from_le_bytes(raw);

        let mut raw = [0u8; 2];
        raw.copy_from_slice(&page[offset + 4..offset + 6]);
        let len = u16::from_le_bytes(raw) as usize;
        ensure!(
            len <= MAX_VALUE_LEN,
            "invalid table file format: record at ({}, {}) claims {} value bytes",
            rid.page,
            rid.slot,
            len
        );

        let value = std::str::from_utf8(&page[offset + 6..offset + 6 + len])
            .wrap_err("invalid table file format: value is not UTF-8")?
            .to_owned();

        Ok((key, value))
    }

    /// The record id one past the last appended record.
    pub fn end_rid(&self) -> RecordId {
        RecordId::from_index(self.record_count)
    }

    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    pub fn scan(&self) -> RecordScan<'_> {
        RecordScan {
            file: self,
            next: 0,
        }
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync()
    }

    pub fn close(self) -> Result<()> {
        if self.file.mode() == AccessMode::Write {
            self.file.sync()?;
        }
        Ok(())
    }
}

/// Forward scan over every record in append order.
pub struct RecordScan<'a> {
    file: &'a RecordFile,
    next: u32,
}

impl Iterator for RecordScan<'_> {
    type Item = Result<(RecordId, i32, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.file.record_count {
            return None;
        }
        let rid = RecordId::from_index(self.next);
        self.next += 1;
        Some(self.file.read(rid).map(|(key, value)| (rid, key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_fresh(dir: &tempfile::TempDir) -> RecordFile {
        RecordFile::open(dir.path().join("test.tbl"), AccessMode::Write).unwrap()
    }

    #[test]
    fn append_and_read_round_trip() {
        let dir = tempdir().unwrap();
        let mut rf = open_fresh(&dir);

        let rid = rf.append(42, "hello").unwrap();

        assert_eq!(rid, RecordId::new(1, 0));
        assert_eq!(rf.read(rid).unwrap(), (42, "hello".to_string()));
    }

    #[test]
    fn records_fill_pages_in_order() {
        let dir = tempdir().unwrap();
        let mut rf = open_fresh(&dir);

        let mut rids = Vec::new();
        for i in 0..20 {
            rids.push(rf.append(i, &format!("val{}", i)).unwrap());
        }

        assert_eq!(rids[0], RecordId::new(1, 0));
        assert_eq!(rids[7], RecordId::new(1, 7));
        assert_eq!(rids[8], RecordId::new(2, 0));
        assert_eq!(rids[19], RecordId::new(3, 3));

        for (i, rid) in rids.iter().enumerate() {
            let (key, value) = rf.read(*rid).unwrap();
            assert_eq!(key, i as i32);
            assert_eq!(value, format!("val{}", i));
        }
    }

    #[test]
    fn read_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut rf = open_fresh(&dir);
        rf.append(1, "only").unwrap();

        let result = rf.read(RecordId::new(1, 1));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no record"));
    }

    #[test]
    fn oversized_value_is_rejected() {
        let dir = tempdir().unwrap();
        let mut rf = open_fresh(&dir);

        let value = "x".repeat(MAX_VALUE_LEN + 1);
        assert!(rf.append(1, &value).is_err());

        let value = "x".repeat(MAX_VALUE_LEN);
        assert!(rf.append(1, &value).is_ok());
    }

    #[test]
    fn scan_yields_append_order() {
        let dir = tempdir().unwrap();
        let mut rf = open_fresh(&dir);

        for i in [5, 3, 9] {
            rf.append(i, &format!("v{}", i)).unwrap();
        }

        let keys: Vec<i32> = rf.scan().map(|r| r.unwrap().1).collect();
        assert_eq!(keys, vec![5, 3, 9]);
    }

    #[test]
    fn count_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.tbl");

        {
            let mut rf = RecordFile::open(&path, AccessMode::Write).unwrap();
            for i in 0..10 {
                rf.append(i, "v").unwrap();
            }
            rf.close().unwrap();
        }

        let rf = RecordFile::open(&path, AccessMode::Read).unwrap();
        assert_eq!(rf.record_count(), 10);
        assert_eq!(rf.end_rid(), RecordId::new(2, 2));
        assert_eq!(rf.read(RecordId::new(1, 3)).unwrap().0, 3);
    }

    #[test]
    fn empty_value_round_trips() {
        let dir = tempdir().unwrap();
        let mut rf = open_fresh(&dir);

        let rid = rf.append(7, "").unwrap();
        assert_eq!(rf.read(rid).unwrap(), (7, String::new()));
    }
}
