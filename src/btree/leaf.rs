//! # B+Tree Leaf Nodes
//!
//! Leaf nodes hold the index's actual `(key, record id)` entries in
//! ascending key order and are chained together through a next-leaf
//! pointer for range scans.
//!
//! ## Page Layout (1024 bytes)
//!
//! ```text
//! Offset 0          count (4 bytes, little-endian)
//! Offset 4          entries, 12 bytes each:
//!                     key (4) | record page (4) | record slot (4)
//! ...               unused padding
//! Offset 1020       next-leaf page id (4 bytes, -1 for the last leaf)
//! +-------+---------------------------------------+---------+------+
//! | count | entry 0 | entry 1 | ...               | padding | next |
//! +-------+---------------------------------------+---------+------+
//! ```
//!
//! The next pointer is pinned at the page tail so the entry region can
//! grow without relocating it. With 12-byte entries, 84 of them fit
//! alongside the count and the next pointer.
//!
//! ## Search
//!
//! `find_key` scans for the first entry whose key is greater than or
//! equal to the search key and reports whether that entry is an exact
//! match. Duplicate keys are permitted; an equal key always resolves to
//! the first matching entry, and inserting a duplicate places it at that
//! same position, shifting existing equals right.
//!
//! ## Splitting
//!
//! `insert_and_split` is only called on a full node with an empty
//! sibling. The merged 85-entry sequence is cut at entry 43: the left
//! node keeps the first 43 entries, the sibling takes the rest, and the
//! sibling's first key is returned for the caller to post in the parent.
//! The caller allocates the sibling's page and rewires the chain.
//!
//! ## Access Pattern
//!
//! `LeafNode` borrows a page immutably and `LeafNodeMut` mutably; both
//! operate directly on page bytes with zerocopy entry views, so nothing
//! is deserialized up front.

use eyre::{ensure, Result};
use zerocopy::little_endian::{I32, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::records::RecordId;
use crate::storage::PAGE_SIZE;

use super::{MAX_KEYS, NO_PAGE};

pub const LEAF_ENTRY_SIZE: usize = 12;
pub const LEAF_ENTRY_START: usize = 4;
const NEXT_LEAF_OFFSET: usize = PAGE_SIZE - 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct LeafEntry {
    key: I32,
    page: U32,
    slot: U32,
}

const _: () = assert!(std::mem::size_of::<LeafEntry>() == LEAF_ENTRY_SIZE);

impl LeafEntry {
    pub fn new(key: i32, rid: RecordId) -> Self {
        Self {
            key: I32::new(key),
            page: U32::new(rid.page),
            slot: U32::new(rid.slot),
        }
    }

    pub fn key(&self) -> i32 {
        self.key.get()
    }

    pub fn rid(&self) -> RecordId {
        RecordId {
            page: self.page.get(),
            slot: self.slot.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    Found(usize),
    NotFound(usize),
}

impl SearchResult {
    /// The entry index regardless of whether the key matched.
    pub fn index(self) -> usize {
        match self {
            SearchResult::Found(i) | SearchResult::NotFound(i) => i,
        }
    }
}

fn read_count(data: &[u8]) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[..4]);
    i32::from_le_bytes(raw)
}

fn validate_page(data: &[u8]) -> Result<()> {
    ensure!(
        data.len() == PAGE_SIZE,
        "invalid page size: {} != {}",
        data.len(),
        PAGE_SIZE
    );
    let count = read_count(data);
    ensure!(
        (0..=MAX_KEYS as i32).contains(&count),
        "invalid leaf page: entry count {} out of range",
        count
    );
    Ok(())
}

fn entry_offset(eid: usize) -> usize {
    LEAF_ENTRY_START + eid * LEAF_ENTRY_SIZE
}

#[derive(Debug)]
pub struct LeafNode<'a> {
    data: &'a [u8],
}

pub struct LeafNodeMut<'a> {
    data: &'a mut [u8],
}

impl<'a> LeafNode<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        validate_page(data)?;
        Ok(Self { data })
    }

    pub fn entry_count(&self) -> usize {
        read_count(self.data) as usize
    }

    pub fn entry_at(&self, eid: usize) -> Result<&'a LeafEntry> {
        ensure!(
            eid < self.entry_count(),
            "entry {} out of bounds (count={})",
            eid,
            self.entry_count()
        );
        let offset = entry_offset(eid);
        LeafEntry::ref_from_bytes(&self.data[offset..offset + LEAF_ENTRY_SIZE])
            .map_err(|e| eyre::eyre!("failed to read leaf entry {}: {:?}", eid, e))
    }

    /// First entry whose key is >= the search key; `Found` on an exact
    /// match, `NotFound(count)` when every key is smaller.
    pub fn find_key(&self, key: i32) -> SearchResult {
        let count = self.entry_count();
        for eid in 0..count {
            let entry_key = match self.entry_at(eid) {
                Ok(entry) => entry.key(),
                Err(_) => return SearchResult::NotFound(eid),
            };
            if entry_key >= key {
                return if entry_key == key {
                    SearchResult::Found(eid)
                } else {
                    SearchResult::NotFound(eid)
                };
            }
        }
        SearchResult::NotFound(count)
    }

    pub fn next_leaf(&self) -> Option<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.data[NEXT_LEAF_OFFSET..NEXT_LEAF_OFFSET + 4]);
        let pid = i32::from_le_bytes(raw);
        (pid >= 0).then_some(pid as u32)
    }
}

impl<'a> LeafNodeMut<'a> {
    pub fn from_page(data: &'a mut [u8]) -> Result<Self> {
        validate_page(data)?;
        Ok(Self { data })
    }

    /// Initializes an empty leaf: zero entries, no successor.
    pub fn init(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        data[..4].copy_from_slice(&0i32.to_le_bytes());
        data[NEXT_LEAF_OFFSET..].copy_from_slice(&NO_PAGE.to_le_bytes());
        Ok(Self { data })
    }

    pub fn as_ref(&self) -> LeafNode<'_> {
        LeafNode { data: self.data }
    }

    pub fn entry_count(&self) -> usize {
        read_count(self.data) as usize
    }

    pub fn is_full(&self) -> bool {
        self.entry_count() == MAX_KEYS
    }

    fn set_entry_count(&mut self, count: usize) {
        self.data[..4].copy_from_slice(&(count as i32).to_le_bytes());
    }

    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        let count = self.entry_count();
        ensure!(count < MAX_KEYS, "leaf node is full");

        let pos = self.as_ref().find_key(key).index();
        let start = entry_offset(pos);
        let end = entry_offset(count);
        self.data.copy_within(start..end, start + LEAF_ENTRY_SIZE);

        let entry = LeafEntry::new(key, rid);
        self.data[start..start + LEAF_ENTRY_SIZE].copy_from_slice(entry.as_bytes());
        self.set_entry_count(count + 1);

        Ok(())
    }

    /// Splits a full node, inserting the new entry on the appropriate
    /// side. The left node keeps the first `(count + 2) / 2` entries of
    /// the merged sequence; the sibling's first key is returned so the
    /// caller can post it in the parent. The caller is responsible for
    /// allocating the sibling's page and wiring the next-leaf chain.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        rid: RecordId,
        sibling: &mut LeafNodeMut<'_>,
    ) -> Result<i32> {
        let count = self.entry_count();
        ensure!(count == MAX_KEYS, "split requires a full node");
        ensure!(sibling.entry_count() == 0, "split sibling must be empty");

        let pos = self.as_ref().find_key(key).index();
        let left_size = (count + 2) / 2;

        // Entries past the boundary move right, in ascending order, then
        // the new entry lands on whichever side owns its position.
        let boundary = if pos < left_size {
            left_size - 1
        } else {
            left_size
        };
        for eid in boundary..count {
            let entry = *self.as_ref().entry_at(eid)?;
            sibling.insert(entry.key(), entry.rid())?;
        }
        self.set_entry_count(boundary);

        if pos < left_size {
            self.insert(key, rid)?;
        } else {
            sibling.insert(key, rid)?;
        }

        Ok(sibling.as_ref().entry_at(0)?.key())
    }

    pub fn next_leaf(&self) -> Option<u32> {
        self.as_ref().next_leaf()
    }

    pub fn set_next_leaf(&mut self, pid: Option<u32>) {
        let raw = pid.map(|p| p as i32).unwrap_or(NO_PAGE);
        self.data[NEXT_LEAF_OFFSET..].copy_from_slice(&raw.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_page() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    fn rid(n: u32) -> RecordId {
        RecordId::new(n, 0)
    }

    #[test]
    fn leaf_entry_is_12_bytes() {
        assert_eq!(std::mem::size_of::<LeafEntry>(), 12);
    }

    #[test]
    fn init_sets_empty_node_with_no_successor() {
        let mut page = make_page();
        let node = LeafNodeMut::init(&mut page).unwrap();

        assert_eq!(node.entry_count(), 0);
        assert_eq!(node.next_leaf(), None);
        assert_eq!(&page[PAGE_SIZE - 4..], &(-1i32).to_le_bytes());
    }

    #[test]
    fn entry_layout_is_little_endian_at_offset_4() {
        let mut page = make_page();
        let mut node = LeafNodeMut::init(&mut page).unwrap();

        node.insert(0x01020304, RecordId::new(7, 9)).unwrap();

        assert_eq!(&page[..4], &1i32.to_le_bytes());
        assert_eq!(&page[4..8], &0x01020304i32.to_le_bytes());
        assert_eq!(&page[8..12], &7u32.to_le_bytes());
        assert_eq!(&page[12..16], &9u32.to_le_bytes());
    }

    #[test]
    fn insert_keeps_keys_sorted() {
        let mut page = make_page();
        let mut node = LeafNodeMut::init(&mut page).unwrap();

        node.insert(30, rid(3)).unwrap();
        node.insert(10, rid(1)).unwrap();
        node.insert(20, rid(2)).unwrap();

        let node = LeafNode::from_page(&page).unwrap();
        assert_eq!(node.entry_count(), 3);
        assert_eq!(node.entry_at(0).unwrap().key(), 10);
        assert_eq!(node.entry_at(1).unwrap().key(), 20);
        assert_eq!(node.entry_at(2).unwrap().key(), 30);
        assert_eq!(node.entry_at(1).unwrap().rid(), rid(2));
    }

    #[test]
    fn find_key_returns_first_at_least() {
        let mut page = make_page();
        let mut node = LeafNodeMut::init(&mut page).unwrap();
        for key in [10, 20, 30] {
            node.insert(key, rid(key as u32)).unwrap();
        }

        let node = LeafNode::from_page(&page).unwrap();
        assert_eq!(node.find_key(10), SearchResult::Found(0));
        assert_eq!(node.find_key(15), SearchResult::NotFound(1));
        assert_eq!(node.find_key(30), SearchResult::Found(2));
        assert_eq!(node.find_key(31), SearchResult::NotFound(3));
        assert_eq!(node.find_key(5), SearchResult::NotFound(0));
    }

    #[test]
    fn duplicate_insert_lands_before_existing_equal() {
        let mut page = make_page();
        let mut node = LeafNodeMut::init(&mut page).unwrap();

        node.insert(7, rid(1)).unwrap();
        node.insert(7, rid(2)).unwrap();
        node.insert(7, rid(3)).unwrap();

        let node = LeafNode::from_page(&page).unwrap();
        assert_eq!(node.find_key(7), SearchResult::Found(0));
        assert_eq!(node.entry_at(0).unwrap().rid(), rid(3));
        assert_eq!(node.entry_at(1).unwrap().rid(), rid(2));
        assert_eq!(node.entry_at(2).unwrap().rid(), rid(1));
    }

    #[test]
    fn insert_into_full_node_fails() {
        let mut page = make_page();
        let mut node = LeafNodeMut::init(&mut page).unwrap();
        for key in 0..MAX_KEYS as i32 {
            node.insert(key, rid(key as u32)).unwrap();
        }

        assert!(node.is_full());
        let result = node.insert(999, rid(999));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("full"));
    }

    #[test]
    fn split_with_new_key_on_right() {
        let mut page = make_page();
        let mut node = LeafNodeMut::init(&mut page).unwrap();
        for key in 1..=MAX_KEYS as i32 {
            node.insert(key, rid(key as u32)).unwrap();
        }

        let mut sibling_page = make_page();
        let mut sibling = LeafNodeMut::init(&mut sibling_page).unwrap();
        let sibling_key = node.insert_and_split(85, rid(85), &mut sibling).unwrap();

        // merged sequence 1..=85 cut at entry 43
        assert_eq!(node.entry_count(), 43);
        assert_eq!(sibling.entry_count(), 42);
        assert_eq!(sibling_key, 44);
        assert_eq!(node.as_ref().entry_at(42).unwrap().key(), 43);
        assert_eq!(sibling.as_ref().entry_at(0).unwrap().key(), 44);
        assert_eq!(sibling.as_ref().entry_at(41).unwrap().key(), 85);
    }

    #[test]
    fn split_with_new_key_on_left() {
        let mut page = make_page();
        let mut node = LeafNodeMut::init(&mut page).unwrap();
        for key in 1..=MAX_KEYS as i32 {
            node.insert(key * 2, rid(key as u32)).unwrap();
        }

        let mut sibling_page = make_page();
        let mut sibling = LeafNodeMut::init(&mut sibling_page).unwrap();
        let sibling_key = node.insert_and_split(3, rid(0), &mut sibling).unwrap();

        assert_eq!(node.entry_count(), 43);
        assert_eq!(sibling.entry_count(), 42);
        // left keeps the first 43 of the merged sequence 2,3,4,6,...,168
        assert_eq!(node.as_ref().entry_at(0).unwrap().key(), 2);
        assert_eq!(node.as_ref().entry_at(1).unwrap().key(), 3);
        assert_eq!(sibling_key, sibling.as_ref().entry_at(0).unwrap().key());

        // every key accounted for, in order
        let mut all = Vec::new();
        for eid in 0..node.entry_count() {
            all.push(node.as_ref().entry_at(eid).unwrap().key());
        }
        for eid in 0..sibling.entry_count() {
            all.push(sibling.as_ref().entry_at(eid).unwrap().key());
        }
        let mut expected: Vec<i32> = (1..=MAX_KEYS as i32).map(|k| k * 2).collect();
        expected.push(3);
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn next_leaf_pointer_round_trip() {
        let mut page = make_page();
        let mut node = LeafNodeMut::init(&mut page).unwrap();

        node.set_next_leaf(Some(42));
        assert_eq!(node.next_leaf(), Some(42));

        node.set_next_leaf(None);
        assert_eq!(node.next_leaf(), None);
    }

    #[test]
    fn from_page_rejects_corrupt_count() {
        let mut page = make_page();
        page[..4].copy_from_slice(&200i32.to_le_bytes());

        assert!(LeafNode::from_page(&page).is_err());

        page[..4].copy_from_slice(&(-3i32).to_le_bytes());
        assert!(LeafNode::from_page(&page).is_err());
    }
}
