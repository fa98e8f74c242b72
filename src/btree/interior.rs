//! # B+Tree Interior Nodes
//!
//! Interior nodes hold separator keys and child page pointers, forming
//! the routing levels of the tree. A node with `k` separators has `k + 1`
//! children: one leading pointer plus one pointer per entry.
//!
//! ## Page Layout (1024 bytes)
//!
//! ```text
//! Offset 0          count (4 bytes, little-endian)
//! Offset 4          leading child page id (4 bytes)
//! Offset 8          entries, 8 bytes each: key (4) | child page id (4)
//! ...               unused padding
//! +-------+---------+----------------------------------+---------+
//! | count | child 0 | key 0, child 1 | key 1, child 2 | padding |
//! +-------+---------+----------------------------------+---------+
//! ```
//!
//! Read as the alternating sequence `P0 K0 P1 K1 ... Pk`, every key
//! reachable under `Pi` is >= the separator to its left and < the
//! separator to its right (duplicates are tolerated at the equality
//! boundary).
//!
//! ## Navigation
//!
//! For a search key K, follow the pointer immediately left of the first
//! separator strictly greater than K; when no separator is greater,
//! follow the trailing pointer. Keys equal to a separator therefore route
//! right, matching the leaf split that promotes the right sibling's
//! first key.
//!
//! ## Splitting
//!
//! `insert_and_split` merges the new `(key, child)` into the full node's
//! sequence, keeps the first `(count + 1) / 2` separators on the left,
//! and moves the rest to the sibling. The separator between the halves
//! is promoted to the parent and appears in neither child; the sibling's
//! leading pointer is the child that followed the promoted key.

use eyre::{ensure, Result};
use zerocopy::little_endian::{I32, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::storage::PAGE_SIZE;

use super::MAX_KEYS;

pub const INTERIOR_ENTRY_SIZE: usize = 8;
pub const INTERIOR_ENTRY_START: usize = 8;
const LEADING_CHILD_OFFSET: usize = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct InteriorEntry {
    key: I32,
    child: U32,
}

const _: () = assert!(std::mem::size_of::<InteriorEntry>() == INTERIOR_ENTRY_SIZE);

impl InteriorEntry {
    pub fn new(key: i32, child: u32) -> Self {
        Self {
            key: I32::new(key),
            child: U32::new(child),
        }
    }

    pub fn key(&self) -> i32 {
        self.key.get()
    }

    pub fn child(&self) -> u32 {
        self.child.get()
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
        "invalid interior page: entry count {} out of range",
        count
    );
    Ok(())
}

fn entry_offset(eid: usize) -> usize {
    INTERIOR_ENTRY_START + eid * INTERIOR_ENTRY_SIZE
}

#[derive(Debug)]
pub struct InteriorNode<'a> {
    data: &'a [u8],
}

pub struct InteriorNodeMut<'a> {
    data: &'a mut [u8],
}

impl<'a> InteriorNode<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        validate_page(data)?;
        Ok(Self { data })
    }

    pub fn entry_count(&self) -> usize {
        read_count(self.data) as usize
    }

    pub fn leading_child(&self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.data[LEADING_CHILD_OFFSET..LEADING_CHILD_OFFSET + 4]);
        u32::from_le_bytes(raw)
    }

    pub fn entry_at(&self, eid: usize) -> Result<&'a InteriorEntry> {
        ensure!(
            eid < self.entry_count(),
            "entry {} out of bounds (count={})",
            eid,
            self.entry_count()
        );
        let offset = entry_offset(eid);
        InteriorEntry::ref_from_bytes(&self.data[offset..offset + INTERIOR_ENTRY_SIZE])
            .map_err(|e| eyre::eyre!("failed to read interior entry {}: {:?}", eid, e))
    }

    /// The child pointer to follow for a search key.
    pub fn locate_child(&self, key: i32) -> Result<u32> {
        let count = self.entry_count();
        for eid in 0..count {
            let entry = self.entry_at(eid)?;
            if entry.key() > key {
                return Ok(if eid == 0 {
                    self.leading_child()
                } else {
                    self.entry_at(eid - 1)?.child()
                });
            }
        }
        if count == 0 {
            Ok(self.leading_child())
        } else {
            Ok(self.entry_at(count - 1)?.child())
        }
    }
}

impl<'a> InteriorNodeMut<'a> {
    pub fn from_page(data: &'a mut [u8]) -> Result<Self> {
        validate_page(data)?;
        Ok(Self { data })
    }

    pub fn init(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        data[..4].copy_from_slice(&0i32.to_le_bytes());
        Ok(Self { data })
    }

    /// Writes a fresh root routing between exactly two children.
    pub fn initialize_root(data: &'a mut [u8], left: u32, key: i32, right: u32) -> Result<Self> {
        let mut node = Self::init(data)?;
        node.set_leading_child(left);
        node.write_entry(0, key, right);
        node.set_entry_count(1);
        Ok(node)
    }

    pub fn as_ref(&self) -> InteriorNode<'_> {
        InteriorNode { data: self.data }
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

    pub fn leading_child(&self) -> u32 {
        self.as_ref().leading_child()
    }

    pub fn set_leading_child(&mut self, pid: u32) {
        self.data[LEADING_CHILD_OFFSET..LEADING_CHILD_OFFSET + 4]
            .copy_from_slice(&pid.to_le_bytes());
    }

    fn write_entry(&mut self, eid: usize, key: i32, child: u32) {
        let offset = entry_offset(eid);
        let entry = InteriorEntry::new(key, child);
        self.data[offset..offset + INTERIOR_ENTRY_SIZE].copy_from_slice(entry.as_bytes());
    }

    /// Inserts a separator with the child that sits to its right.
    pub fn insert(&mut self, key: i32, child: u32) -> Result<()> {
        let count = self.entry_count();
        ensure!(count < MAX_KEYS, "interior node is full");

        let pos = self.insert_position(key)?;
        let start = entry_offset(pos);
        let end = entry_offset(count);
        self.data
            .copy_within(start..end, start + INTERIOR_ENTRY_SIZE);

        self.write_entry(pos, key, child);
        self.set_entry_count(count + 1);

        Ok(())
    }

    // First position whose separator is strictly greater; equal separators
    // keep the newcomer to their right, consistent with locate_child.
    fn insert_position(&self, key: i32) -> Result<usize> {
        let node = self.as_ref();
        let count = node.entry_count();
        for eid in 0..count {
            if node.entry_at(eid)?.key() > key {
                return Ok(eid);
            }
        }
        Ok(count)
    }

    /// Splits a full node while inserting `(key, child)`. The left node
    /// keeps the first `(count + 1) / 2` separators of the merged
    /// sequence; the one after them is promoted (returned) and appears in
    /// neither child; the sibling takes everything to its right. The
    /// caller allocates the sibling's page.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        child: u32,
        sibling: &mut InteriorNodeMut<'_>,
    ) -> Result<i32> {
        let count = self.entry_count();
        ensure!(count == MAX_KEYS, "split requires a full node");
        ensure!(sibling.entry_count() == 0, "split sibling must be empty");

        let node = self.as_ref();
        let mut keys = Vec::with_capacity(count + 1);
        let mut children = Vec::with_capacity(count + 2);
        children.push(node.leading_child());
        for eid in 0..count {
            let entry = node.entry_at(eid)?;
            keys.push(entry.key());
            children.push(entry.child());
        }

        let pos = self.insert_position(key)?;
        keys.insert(pos, key);
        children.insert(pos + 1, child);

        let left_size = (count + 1) / 2;
        let mid_key = keys[left_size];

        self.set_entry_count(left_size);
        self.set_leading_child(children[0]);
        for (eid, (&k, &c)) in keys[..left_size]
            .iter()
            .zip(&children[1..=left_size])
            .enumerate()
        {
            self.write_entry(eid, k, c);
        }

        let right_size = keys.len() - left_size - 1;
        sibling.set_leading_child(children[left_size + 1]);
        for (eid, (&k, &c)) in keys[left_size + 1..]
            .iter()
            .zip(&children[left_size + 2..])
            .enumerate()
        {
            sibling.write_entry(eid, k, c);
        }
        sibling.set_entry_count(right_size);

        Ok(mid_key)
    }
}
