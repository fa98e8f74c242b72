//! # Memory-Mapped Paged File
//!
//! `PageFile` is the block-device abstraction every rookdb file sits on:
//! whole-page reads and writes against a dense, zero-initialised array of
//! 1024-byte pages. Callers above this layer never interpret file offsets;
//! they deal exclusively in page ids.
//!
//! ## Access Modes
//!
//! A file is opened in one of two modes:
//!
//! - `AccessMode::Read`: the file must exist; the mapping is read-only and
//!   `page_mut`/`allocate_page` fail.
//! - `AccessMode::Write`: the file is created when missing; pages can be
//!   mutated in place and new pages appended at the end.
//!
//! ## Growth
//!
//! `allocate_page` extends the file by exactly one page at the current
//! end (`end_pid`). The kernel zero-fills the new page, so freshly
//! allocated pages always read as all-zero bytes. Growing flushes the old
//! mapping and remaps; `&mut self` on the grow path lets the borrow
//! checker rule out dangling page references at compile time.
//!
//! ## Durability
//!
//! Writes land in the shared mapping immediately but reach the disk only
//! on `sync()` (or when the OS decides to write back). There is no
//! ordering contract between individual page writes; callers that need
//! durability call `sync`.

use std::fs::{File, OpenOptions};
use std::path::Path;

use eyre::{bail, ensure, Result, WrapErr};
use memmap2::{Mmap, MmapMut};

use super::PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

#[derive(Debug)]
enum PageMap {
    // A zero-length file cannot be mapped; the map is created on first growth.
    Unmapped,
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

#[derive(Debug)]
pub struct PageFile {
    file: File,
    map: PageMap,
    page_count: u32,
    mode: AccessMode,
}

impl PageFile {
    pub fn open<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref();

        let file = match mode {
            AccessMode::Read => OpenOptions::new()
                .read(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open '{}' for reading", path.display()))?,
            AccessMode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open '{}' for writing", path.display()))?,
        };

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", path.display()))?
            .len();

        ensure!(
            file_size % PAGE_SIZE as u64 == 0,
            "invalid file format: '{}' size {} is not a multiple of page size {}",
            path.display(),
            file_size,
            PAGE_SIZE
        );

        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        let map = if page_count == 0 {
            PageMap::Unmapped
        } else {
            match mode {
                // SAFETY: mapping a file is unsafe because external processes
                // could mutate it underneath us. This is safe because:
                // 1. rookdb files are owned by a single process for the
                //    duration of a session
                // 2. the mapping's lifetime is tied to PageFile, preventing
                //    use-after-unmap
                // 3. all access goes through page()/page_mut() which
                //    bounds-check the page id
                AccessMode::Read => PageMap::ReadOnly(unsafe {
                    Mmap::map(&file)
                        .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
                }),
                AccessMode::Write => PageMap::ReadWrite(unsafe {
                    MmapMut::map_mut(&file)
                        .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
                }),
            }
        };

        Ok(Self {
            file,
            map,
            page_count,
            mode,
        })
    }

    pub fn page(&self, pid: u32) -> Result<&[u8]> {
        ensure!(
            pid < self.page_count,
            "page {} out of bounds (page_count={})",
            pid,
            self.page_count
        );

        let offset = pid as usize * PAGE_SIZE;
        match &self.map {
            PageMap::ReadOnly(map) => Ok(&map[offset..offset + PAGE_SIZE]),
            PageMap::ReadWrite(map) => Ok(&map[offset..offset + PAGE_SIZE]),
            PageMap::Unmapped => bail!("page {} out of bounds (file is empty)", pid),
        }
    }

    pub fn page_mut(&mut self, pid: u32) -> Result<&mut [u8]> {
        ensure!(
            pid < self.page_count,
            "page {} out of bounds (page_count={})",
            pid,
            self.page_count
        );

        let offset = pid as usize * PAGE_SIZE;
        match &mut self.map {
            PageMap::ReadWrite(map) => Ok(&mut map[offset..offset + PAGE_SIZE]),
            _ => bail!("page file is not open for writing"),
        }
    }

    /// Appends one zero-filled page at the current end and returns its id.
    pub fn allocate_page(&mut self) -> Result<u32> {
        ensure!(
            self.mode == AccessMode::Write,
            "page file is not open for writing"
        );

        if let PageMap::ReadWrite(map) = &self.map {
            map.flush_async()
                .wrap_err("failed to flush mapping before grow")?;
        }

        let pid = self.page_count;
        let new_size = (pid as u64 + 1) * PAGE_SIZE as u64;

        self.file
            .set_len(new_size)
            .wrap_err_with(|| format!("failed to extend file to {} bytes", new_size))?;

        // SAFETY: the old mapping becomes invalid on remap. This is safe
        // because allocate_page takes &mut self, so the borrow checker
        // guarantees no page references exist; the old map is dropped when
        // the new one is assigned.
        self.map = PageMap::ReadWrite(unsafe {
            MmapMut::map_mut(&self.file).wrap_err("failed to remap file after grow")?
        });
        self.page_count = pid + 1;

        Ok(pid)
    }

    /// One past the highest written page id.
    pub fn end_pid(&self) -> u32 {
        self.page_count
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn sync(&self) -> Result<()> {
        match &self.map {
            PageMap::ReadWrite(map) => map.flush().wrap_err("failed to sync page file"),
            _ => Ok(()),
        }
    }
}
