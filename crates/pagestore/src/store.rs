use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use flu_common::{slot_offset, slot_size, Lpn};

use crate::slot::PREFIX_LEN;

/// Backs one memfile of up to `max_mem` bytes with positioned reads and
/// writes of fixed-size page slots. Durability of individual writes is
/// the caller's policy; the file may be extended sparsely.
pub struct PageStore {
    file: File,
}

impl PageStore {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self { file })
    }

    pub fn file_len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Read up to `len` bytes starting at `offset`. Returns the bytes
    /// actually read, which may be shorter than `len` (or empty) when the
    /// requested range runs past EOF. Callers treat a short/empty read as
    /// "unwritten".
    fn read_up_to(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let file_len = self.file_len()?;
        if offset >= file_len {
            return Ok(Vec::new());
        }
        let available = (file_len - offset).min(len as u64) as usize;
        let mut buf = vec![0u8; available];
        self.file.read_at(&mut buf, offset)?;
        Ok(buf)
    }

    /// Read the 9-byte status+stored-LPN prefix of `lpn`'s slot. Returns
    /// fewer than 9 bytes (possibly zero) if the slot has never been
    /// touched and lies beyond EOF.
    pub fn read_prefix(&self, lpn: Lpn, page_size: usize) -> io::Result<Vec<u8>> {
        let offset = slot_offset(lpn, page_size);
        self.read_up_to(offset, PREFIX_LEN)
    }

    /// Read the full slot (status + stored LPN + payload + tail marker).
    /// May return fewer bytes than a full slot if it lies at or beyond EOF.
    pub fn read_full_slot(&self, lpn: Lpn, page_size: usize) -> io::Result<Vec<u8>> {
        let offset = slot_offset(lpn, page_size);
        self.read_up_to(offset, slot_size(page_size) as usize)
    }

    /// Write a complete slot buffer in one positioned write call.
    pub fn write_full_slot(&self, lpn: Lpn, page_size: usize, bytes: &[u8]) -> io::Result<()> {
        debug_assert_eq!(bytes.len(), slot_size(page_size) as usize);
        let offset = slot_offset(lpn, page_size);
        self.file.write_at(bytes, offset)
    }

    /// Overwrite just the 1-byte status header (used by trim/fill, which
    /// mutate only the status byte of an already-existing slot).
    pub fn write_status_byte(&self, lpn: Lpn, page_size: usize, status: u8) -> io::Result<()> {
        let offset = slot_offset(lpn, page_size);
        self.file.write_at(&[status], offset)
    }
}
