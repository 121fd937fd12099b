use flu_common::{
    slot_offset, Epoch, FillOutcome, FluError, FluStatus, Lpn, ReadOutcome, SealOutcome,
    SlotStatus, TrimOutcome, WriteOutcome,
};
use flu_hardstate::HardStateManager;
use flu_pagestore::slot::{decode_prefix, encode_written_slot, payload_if_committed, PREFIX_LEN};
use flu_pagestore::store::PageStore;
use tracing::{debug, info};

/// Every Nth successful trim/fill flushes hard state rather than on every one.
const TRIM_FILL_FLUSH_INTERVAL: u64 = 1000;

/// Owns the page file, the hard state, and every mutable field of one FLU.
/// All methods run to completion without yielding — the single-owner
/// actor in `actor.rs` calls these serially, one at a time, in arrival
/// order.
pub struct Inner {
    store: PageStore,
    hard_state: HardStateManager,
    page_size: usize,
    max_mem: u64,
    max_logical_page: Lpn,
    trim_fill_successes: u64,
}

impl Inner {
    pub fn new(
        store: PageStore,
        hard_state: HardStateManager,
        page_size: usize,
        max_mem: u64,
        max_logical_page: Lpn,
    ) -> Self {
        Self {
            store,
            hard_state,
            page_size,
            max_mem,
            max_logical_page,
            trim_fill_successes: 0,
        }
    }

    fn epoch_ok(&self, epoch: Epoch) -> bool {
        epoch >= self.hard_state.min_epoch()
    }

    fn validate_lpn(&self, lpn: Lpn) -> Result<(), FluError> {
        if lpn == 0 {
            return Err(FluError::ZeroLpn { lpn });
        }
        let offset = slot_offset(lpn, self.page_size);
        if offset >= self.max_mem {
            return Err(FluError::LpnOutOfRange {
                lpn,
                offset,
                max_mem: self.max_mem,
            });
        }
        Ok(())
    }

    fn bump_trim_fill_counter(&mut self) -> Result<(), FluError> {
        self.trim_fill_successes += 1;
        if self.trim_fill_successes % TRIM_FILL_FLUSH_INTERVAL == 0 {
            debug!(count = self.trim_fill_successes, "periodic hard state flush");
            self.hard_state.flush()?;
        }
        Ok(())
    }

    // -- write --------------------------------------------------------

    pub fn write(&mut self, epoch: Epoch, lpn: Lpn, page_bytes: &[u8]) -> Result<WriteOutcome, FluError> {
        if !self.epoch_ok(epoch) {
            return Ok(WriteOutcome::BadEpoch);
        }
        self.validate_lpn(lpn)?;
        if page_bytes.len() != self.page_size {
            return Err(FluError::WrongPageLength {
                got: page_bytes.len(),
                expected: self.page_size,
            });
        }

        let prefix = self.store.read_prefix(lpn, self.page_size)?;
        let status = if prefix.len() < PREFIX_LEN {
            SlotStatus::Unwritten
        } else {
            SlotStatus::from_byte(decode_prefix(&prefix).status).unwrap_or(SlotStatus::Unwritten)
        };

        match status {
            SlotStatus::Unwritten => {
                let full_slot = encode_written_slot(lpn, page_bytes);
                self.store.write_full_slot(lpn, self.page_size, &full_slot)?;
                if lpn > self.max_logical_page {
                    self.max_logical_page = lpn;
                }
                Ok(WriteOutcome::Ok)
            }
            SlotStatus::Written | SlotStatus::Trimmed => Ok(WriteOutcome::Overwritten),
        }
    }

    // -- read -----------------------------------------------------------

    pub fn read(&mut self, epoch: Epoch, lpn: Lpn) -> Result<ReadOutcome, FluError> {
        if !self.epoch_ok(epoch) {
            return Ok(ReadOutcome::BadEpoch);
        }
        if epoch == 0 {
            return Err(FluError::ZeroEpoch);
        }
        self.validate_lpn(lpn)?;

        let full_slot = self.store.read_full_slot(lpn, self.page_size)?;
        if full_slot.len() < PREFIX_LEN {
            return Ok(ReadOutcome::Unwritten);
        }

        let prefix = decode_prefix(&full_slot[..PREFIX_LEN]);
        match SlotStatus::from_byte(prefix.status) {
            Some(SlotStatus::Trimmed) => Ok(ReadOutcome::Trimmed),
            Some(SlotStatus::Written) => match payload_if_committed(&full_slot, self.page_size) {
                Some(payload) if prefix.stored_lpn == lpn => Ok(ReadOutcome::Ok(payload.to_vec())),
                _ => Ok(ReadOutcome::Unwritten), // torn write: status=1 but tail marker missing
            },
            _ => Ok(ReadOutcome::Unwritten),
        }
    }

    // -- trim -------------------------------------------------------------

    pub fn trim(&mut self, epoch: Epoch, lpn: Lpn) -> Result<TrimOutcome, FluError> {
        if !self.epoch_ok(epoch) {
            return Ok(TrimOutcome::BadEpoch);
        }
        self.validate_lpn(lpn)?;

        let status = self.read_status(lpn)?;
        match status {
            SlotStatus::Unwritten => Ok(TrimOutcome::Unwritten),
            SlotStatus::Written => {
                self.store.write_status_byte(lpn, self.page_size, SlotStatus::Trimmed as u8)?;
                self.hard_state.bump_trim_watermark(lpn);
                self.bump_trim_fill_counter()?;
                Ok(TrimOutcome::Ok)
            }
            SlotStatus::Trimmed => Ok(TrimOutcome::Trimmed),
        }
    }

    // -- fill ---------------------------------------------------------------

    /// Finalizes an unwritten page as permanently empty. Deliberately
    /// stricter than the source this spec is drawn from: a `fill` on an
    /// already-written slot returns `Overwritten`, never silently
    /// degrading into a trim.
    pub fn fill(&mut self, epoch: Epoch, lpn: Lpn) -> Result<FillOutcome, FluError> {
        if !self.epoch_ok(epoch) {
            return Ok(FillOutcome::BadEpoch);
        }
        self.validate_lpn(lpn)?;

        let status = self.read_status(lpn)?;
        match status {
            SlotStatus::Unwritten => {
                self.store.write_status_byte(lpn, self.page_size, SlotStatus::Trimmed as u8)?;
                self.hard_state.bump_trim_watermark(lpn);
                self.bump_trim_fill_counter()?;
                Ok(FillOutcome::Ok)
            }
            SlotStatus::Written => Ok(FillOutcome::Overwritten),
            SlotStatus::Trimmed => Ok(FillOutcome::Trimmed),
        }
    }

    fn read_status(&self, lpn: Lpn) -> Result<SlotStatus, FluError> {
        let prefix = self.store.read_prefix(lpn, self.page_size)?;
        if prefix.len() < PREFIX_LEN {
            return Ok(SlotStatus::Unwritten);
        }
        Ok(SlotStatus::from_byte(decode_prefix(&prefix).status).unwrap_or(SlotStatus::Unwritten))
    }

    // -- seal -----------------------------------------------------------

    pub fn seal(&mut self, epoch: Epoch) -> Result<SealOutcome, FluError> {
        if epoch < self.hard_state.min_epoch() {
            return Ok(SealOutcome::BadEpoch);
        }
        self.hard_state.set_min_epoch(epoch + 1);
        self.hard_state.flush()?;
        info!(new_min_epoch = epoch + 1, max_logical_page = self.max_logical_page, "sealed");
        Ok(SealOutcome::Ok(self.max_logical_page))
    }

    // -- status -----------------------------------------------------------

    pub fn status(&self) -> FluStatus {
        FluStatus {
            min_epoch: self.hard_state.min_epoch(),
            page_size: self.page_size,
            max_mem: self.max_mem,
            max_logical_page: self.max_logical_page,
            trim_watermark: self.hard_state.trim_watermark(),
        }
    }

    // -- stop ---------------------------------------------------------------

    pub fn flush_hard_state(&self) -> Result<(), FluError> {
        self.hard_state.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flu_pagestore::PageStore;
    use tempfile::TempDir;

    fn new_inner(dir: &TempDir, page_size: usize, max_mem: u64) -> Inner {
        let store = PageStore::open(&dir.path().join("pagefile")).unwrap();
        let hard_state = flu_hardstate::HardStateManager::open(dir.path(), page_size, max_mem).unwrap();
        Inner::new(store, hard_state, page_size, max_mem, 0)
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = TempDir::new().unwrap();
        let mut inner = new_inner(&dir, 8, 64 * 1024 * 1024);

        assert_eq!(inner.write(1, 5, b"ABCDEFGH").unwrap(), WriteOutcome::Ok);
        assert_eq!(inner.read(1, 5).unwrap(), ReadOutcome::Ok(b"ABCDEFGH".to_vec()));
    }

    #[test]
    fn second_write_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let mut inner = new_inner(&dir, 8, 64 * 1024 * 1024);

        inner.write(1, 5, b"xxxxxxxx").unwrap();
        assert_eq!(inner.write(1, 5, b"yyyyyyyy").unwrap(), WriteOutcome::Overwritten);
        assert_eq!(inner.read(1, 5).unwrap(), ReadOutcome::Ok(b"xxxxxxxx".to_vec()));
    }

    #[test]
    fn trim_then_read_is_trimmed_and_write_fails() {
        let dir = TempDir::new().unwrap();
        let mut inner = new_inner(&dir, 8, 64 * 1024 * 1024);

        inner.write(1, 7, b"zzzzzzzz").unwrap();
        assert_eq!(inner.trim(1, 7).unwrap(), TrimOutcome::Ok);
        assert_eq!(inner.read(1, 7).unwrap(), ReadOutcome::Trimmed);
        assert_eq!(inner.write(1, 7, b"qqqqqqqq").unwrap(), WriteOutcome::Overwritten);
    }

    #[test]
    fn fill_on_unwritten_then_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut inner = new_inner(&dir, 8, 64 * 1024 * 1024);

        assert_eq!(inner.fill(1, 9).unwrap(), FillOutcome::Ok);
        assert_eq!(inner.read(1, 9).unwrap(), ReadOutcome::Trimmed);
        assert_eq!(inner.fill(1, 9).unwrap(), FillOutcome::Trimmed);
    }

    #[test]
    fn fill_on_written_is_overwritten_not_a_silent_trim() {
        let dir = TempDir::new().unwrap();
        let mut inner = new_inner(&dir, 8, 64 * 1024 * 1024);

        inner.write(1, 2, b"aaaaaaaa").unwrap();
        assert_eq!(inner.fill(1, 2).unwrap(), FillOutcome::Overwritten);
        // still readable as the original write, not trimmed
        assert_eq!(inner.read(1, 2).unwrap(), ReadOutcome::Ok(b"aaaaaaaa".to_vec()));
    }

    #[test]
    fn seal_bumps_min_epoch_and_reports_max_logical_page() {
        let dir = TempDir::new().unwrap();
        let mut inner = new_inner(&dir, 8, 64 * 1024 * 1024);

        assert_eq!(inner.seal(1).unwrap(), SealOutcome::Ok(0));
        assert_eq!(inner.write(1, 1, b"ABCDEFGH").unwrap(), WriteOutcome::BadEpoch);
        assert_eq!(inner.write(2, 1, b"ABCDEFGH").unwrap(), WriteOutcome::Ok);
        assert_eq!(inner.seal(2).unwrap(), SealOutcome::Ok(1));
        assert_eq!(inner.seal(1).unwrap(), SealOutcome::BadEpoch);
    }

    #[test]
    fn bad_request_rejects_zero_lpn_and_wrong_length() {
        let dir = TempDir::new().unwrap();
        let mut inner = new_inner(&dir, 8, 64 * 1024 * 1024);

        assert!(matches!(inner.write(1, 0, b"ABCDEFGH"), Err(FluError::ZeroLpn { .. })));
        assert!(matches!(inner.write(1, 2, b"short"), Err(FluError::WrongPageLength { .. })));
    }

    #[test]
    fn write_beyond_max_mem_is_rejected() {
        let dir = TempDir::new().unwrap();
        // slot size = 18 bytes; max_mem = 36 admits LPN 0 and 1 only (offsets 0, 18)
        let mut inner = new_inner(&dir, 8, 36);
        let biggest = flu_common::max_addressable_lpn(8, 36) - 1;
        assert_eq!(biggest, 1);

        assert_eq!(inner.write(1, 1, b"ABCDEFGH").unwrap(), WriteOutcome::Ok);
        assert!(matches!(inner.write(1, 2, b"ABCDEFGH"), Err(FluError::LpnOutOfRange { .. })));
    }

    #[test]
    fn read_never_written_is_unwritten() {
        let dir = TempDir::new().unwrap();
        let mut inner = new_inner(&dir, 8, 64 * 1024 * 1024);
        assert_eq!(inner.read(1, 42).unwrap(), ReadOutcome::Unwritten);
    }
}
