use std::io;

use flu_common::{slot_offset, Lpn, SlotStatus};
use tracing::{debug, info};

use crate::slot::{decode_prefix, PREFIX_LEN};
use crate::store::PageStore;

/// Walk the page file slot-by-slot from LPN 0 upward, reconstructing the
/// maximum logical page number ever committed-written. Stops when the
/// next slot's offset would reach `max_mem` or the file's current size,
/// whichever comes first.
pub fn scan_max_written(store: &PageStore, page_size: usize, max_mem: u64) -> io::Result<Lpn> {
    let file_len = store.file_len()?;
    let mut max_written: Lpn = 0;
    let mut lpn: Lpn = 0;

    loop {
        let offset = slot_offset(lpn, page_size);
        if offset >= max_mem || offset >= file_len {
            break;
        }

        let prefix = store.read_prefix(lpn, page_size)?;
        if prefix.len() < PREFIX_LEN {
            break;
        }
        let decoded = decode_prefix(&prefix);
        if decoded.status == SlotStatus::Written as u8 && lpn > max_written {
            max_written = lpn;
        }
        lpn += 1;
    }

    debug!(scanned_slots = lpn, max_written, "recovery scan complete");
    info!(max_logical_page = max_written, "recovered max logical page");
    Ok(max_written)
}
