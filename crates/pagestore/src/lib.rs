pub mod recovery;
pub mod slot;
pub mod store;

pub use recovery::scan_max_written;
pub use slot::{decode_prefix, encode_written_slot, payload_if_committed, SlotPrefix, PREFIX_LEN};
pub use store::PageStore;
