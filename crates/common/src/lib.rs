use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Logical Page Number. Strictly positive; 0 is reserved/invalid.
pub type Lpn = u64;

/// Monotonically non-decreasing epoch stamped on every client request.
pub type Epoch = u64;

/// Per-slot on-disk overhead: 1 status byte + 8 stored-LPN bytes + 1 tail marker.
pub const PAGE_OVERHEAD: usize = 10;

/// Default page payload size, in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// Default address-space ceiling, in bytes.
pub const DEFAULT_MAX_MEM: u64 = 64 * 1024 * 1024;

/// Byte offset of the status header of `lpn`'s slot within the page file.
pub fn slot_size(page_size: usize) -> u64 {
    (PAGE_OVERHEAD + page_size) as u64
}

/// Byte offset of the start of `lpn`'s slot within the page file.
pub fn slot_offset(lpn: Lpn, page_size: usize) -> u64 {
    lpn * slot_size(page_size)
}

/// Largest LPN whose slot fits entirely within `max_mem` bytes.
pub fn max_addressable_lpn(page_size: usize, max_mem: u64) -> Lpn {
    let stride = slot_size(page_size);
    if stride == 0 {
        return 0;
    }
    max_mem / stride
}

// ---------------------------------------------------------------------------
// On-disk slot status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotStatus {
    Unwritten = 0,
    Written = 1,
    Trimmed = 2,
}

impl SlotStatus {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(SlotStatus::Unwritten),
            1 => Some(SlotStatus::Written),
            2 => Some(SlotStatus::Trimmed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Durable hard state
// ---------------------------------------------------------------------------

/// Tag distinguishing the on-disk format of the hard-state record.
pub const HARD_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HardState {
    pub version_tag: u32,
    pub min_epoch: Epoch,
    pub page_size: usize,
    pub max_mem: u64,
    pub trim_watermark: Lpn,
}

impl HardState {
    pub fn fresh(page_size: usize, max_mem: u64) -> Self {
        Self {
            version_tag: HARD_STATE_VERSION,
            min_epoch: 0,
            page_size,
            max_mem,
            trim_watermark: 0,
        }
    }

    /// Geometry fields that must match between the running configuration
    /// and a loaded hard-state record.
    pub fn geometry_matches(&self, page_size: usize, max_mem: u64) -> bool {
        self.page_size == page_size && self.max_mem == max_mem
    }
}

// ---------------------------------------------------------------------------
// Status snapshot returned by the `status` operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluStatus {
    pub min_epoch: Epoch,
    pub page_size: usize,
    pub max_mem: u64,
    pub max_logical_page: Lpn,
    pub trim_watermark: Lpn,
}

// ---------------------------------------------------------------------------
// Operation outcomes — routine protocol results, not exceptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Ok,
    BadEpoch,
    Overwritten,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Ok(Vec<u8>),
    BadEpoch,
    Trimmed,
    Unwritten,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealOutcome {
    Ok(Lpn),
    BadEpoch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimOutcome {
    Ok,
    BadEpoch,
    Unwritten,
    Trimmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Ok,
    BadEpoch,
    Overwritten,
    Trimmed,
}

// ---------------------------------------------------------------------------
// Fatal / bad-request errors — these do halt a request or node startup
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FluError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "hard state geometry mismatch: on-disk page_size={disk_page_size} max_mem={disk_max_mem}, \
         requested page_size={requested_page_size} max_mem={requested_max_mem}"
    )]
    GeometryMismatch {
        disk_page_size: usize,
        disk_max_mem: u64,
        requested_page_size: usize,
        requested_max_mem: u64,
    },

    #[error("bad request: lpn {lpn} is reserved (must be > 0)")]
    ZeroLpn { lpn: Lpn },

    #[error("bad request: epoch must be > 0")]
    ZeroEpoch,

    #[error("bad request: page length {got} does not match configured page_size {expected}")]
    WrongPageLength { got: usize, expected: usize },

    #[error("bad request: lpn {lpn} slot offset {offset} exceeds max_mem {max_mem}")]
    LpnOutOfRange { lpn: Lpn, offset: u64, max_mem: u64 },

    #[error("dispatcher actor is no longer running")]
    ActorStopped,
}
