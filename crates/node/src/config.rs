use std::path::{Path, PathBuf};

use flu_common::{DEFAULT_MAX_MEM, DEFAULT_PAGE_SIZE};

/// Construction-time configuration for one FLU. `page_size` and `max_mem`
/// are immutable for the lifetime of the node: once hard state has been
/// written with a given geometry, reopening with different values is a
/// fatal error (see `flu_hardstate::HardStateManager::open`).
#[derive(Debug, Clone)]
pub struct FluConfig {
    pub dir: PathBuf,
    pub page_size: usize,
    pub max_mem: u64,
}

impl FluConfig {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            page_size: DEFAULT_PAGE_SIZE,
            max_mem: DEFAULT_MAX_MEM,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_mem(mut self, max_mem: u64) -> Self {
        self.max_mem = max_mem;
        self
    }
}
