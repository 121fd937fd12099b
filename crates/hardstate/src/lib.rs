use std::fs;
use std::path::{Path, PathBuf};

use flu_common::{FluError, HardState};
use tracing::{info, warn};

const HARD_STATE_FILENAME: &str = "hard-state";
const HARD_STATE_TMP_FILENAME: &str = "hard-state.tmp";

/// Loads and durably persists the FLU's hard state record in `<dir>/hard-state`.
/// Writes go to `<dir>/hard-state.tmp` first, then an atomic rename, so a
/// crash mid-write leaves readers seeing either the old or the new value,
/// never a partial one.
pub struct HardStateManager {
    dir: PathBuf,
    current: HardState,
}

impl HardStateManager {
    /// Load hard state from `dir`, or initialize it fresh with the given
    /// geometry if none exists yet. A mismatch between the on-disk geometry
    /// and the caller-supplied `(page_size, max_mem)` is a fatal error: a
    /// silent accept would corrupt every subsequent slot address
    /// calculation.
    pub fn open(dir: &Path, page_size: usize, max_mem: u64) -> Result<Self, FluError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(HARD_STATE_FILENAME);

        let current = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let loaded: HardState = serde_json::from_str(&content)
                .map_err(|e| FluError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

            if !loaded.geometry_matches(page_size, max_mem) {
                return Err(FluError::GeometryMismatch {
                    disk_page_size: loaded.page_size,
                    disk_max_mem: loaded.max_mem,
                    requested_page_size: page_size,
                    requested_max_mem: max_mem,
                });
            }
            info!(min_epoch = loaded.min_epoch, trim_watermark = loaded.trim_watermark, "loaded hard state");
            loaded
        } else {
            info!(page_size, max_mem, "no hard state on disk, initializing fresh");
            HardState::fresh(page_size, max_mem)
        };

        Ok(Self { dir: dir.to_path_buf(), current })
    }

    pub fn get(&self) -> &HardState {
        &self.current
    }

    pub fn min_epoch(&self) -> u64 {
        self.current.min_epoch
    }

    pub fn trim_watermark(&self) -> u64 {
        self.current.trim_watermark
    }

    pub fn set_min_epoch(&mut self, epoch: u64) {
        self.current.min_epoch = epoch;
    }

    pub fn bump_trim_watermark(&mut self, lpn: u64) {
        if lpn > self.current.trim_watermark {
            self.current.trim_watermark = lpn;
        }
    }

    /// Durably replace the hard-state file: write to a tmp path, then
    /// atomically rename over the live file.
    pub fn flush(&self) -> Result<(), FluError> {
        let tmp_path = self.dir.join(HARD_STATE_TMP_FILENAME);
        let path = self.dir.join(HARD_STATE_FILENAME);

        let content = serde_json::to_string_pretty(&self.current)
            .map_err(|e| FluError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        fs::write(&tmp_path, content)?;
        match fs::rename(&tmp_path, &path) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "failed to rename hard-state.tmp into place");
                Err(FluError::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fresh_init_when_absent() {
        let dir = TempDir::new().unwrap();
        let mgr = HardStateManager::open(dir.path(), 8, 1024).unwrap();
        assert_eq!(mgr.min_epoch(), 0);
        assert_eq!(mgr.trim_watermark(), 0);
    }

    #[test]
    fn flush_then_reload_roundtrips() {
        let dir = TempDir::new().unwrap();
        {
            let mut mgr = HardStateManager::open(dir.path(), 8, 1024).unwrap();
            mgr.set_min_epoch(4);
            mgr.bump_trim_watermark(9);
            mgr.flush().unwrap();
        }

        let mgr = HardStateManager::open(dir.path(), 8, 1024).unwrap();
        assert_eq!(mgr.min_epoch(), 4);
        assert_eq!(mgr.trim_watermark(), 9);
    }

    #[test]
    fn geometry_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        {
            let mgr = HardStateManager::open(dir.path(), 8, 1024).unwrap();
            mgr.flush().unwrap();
        }

        let result = HardStateManager::open(dir.path(), 16, 1024);
        assert!(matches!(result, Err(FluError::GeometryMismatch { .. })));
    }

    #[test]
    fn bump_trim_watermark_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let mut mgr = HardStateManager::open(dir.path(), 8, 1024).unwrap();
        mgr.bump_trim_watermark(5);
        mgr.bump_trim_watermark(3);
        assert_eq!(mgr.trim_watermark(), 5);
        mgr.bump_trim_watermark(8);
        assert_eq!(mgr.trim_watermark(), 8);
    }
}
