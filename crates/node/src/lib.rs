mod actor;
mod config;
mod pagemachine;

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub use config::FluConfig;
pub use flu_common::{
    Epoch, FillOutcome, FluError, FluStatus, Lpn, ReadOutcome, SealOutcome, TrimOutcome,
    WriteOutcome,
};

use actor::Command;
use flu_hardstate::HardStateManager;
use flu_pagestore::{scan_max_written, PageStore};
use pagemachine::Inner;
use tracing::info;

const PAGE_FILE_NAME: &str = "pagefile";

/// Handle to one running FLU. Cheap to clone — every clone shares the
/// same dispatcher thread and page file. All operations are serialized
/// by that single owner thread in FIFO arrival order; see
/// `actor::spawn`.
#[derive(Clone)]
pub struct Flu {
    inner: Arc<Handle>,
}

struct Handle {
    tx: Sender<Command>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Flu {
    /// Open (or create) a FLU rooted at `config.dir`. Runs recovery
    /// synchronously before returning — no request is accepted until the
    /// page file has been scanned and `max_logical_page` reconstructed.
    pub fn open(config: FluConfig) -> Result<Self, FluError> {
        std::fs::create_dir_all(&config.dir)?;

        let hard_state = HardStateManager::open(&config.dir, config.page_size, config.max_mem)?;
        let store = PageStore::open(&config.dir.join(PAGE_FILE_NAME))?;
        let max_logical_page = scan_max_written(&store, config.page_size, config.max_mem)?;

        let inner = Inner::new(store, hard_state, config.page_size, config.max_mem, max_logical_page);
        // Recovery's result is consulted by seal and by clients discovering
        // the log tail, so publish it durably once before serving requests.
        inner.flush_hard_state()?;

        let (tx, join) = actor::spawn(inner);
        info!(dir = %config.dir.display(), page_size = config.page_size, max_mem = config.max_mem, "FLU opened");

        Ok(Self {
            inner: Arc::new(Handle { tx, join: Mutex::new(Some(join)) }),
        })
    }

    fn request<T>(&self, make: impl FnOnce(Sender<Result<T, FluError>>) -> Command) -> Result<T, FluError> {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        let cmd = make(reply_tx);
        self.inner.tx.send(cmd).map_err(|_| FluError::ActorStopped)?;
        reply_rx.recv().map_err(|_| FluError::ActorStopped)?
    }

    pub fn write(&self, epoch: Epoch, lpn: Lpn, bytes: Vec<u8>) -> Result<WriteOutcome, FluError> {
        self.request(|reply| Command::Write { epoch, lpn, bytes, reply })
    }

    pub fn read(&self, epoch: Epoch, lpn: Lpn) -> Result<ReadOutcome, FluError> {
        self.request(|reply| Command::Read { epoch, lpn, reply })
    }

    pub fn trim(&self, epoch: Epoch, lpn: Lpn) -> Result<TrimOutcome, FluError> {
        self.request(|reply| Command::Trim { epoch, lpn, reply })
    }

    pub fn fill(&self, epoch: Epoch, lpn: Lpn) -> Result<FillOutcome, FluError> {
        self.request(|reply| Command::Fill { epoch, lpn, reply })
    }

    pub fn seal(&self, epoch: Epoch) -> Result<SealOutcome, FluError> {
        self.request(|reply| Command::Seal { epoch, reply })
    }

    pub fn status(&self) -> Result<FluStatus, FluError> {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        self.inner
            .tx
            .send(Command::Status { reply: reply_tx })
            .map_err(|_| FluError::ActorStopped)?;
        reply_rx.recv().map_err(|_| FluError::ActorStopped)
    }

    /// Gracefully stop the FLU: flushes hard state and joins the
    /// dispatcher thread. Idempotent — a second call is a no-op.
    pub fn stop(&self) -> Result<(), FluError> {
        let mut join_slot = self.inner.join.lock().unwrap();
        let join = match join_slot.take() {
            Some(j) => j,
            None => return Ok(()), // already stopped
        };

        let result = self.request(|reply| Command::Stop { reply });
        let _ = join.join();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Flu {
        Flu::open(FluConfig::new(dir.path())).unwrap()
    }

    #[test]
    fn write_read_trim_fill_seal_scenario() {
        let dir = TempDir::new().unwrap();
        let flu = open(&dir);

        assert_eq!(flu.seal(1).unwrap(), SealOutcome::Ok(0));
        assert_eq!(flu.write(1, 1, b"ABCDEFGH".to_vec()).unwrap(), WriteOutcome::BadEpoch);
        assert_eq!(flu.write(2, 1, b"ABCDEFGH".to_vec()).unwrap(), WriteOutcome::Ok);
        assert_eq!(flu.read(2, 1).unwrap(), ReadOutcome::Ok(b"ABCDEFGH".to_vec()));

        assert_eq!(flu.write(2, 7, b"zzzzzzzz".to_vec()).unwrap(), WriteOutcome::Ok);
        assert_eq!(flu.trim(2, 7).unwrap(), TrimOutcome::Ok);
        assert_eq!(flu.read(2, 7).unwrap(), ReadOutcome::Trimmed);
        assert_eq!(flu.write(2, 7, b"qqqqqqqq".to_vec()).unwrap(), WriteOutcome::Overwritten);

        assert_eq!(flu.fill(2, 9).unwrap(), FillOutcome::Ok);
        assert_eq!(flu.read(2, 9).unwrap(), ReadOutcome::Trimmed);
        assert_eq!(flu.fill(2, 9).unwrap(), FillOutcome::Trimmed);

        flu.stop().unwrap();
    }

    #[test]
    fn restart_recovers_max_logical_page() {
        let dir = TempDir::new().unwrap();
        {
            let flu = open(&dir);
            flu.write(1, 3, b"aaaaaaaa".to_vec()).unwrap();
            flu.stop().unwrap();
        }

        let flu = open(&dir);
        let status = flu.status().unwrap();
        assert_eq!(status.max_logical_page, 3);
        assert_eq!(flu.seal(1).unwrap(), SealOutcome::Ok(3));
        assert_eq!(flu.status().unwrap().min_epoch, 2);
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let flu = open(&dir);
        flu.stop().unwrap();
        flu.stop().unwrap();
    }

    #[test]
    fn clone_shares_the_same_dispatcher() {
        let dir = TempDir::new().unwrap();
        let flu = open(&dir);
        let flu2 = flu.clone();

        flu.write(1, 1, b"12345678".to_vec()).unwrap();
        assert_eq!(flu2.read(1, 1).unwrap(), ReadOutcome::Ok(b"12345678".to_vec()));
        flu.stop().unwrap();
    }
}
