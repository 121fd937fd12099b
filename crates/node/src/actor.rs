use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use flu_common::{Epoch, FillOutcome, FluError, FluStatus, Lpn, ReadOutcome, SealOutcome, TrimOutcome, WriteOutcome};
use tracing::{error, info};

use crate::pagemachine::Inner;

/// One request to the dispatcher, paired with a one-shot reply channel.
/// Requests are drained strictly in arrival order by the single owner
/// thread spawned in `spawn`: an operation — including any hard-state
/// flush it triggers — runs to completion before the next begins.
pub enum Command {
    Write {
        epoch: Epoch,
        lpn: Lpn,
        bytes: Vec<u8>,
        reply: Sender<Result<WriteOutcome, FluError>>,
    },
    Read {
        epoch: Epoch,
        lpn: Lpn,
        reply: Sender<Result<ReadOutcome, FluError>>,
    },
    Trim {
        epoch: Epoch,
        lpn: Lpn,
        reply: Sender<Result<TrimOutcome, FluError>>,
    },
    Fill {
        epoch: Epoch,
        lpn: Lpn,
        reply: Sender<Result<FillOutcome, FluError>>,
    },
    Seal {
        epoch: Epoch,
        reply: Sender<Result<SealOutcome, FluError>>,
    },
    Status {
        reply: Sender<FluStatus>,
    },
    Stop {
        reply: Sender<Result<(), FluError>>,
    },
}

/// Spawn the dedicated owner thread and return the channel used to submit
/// requests to it, plus its join handle.
pub fn spawn(mut inner: Inner) -> (Sender<Command>, JoinHandle<()>) {
    let (tx, rx): (Sender<Command>, Receiver<Command>) = mpsc::channel();

    let handle = thread::spawn(move || {
        info!("FLU dispatcher thread started");
        while let Ok(cmd) = rx.recv() {
            match cmd {
                Command::Write { epoch, lpn, bytes, reply } => {
                    let _ = reply.send(inner.write(epoch, lpn, &bytes));
                }
                Command::Read { epoch, lpn, reply } => {
                    let _ = reply.send(inner.read(epoch, lpn));
                }
                Command::Trim { epoch, lpn, reply } => {
                    let _ = reply.send(inner.trim(epoch, lpn));
                }
                Command::Fill { epoch, lpn, reply } => {
                    let _ = reply.send(inner.fill(epoch, lpn));
                }
                Command::Seal { epoch, reply } => {
                    let _ = reply.send(inner.seal(epoch));
                }
                Command::Status { reply } => {
                    let _ = reply.send(inner.status());
                }
                Command::Stop { reply } => {
                    let result = inner.flush_hard_state();
                    if let Err(ref e) = result {
                        error!(error = %e, "hard state flush failed during stop");
                    }
                    let _ = reply.send(result);
                    break;
                }
            }
        }
        info!("FLU dispatcher thread stopped");
    });

    (tx, handle)
}
