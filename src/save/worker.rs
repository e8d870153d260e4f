//! Background thread for slot reads and writes
//!
//! Keeps disk latency off the frame update. The coordinator submits at most
//! one job at a time and collects the outcome from `SaveManager::poll`.

use log::debug;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use super::error::SaveError;
use super::store::FileStore;

#[derive(Debug)]
pub(crate) enum IoJob {
    Write { slot: usize, bytes: Vec<u8> },
    Read { slot: usize },
}

#[derive(Debug)]
pub(crate) enum IoOutcome {
    Written {
        slot: usize,
        result: io::Result<()>,
    },
    Read {
        slot: usize,
        result: io::Result<Option<Vec<u8>>>,
    },
}

pub(crate) struct IoWorker {
    jobs: Option<Sender<IoJob>>,
    outcomes: Receiver<IoOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl IoWorker {
    pub fn spawn(store: FileStore) -> Result<Self, SaveError> {
        let (job_tx, job_rx) = mpsc::channel::<IoJob>();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("save-io".to_string())
            .spawn(move || {
                for job in job_rx {
                    let outcome = match job {
                        IoJob::Write { slot, bytes } => IoOutcome::Written {
                            slot,
                            result: store.write(slot, &bytes),
                        },
                        IoJob::Read { slot } => IoOutcome::Read {
                            slot,
                            result: store.read(slot),
                        },
                    };
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
                debug!("Save I/O worker exiting");
            })?;

        Ok(IoWorker {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, job: IoJob) -> Result<(), SaveError> {
        self.jobs
            .as_ref()
            .ok_or_else(worker_gone)?
            .send(job)
            .map_err(|_| worker_gone())
    }

    /// Non-blocking check for a finished job
    pub fn try_outcome(&self) -> Result<Option<IoOutcome>, SaveError> {
        match self.outcomes.try_recv() {
            Ok(outcome) => Ok(Some(outcome)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(worker_gone()),
        }
    }

    /// Blocks until the submitted job finishes
    pub fn wait_outcome(&self) -> Result<IoOutcome, SaveError> {
        self.outcomes.recv().map_err(|_| worker_gone())
    }
}

impl Drop for IoWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_gone() -> SaveError {
    SaveError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "save I/O worker is not running",
    ))
}
