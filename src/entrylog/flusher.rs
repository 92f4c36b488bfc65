//! Background flusher
//!
//! Owns the drain of one write cache into one entry log on a dedicated
//! thread. Requests arrive over a crossbeam channel; each carries its own
//! reply channel.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::cache::WriteCache;
use crate::channel::{BufferedChannel, FileStore};
use crate::error::{Result, StorageError};

use super::{flush_write_cache, FlushStats};

enum Command {
    Flush(Sender<Result<FlushStats>>),
    Shutdown(Sender<Result<FlushStats>>),
}

/// Handle to the flusher thread
pub struct Flusher {
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    /// Start the flusher thread
    pub fn spawn<S>(cache: Arc<WriteCache>, log: Arc<BufferedChannel<S>>) -> Result<Self>
    where
        S: FileStore + 'static,
    {
        let (commands, inbox) = unbounded();

        let handle = thread::Builder::new()
            .name("write-cache-flusher".to_string())
            .spawn(move || run(inbox, cache, log))?;

        info!("write cache flusher started");
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    /// Drain the cache now and wait for the result
    pub fn flush(&self) -> Result<FlushStats> {
        let (reply, result) = bounded(1);
        self.commands
            .send(Command::Flush(reply))
            .map_err(|_| StorageError::Closed("flusher"))?;
        result.recv().map_err(|_| StorageError::Closed("flusher"))?
    }

    /// Final drain, then stop the thread
    pub fn shutdown(mut self) -> Result<FlushStats> {
        self.stop()
    }

    fn stop(&mut self) -> Result<FlushStats> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Err(StorageError::Closed("flusher")),
        };

        let (reply, result) = bounded(1);
        let outcome = match self.commands.send(Command::Shutdown(reply)) {
            Ok(()) => result
                .recv()
                .unwrap_or_else(|_| Err(StorageError::Closed("flusher"))),
            Err(_) => Err(StorageError::Closed("flusher")),
        };

        if handle.join().is_err() {
            warn!("write cache flusher thread panicked");
        }
        outcome
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.stop() {
                warn!(error = %e, "final flush on drop failed");
            }
        }
    }
}

fn run<S: FileStore>(
    inbox: Receiver<Command>,
    cache: Arc<WriteCache>,
    log: Arc<BufferedChannel<S>>,
) {
    for command in inbox {
        match command {
            Command::Flush(reply) => {
                let outcome = flush_write_cache(&cache, &log);
                if let Err(e) = &outcome {
                    warn!(error = %e, "write cache flush failed");
                }
                // The requester may have given up waiting
                let _ = reply.send(outcome);
            }
            Command::Shutdown(reply) => {
                let outcome = flush_write_cache(&cache, &log);
                debug!("write cache flusher stopping");
                let _ = reply.send(outcome);
                return;
            }
        }
    }
}
