use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

use super::sweeper::RetentionSweeper;

/// Background thread running an aged sweep every `interval`.
/// Stops when dropped.
pub struct SweepScheduler {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SweepScheduler {
    pub fn spawn(sweeper: Arc<RetentionSweeper>, interval: Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("retention-sweeper".to_string())
            .spawn(move || {
                debug!("Retention sweeper running every {:?}", interval);
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            sweeper.sweep_aged();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Retention sweeper stopped");
            })?;
        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Parks the caller on the scheduler thread, which only exits on panic.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Retention sweeper thread panicked");
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Retention sweeper thread panicked");
            }
        }
    }
}

impl Drop for SweepScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
