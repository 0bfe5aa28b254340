//! Counter reads on a dedicated worker thread, bounded by a per-tick timeout.
//!
//! The sampler must keep its cadence and answer `stop()` even when a counter
//! file blocks (hung NFS mount, stuck sysfs driver). Each request carries a
//! sequence number; a reply that arrives after its tick gave up is discarded.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::collector::{CounterSource, RawReadings};
use crate::config::CounterFamilies;

struct Reply {
    seq: u64,
    at: Instant,
    readings: RawReadings,
}

/// Handle to the reader thread.
///
/// Dropping it closes the request channel; the thread exits after its current
/// read. It is never joined, since that read may be the one that hangs.
pub struct ReadWorker {
    requests: Sender<u64>,
    replies: Receiver<Reply>,
    next_seq: u64,
}

impl ReadWorker {
    pub fn spawn(
        mut source: Box<dyn CounterSource + Send>,
        families: CounterFamilies,
    ) -> io::Result<Self> {
        let (req_tx, req_rx) = mpsc::channel::<u64>();
        let (reply_tx, reply_rx) = mpsc::channel();

        thread::Builder::new()
            .name("perfctx-reader".into())
            .spawn(move || {
                while let Ok(mut seq) = req_rx.recv() {
                    // Coalesce requests that queued up behind a slow read.
                    while let Ok(newer) = req_rx.try_recv() {
                        seq = newer;
                    }
                    let readings = RawReadings::read_all(source.as_mut(), &families);
                    let reply = Reply {
                        seq,
                        at: Instant::now(),
                        readings,
                    };
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                debug!("reader thread exiting");
            })?;

        Ok(Self {
            requests: req_tx,
            replies: reply_rx,
            next_seq: 0,
        })
    }

    /// Requests one reading of every family and waits up to `timeout`.
    ///
    /// Returns the readings and the instant they were taken, or `None` on
    /// timeout or if the reader thread is gone.
    pub fn read(&mut self, timeout: Duration) -> Option<(Instant, RawReadings)> {
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.requests.send(seq).is_err() {
            error!("reader thread is gone");
            return None;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok(reply) if reply.seq == seq => return Some((reply.at, reply.readings)),
                Ok(reply) => {
                    debug!(stale = reply.seq, current = seq, "discarding late counter reply");
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => {
                    error!("reader thread terminated unexpectedly");
                    return None;
                }
            }
        }
    }
}
