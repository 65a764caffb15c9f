//! Background decode worker.
//!
//! High-resolution marker decoding is expensive enough to stutter the render
//! loop, so it can be offloaded to a dedicated thread. The hand-off is
//! bounded to one in-flight job: the frame buffer moves into the job message
//! (the sender gives up ownership), and while a decode is pending new
//! samples are dropped rather than queued, bounding worst-case latency
//! instead of memory.

use crate::marker_gate::{decode_with_flip_retry, MarkerDecoder, MarkerDetection};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error};
use std::thread::JoinHandle;

/// A decode job: an owned RGBA buffer and its dimensions.
struct DecodeJob {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

/// Result of one offloaded decode.
pub struct DecodeReply {
    /// Detection, if a marker was found in either orientation
    pub detection: Option<MarkerDetection>,
    /// Whether the flipped orientation was the one that succeeded
    pub used_flipped: bool,
    /// Dimensions of the decoded frame
    pub width: u32,
    /// Dimensions of the decoded frame
    pub height: u32,
}

/// Outcome of offering a job to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Job accepted; a reply will arrive via `try_recv`
    Accepted,
    /// A decode is already in flight; the sample was dropped
    Busy,
    /// The worker thread is gone
    Disconnected,
}

/// Owns the decode thread and its channels.
///
/// Dropping the worker shuts the thread down and joins it.
pub struct DecodeWorker {
    jobs: Sender<DecodeJob>,
    replies: Receiver<DecodeReply>,
    pending: bool,
    handle: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    /// Spawn a worker around its own decoder instance.
    pub fn spawn(decoder: Box<dyn MarkerDecoder>) -> crate::Result<Self> {
        let (job_tx, job_rx) = bounded::<DecodeJob>(1);
        let (reply_tx, reply_rx) = bounded::<DecodeReply>(1);

        let handle = std::thread::Builder::new()
            .name("marker-decode".to_string())
            .spawn(move || {
                for job in job_rx {
                    let outcome =
                        decode_with_flip_retry(&*decoder, &job.pixels, job.width, job.height);
                    let (detection, used_flipped) = match outcome {
                        Some((det, flipped)) => (Some(det), flipped),
                        None => (None, false),
                    };
                    let reply = DecodeReply {
                        detection,
                        used_flipped,
                        width: job.width,
                        height: job.height,
                    };
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                debug!("decode worker exiting");
            })
            .map_err(|e| crate::Error::Worker(format!("failed to spawn decode thread: {e}")))?;

        Ok(Self {
            jobs: job_tx,
            replies: reply_rx,
            pending: false,
            handle: Some(handle),
        })
    }

    /// Offer a frame for decoding. The buffer moves into the job.
    pub fn submit(&mut self, pixels: Vec<u8>, width: u32, height: u32) -> SubmitOutcome {
        if self.pending {
            return SubmitOutcome::Busy;
        }
        match self.jobs.try_send(DecodeJob { pixels, width, height }) {
            Ok(()) => {
                self.pending = true;
                SubmitOutcome::Accepted
            }
            Err(TrySendError::Full(_)) => SubmitOutcome::Busy,
            Err(TrySendError::Disconnected(_)) => SubmitOutcome::Disconnected,
        }
    }

    /// Fetch a completed decode, if one is ready.
    pub fn try_recv(&mut self) -> Option<DecodeReply> {
        match self.replies.try_recv() {
            Ok(reply) => {
                self.pending = false;
                Some(reply)
            }
            Err(_) => None,
        }
    }

    /// Whether a decode is currently in flight
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether the worker thread has terminated
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Shut the worker down and join the thread.
    pub fn terminate(&mut self) {
        let (dead_tx, _) = bounded(1);
        // Replacing the sender closes the job channel; the thread's loop ends.
        self.jobs = dead_tx;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("decode worker panicked during shutdown");
            }
        }
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}
