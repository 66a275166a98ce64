//! FIFO carrying captured frames from the audio callback to the consumer thread.
//!
//! This is the only structure shared between the two threads. Enqueue never
//! blocks; dequeue waits at most the given timeout.

use crate::pipeline::types::{AudioFrame, QueueItem};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// What happens when frames pile up faster than the consumer drains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Never drop on enqueue. Only the consumer's staleness purge bounds latency.
    #[default]
    Unbounded,
    /// Keep at most `max_frames` frames queued, discarding the oldest first.
    DropOldest { max_frames: usize },
}

impl OverflowPolicy {
    /// Zero means unbounded.
    pub fn from_max_frames(max_frames: usize) -> Self {
        if max_frames == 0 {
            Self::Unbounded
        } else {
            Self::DropOldest { max_frames }
        }
    }
}

/// Result of a single dequeue attempt.
#[derive(Debug)]
pub enum Dequeued {
    Frame(AudioFrame),
    /// Shutdown marker.
    Sentinel,
    /// Nothing arrived within the timeout.
    Timeout,
}

/// Cloneable handle to the frame queue.
#[derive(Debug, Clone)]
pub struct FrameQueue {
    tx: Sender<QueueItem>,
    rx: Receiver<QueueItem>,
    policy: OverflowPolicy,
    closed: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl FrameQueue {
    pub fn new(policy: OverflowPolicy) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            policy,
            closed: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(OverflowPolicy::Unbounded)
    }

    /// Pushes a frame without blocking.
    ///
    /// Returns `false` if the queue was already closed; the frame is discarded.
    pub fn enqueue(&self, frame: AudioFrame) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        if let OverflowPolicy::DropOldest { max_frames } = self.policy {
            while self.tx.len() >= max_frames {
                match self.rx.try_recv() {
                    Ok(QueueItem::Frame(_)) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(QueueItem::Sentinel) => {
                        // Closed while we were trimming; the sentinel stays last.
                        self.tx.send(QueueItem::Sentinel).unwrap_or_default();
                        return false;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }

        self.tx.send(QueueItem::Frame(frame)).is_ok()
    }

    /// Enqueues the sentinel. Only the first call has any effect.
    ///
    /// Returns `true` if this call closed the queue.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tx.send(QueueItem::Sentinel).is_ok()
    }

    /// Waits up to `timeout` for the next entry.
    pub fn dequeue(&self, timeout: Duration) -> Dequeued {
        match self.rx.recv_timeout(timeout) {
            Ok(QueueItem::Frame(frame)) => Dequeued::Frame(frame),
            Ok(QueueItem::Sentinel) => Dequeued::Sentinel,
            Err(RecvTimeoutError::Timeout) => Dequeued::Timeout,
            // The queue owns a sender, so this only fires if that changes.
            Err(RecvTimeoutError::Disconnected) => Dequeued::Sentinel,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Entries currently waiting, sentinel included.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Frames discarded by the overflow policy so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}
