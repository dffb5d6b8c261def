//! Background tracking thread.
//!
//! The worker owns a started tracker and its trackables. Frames go in over
//! a bounded channel, one [`FrameResult`] per frame comes back.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::trackable::{Trackable, TrackableSnapshot};
use crate::tracker::{AnyTracker, Frame, Tracker};
use crate::TrackError;

/// Poses of every trackable after one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub index: u64,
    pub trackables: Vec<TrackableSnapshot>,
}

type Outcome = Result<FrameResult, TrackError>;

pub struct TrackingWorker {
    frames: Option<Sender<Frame>>,
    results: Receiver<Outcome>,
    handle: Option<JoinHandle<()>>,
}

impl TrackingWorker {
    /// Move `tracker` and `trackables` onto a new thread. The tracker must
    /// already be running; `capacity` bounds both queues.
    pub fn spawn(
        mut tracker: AnyTracker,
        mut trackables: Vec<Trackable>,
        capacity: usize,
    ) -> Result<Self, TrackError> {
        if !tracker.is_running() {
            return Err(TrackError::NotRunning);
        }
        let (frame_tx, frame_rx) = bounded::<Frame>(capacity.max(1));
        let (result_tx, result_rx) = bounded::<Outcome>(capacity.max(1));

        let handle = thread::spawn(move || {
            info!("tracking worker started with {} trackables", trackables.len());
            for frame in frame_rx {
                let outcome = tracker
                    .update(&frame, &mut trackables)
                    .map(|()| FrameResult {
                        index: frame.index,
                        trackables: trackables.iter().map(Trackable::snapshot).collect(),
                    });
                if result_tx.send(outcome).is_err() {
                    warn!("result receiver dropped, stopping tracking worker");
                    break;
                }
            }
            tracker.stop();
            info!("tracking worker stopped");
        });

        Ok(Self {
            frames: Some(frame_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    /// Queue a frame, blocking while the queue is full.
    pub fn submit(&self, frame: Frame) -> Result<(), TrackError> {
        self.frames
            .as_ref()
            .ok_or(TrackError::WorkerStopped)?
            .send(frame)
            .map_err(|_| TrackError::WorkerStopped)
    }

    /// Block until the next frame result is available.
    pub fn recv(&self) -> Result<FrameResult, TrackError> {
        self.results.recv().map_err(|_| TrackError::WorkerStopped)?
    }

    /// Next frame result if one is ready.
    pub fn try_recv(&self) -> Option<Result<FrameResult, TrackError>> {
        match self.results.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TrackError::WorkerStopped)),
        }
    }

    /// Close the frame queue and wait for the thread to finish the frames
    /// already queued. Results not yet received are discarded.
    pub fn shutdown(&mut self) {
        self.frames.take();
        if let Some(handle) = self.handle.take() {
            // The channel disconnects once the thread drops its sender.
            while self.results.recv().is_ok() {}
            if handle.join().is_err() {
                warn!("tracking worker panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TrackingWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
