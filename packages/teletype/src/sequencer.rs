use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::diff::{TextUpdate, render_update};
use crate::surface::Surface;
use crate::typist::{TypeOutcome, Typist};

/// FIFO queue of pending render jobs with a single consumer task.
///
/// Construction updates arrive faster than they can be typed out, so they
/// are queued and rendered strictly in arrival order, one at a time. A
/// queue lives for exactly one submission; stopping or superseding the
/// submission tears the queue down and discards whatever is still waiting.
pub struct RenderQueue {
    tx: mpsc::UnboundedSender<TextUpdate>,
    worker: JoinHandle<()>,
}

impl RenderQueue {
    /// Spawn the consumer task. The worker owns the rendered-text state;
    /// nothing else can observe or mutate it.
    pub fn spawn(typist: Typist, surface: Arc<dyn Surface>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, typist, surface));
        Self { tx, worker }
    }

    /// Append a render job. Returns false if the consumer has already
    /// exited (after a stop) and the update was dropped.
    pub fn enqueue(&self, update: TextUpdate) -> bool {
        if self.tx.send(update).is_err() {
            warn!("render queue consumer is gone, dropping update");
            return false;
        }
        true
    }

    /// Close the queue and wait for the consumer to finish whatever is
    /// still queued. With the stop flag raised this returns promptly.
    pub async fn drain(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "render worker task failed");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<TextUpdate>,
    typist: Typist,
    surface: Arc<dyn Surface>,
) {
    // Longest text fully typed out so far in this submission.
    let mut rendered = String::new();
    while let Some(job) = rx.recv().await {
        let finished = job.finished;
        match render_update(&mut rendered, &job, &typist, surface.as_ref()).await {
            TypeOutcome::Completed => {
                if finished {
                    debug!(chars = rendered.chars().count(), "construction finished");
                    surface.set_submit_enabled(true);
                }
            }
            TypeOutcome::Stopped => {
                debug!("stop requested, discarding queued render jobs");
                break;
            }
        }
    }
}
