use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tracing::{debug, info, warn};

use teletype::{Region, RenderQueue, Surface, Typist};

use crate::config::ServerEndpoint;
use crate::dispatch::{ReadContext, Routed, dispatch_frame};
use crate::link::{ClientError, Link, LinkState};
use crate::protocol::{ReadingForm, StopRequest};
use crate::session::SessionStore;

/// How long the cleanup notification may take before shutdown proceeds
/// without it.
const BEACON_TIMEOUT: Duration = Duration::from_secs(3);

const UNREACHABLE_NOTICE: &str = "Could not reach the construction server.";
const CONNECTION_LOST_NOTICE: &str = "Connection to the construction server was lost.";

/// How a read session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The final update was rendered to completion.
    Finished,
    /// The user stopped the read; a stop control frame was sent while the
    /// connection was still open.
    Stopped,
    /// The connection ended before the construction finished (server
    /// notice or transport drop).
    Closed,
}

/// Owns everything one reader session needs: the endpoint, the display
/// surface, the durable session identifier, and the single live
/// connection. `submit` holds `&mut self` for the whole read, so two
/// connections can never be open at once.
pub struct BookClient {
    endpoint: ServerEndpoint,
    surface: Arc<dyn Surface>,
    store: SessionStore,
    pace: Duration,
    session_id: Option<String>,
    state: LinkState,
}

impl BookClient {
    pub fn new(
        endpoint: ServerEndpoint,
        surface: Arc<dyn Surface>,
        store: SessionStore,
        pace: Duration,
    ) -> Self {
        let session_id = store.load();
        Self {
            endpoint,
            surface,
            store,
            pace,
            session_id,
            state: LinkState::Idle,
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Submit the form and render the resulting stream until it finishes,
    /// the user stops it, or the connection drops.
    ///
    /// Every submission starts fresh: the surface is cleared and a new
    /// stop flag and render queue are created, so jobs left over from a
    /// previous read can never run under this one. `stop_rx` delivers
    /// user stop requests (Ctrl-C in the binary).
    pub async fn submit(
        &mut self,
        form: ReadingForm,
        stop_rx: &mut mpsc::Receiver<()>,
    ) -> Result<ReadOutcome, ClientError> {
        self.surface.set_submit_enabled(false);
        self.surface.clear();

        let stop = Arc::new(AtomicBool::new(false));
        let typist = Typist::new(self.pace, stop.clone());
        let queue = RenderQueue::spawn(typist, self.surface.clone());

        self.state = LinkState::Connecting;
        let mut link = match Link::open(&self.endpoint.ws_url(), &form).await {
            Ok(link) => link,
            Err(e) => {
                self.state = LinkState::Closed;
                self.surface.set_region(Region::Status, UNREACHABLE_NOTICE);
                self.surface.set_submit_enabled(true);
                queue.drain().await;
                return Err(e);
            }
        };
        self.state = LinkState::Open;

        let mut saw_finished = false;
        let mut stopped = false;

        loop {
            tokio::select! {
                msg = link.read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            let mut ctx = ReadContext {
                                surface: self.surface.as_ref(),
                                queue: &queue,
                                store: &self.store,
                                session_id: &mut self.session_id,
                            };
                            if let Routed::Queued { finished: true } =
                                dispatch_frame(&mut ctx, &text)
                            {
                                saw_finished = true;
                            }
                        }
                        Some(Ok(tungstenite::Message::Close(_))) | None => {
                            debug!("server closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "transport error");
                            self.surface.set_region(Region::Status, CONNECTION_LOST_NOTICE);
                            break;
                        }
                    }
                }
                Some(()) = stop_rx.recv() => {
                    info!("stop requested");
                    stop.store(true, Ordering::Relaxed);
                    if let Err(e) = link.send_json(&StopRequest::new()).await {
                        warn!(error = %e, "failed to send stop control frame");
                    }
                    stopped = true;
                    break;
                }
            }
        }

        link.close().await;
        self.state = LinkState::Closed;

        // Rendering can outlive the connection, so keep honoring stop
        // requests while the queue drains.
        {
            let drain = queue.drain();
            tokio::pin!(drain);
            loop {
                tokio::select! {
                    _ = &mut drain => break,
                    Some(()) = stop_rx.recv() => {
                        info!("stop requested during final rendering");
                        stop.store(true, Ordering::Relaxed);
                        stopped = true;
                    }
                }
            }
        }

        if stopped {
            self.surface.set_submit_enabled(true);
            return Ok(ReadOutcome::Stopped);
        }
        if saw_finished {
            // The render worker re-enabled the submit control when the
            // finished job completed.
            Ok(ReadOutcome::Finished)
        } else {
            self.surface.set_submit_enabled(true);
            Ok(ReadOutcome::Closed)
        }
    }

    /// Tear down and send the cleanup notification, the way the page fires
    /// a beacon on unload.
    pub async fn shutdown(self) {
        send_reset_beacon(&self.endpoint, self.session_id.as_deref()).await;
    }
}

/// Fire-and-forget `POST /reset_words`. Tagged with the session identifier
/// when one is known; errors are logged and swallowed, and the bounded
/// timeout keeps process exit from hanging on a dead server.
pub async fn send_reset_beacon(endpoint: &ServerEndpoint, session_id: Option<&str>) {
    let url = endpoint.reset_url();
    let client = match reqwest::Client::builder().timeout(BEACON_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "could not build http client for cleanup notification");
            return;
        }
    };
    let request = match session_id {
        Some(id) => client.post(&url).form(&[("session_id", id)]),
        None => client.post(&url),
    };
    match request.send().await {
        Ok(resp) => debug!(status = %resp.status(), "cleanup notification delivered"),
        Err(e) => debug!(error = %e, "cleanup notification failed"),
    }
}
