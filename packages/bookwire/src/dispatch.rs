//! Inbound frame dispatcher.
//!
//! The wire carries no message-type tag; frames are classified by which
//! fields are present and routed in a fixed priority order (session
//! handshake, then construction update, then status notice). Slow work
//! (typing text out) goes through the render queue; everything else takes
//! effect immediately.

use teletype::{Region, RenderQueue, Surface, TextUpdate};
use tracing::{debug, warn};

use crate::protocol::ServerEvent;
use crate::session::SessionStore;

/// Per-read context handed to the dispatcher by the connection pump.
pub(crate) struct ReadContext<'a> {
    pub surface: &'a dyn Surface,
    pub queue: &'a RenderQueue,
    pub store: &'a SessionStore,
    /// In-memory mirror of the stored session identifier.
    pub session_id: &'a mut Option<String>,
}

/// Where an inbound frame ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Routed {
    /// Session handshake: identifier persisted, nothing rendered.
    Session,
    /// Construction update appended to the render queue.
    Queued { finished: bool },
    /// Status notice written straight to the surface.
    Notice,
    /// Malformed frame, logged and dropped.
    Dropped,
}

/// Classify one inbound text frame and route it.
pub(crate) fn dispatch_frame(ctx: &mut ReadContext<'_>, raw: &str) -> Routed {
    let event = match serde_json::from_str::<ServerEvent>(raw) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "dropping malformed server frame");
            return Routed::Dropped;
        }
    };

    match event {
        ServerEvent::Session { session_id } => {
            debug!(%session_id, "session identifier issued");
            ctx.store.save(&session_id);
            *ctx.session_id = Some(session_id);
            Routed::Session
        }
        ServerEvent::Construction {
            constructed_text,
            book,
            order,
            finished_constructing,
        } => {
            let update = TextUpdate {
                text: constructed_text,
                book: format!("Book {book}"),
                order: format!("Order {order}"),
                finished: finished_constructing,
            };
            ctx.queue.enqueue(update);
            Routed::Queued {
                finished: finished_constructing,
            }
        }
        ServerEvent::Notice { message } => {
            // Notices bypass the queue and may visually overtake an
            // in-flight render; the status region is separate from the
            // typed text, so that is acceptable.
            debug!(%message, "server notice");
            ctx.surface.set_region(Region::Status, &message);
            ctx.surface.set_submit_enabled(true);
            Routed::Notice
        }
    }
}
