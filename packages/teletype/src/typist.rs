use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::directive::Directive;
use crate::surface::Surface;

/// Pacing interval between characters, matching the classic teletype feel.
pub const DEFAULT_PACE: Duration = Duration::from_millis(20);

/// How a typing pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeOutcome {
    /// Every directive was rendered.
    Completed,
    /// A stop request was observed; the remaining directives were dropped.
    Stopped,
}

/// Renders directives one at a time, pausing between each so text appears
/// to be typed rather than pasted.
pub struct Typist {
    pace: Duration,
    stop: Arc<AtomicBool>,
}

impl Typist {
    pub fn new(pace: Duration, stop: Arc<AtomicBool>) -> Self {
        Self { pace, stop }
    }

    /// True once a stop has been requested for this run.
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Append `steps` to the surface one directive at a time.
    ///
    /// The stop flag is polled once per directive, before it is emitted, so
    /// at most one character can land after a concurrent stop request.
    pub async fn type_out(&self, steps: &[Directive], surface: &dyn Surface) -> TypeOutcome {
        for step in steps {
            if self.stop_requested() {
                return TypeOutcome::Stopped;
            }
            match step {
                Directive::Glyph(ch) => surface.put_char(*ch),
                Directive::Break => surface.line_break(),
            }
            tokio::time::sleep(self.pace).await;
        }
        TypeOutcome::Completed
    }
}
