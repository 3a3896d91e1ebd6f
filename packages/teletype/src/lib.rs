mod diff;
mod directive;
mod sequencer;
mod surface;
mod typist;

pub use diff::{TextUpdate, render_update};
pub use directive::{BREAK_SENTINEL, Directive, directives};
pub use sequencer::RenderQueue;
pub use surface::{MemorySurface, Region, Surface, TerminalSurface};
pub use typist::{DEFAULT_PACE, TypeOutcome, Typist};
