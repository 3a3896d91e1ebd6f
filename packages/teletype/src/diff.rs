use tracing::trace;

use crate::directive::Directive;
use crate::surface::{Region, Surface};
use crate::typist::{TypeOutcome, Typist};

/// One construction update from the server. `text` is cumulative, the full
/// text constructed so far, not a delta.
#[derive(Clone, Debug, PartialEq)]
pub struct TextUpdate {
    pub text: String,
    /// Display label for the source book, already formatted.
    pub book: String,
    /// Display label for the order of approximation, already formatted.
    pub order: String,
    /// Set on the final update of a construction run.
    pub finished: bool,
}

/// Render the part of `update.text` that has not been shown yet.
///
/// The book and order labels refresh on every update. New characters are
/// typed only when the incoming text is strictly longer than what is
/// already rendered, measured in characters; stale or duplicate updates
/// leave the typed text untouched. On a completed pass `rendered` is
/// replaced with the update's full text; an aborted pass leaves it alone.
pub async fn render_update(
    rendered: &mut String,
    update: &TextUpdate,
    typist: &Typist,
    surface: &dyn Surface,
) -> TypeOutcome {
    surface.set_region(Region::Book, &update.book);
    surface.set_region(Region::Order, &update.order);

    let shown = rendered.chars().count();
    if update.text.chars().count() <= shown {
        trace!(shown, "update is not longer than the rendered text, skipping");
        return TypeOutcome::Completed;
    }

    let steps: Vec<Directive> = update
        .text
        .chars()
        .skip(shown)
        .map(Directive::from_char)
        .collect();
    match typist.type_out(&steps, surface).await {
        TypeOutcome::Completed => {
            rendered.clear();
            rendered.push_str(&update.text);
            TypeOutcome::Completed
        }
        TypeOutcome::Stopped => TypeOutcome::Stopped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    fn update(text: &str, finished: bool) -> TextUpdate {
        TextUpdate {
            text: text.to_string(),
            book: "Book 7".to_string(),
            order: "Order 2".to_string(),
            finished,
        }
    }

    fn typist(stopped: bool) -> Typist {
        Typist::new(Duration::ZERO, Arc::new(AtomicBool::new(stopped)))
    }

    #[tokio::test]
    async fn renders_only_the_suffix() {
        let surface = MemorySurface::new();
        let mut rendered = "ab".to_string();
        let outcome =
            render_update(&mut rendered, &update("abc", false), &typist(false), &surface).await;
        assert_eq!(outcome, TypeOutcome::Completed);
        // Only the one new character is typed; "ab" is already on screen.
        assert_eq!(surface.text(), "c");
        assert_eq!(rendered, "abc");
    }

    #[tokio::test]
    async fn equal_text_changes_nothing_but_labels() {
        let surface = MemorySurface::new();
        let mut rendered = "abc".to_string();
        let outcome =
            render_update(&mut rendered, &update("abc", false), &typist(false), &surface).await;
        assert_eq!(outcome, TypeOutcome::Completed);
        assert_eq!(surface.text(), "");
        assert_eq!(rendered, "abc");
        assert_eq!(surface.region(Region::Book), Some("Book 7".to_string()));
        assert_eq!(surface.region(Region::Order), Some("Order 2".to_string()));
    }

    #[tokio::test]
    async fn shorter_text_is_ignored() {
        let surface = MemorySurface::new();
        let mut rendered = "abcdef".to_string();
        let outcome =
            render_update(&mut rendered, &update("abc", false), &typist(false), &surface).await;
        assert_eq!(outcome, TypeOutcome::Completed);
        assert_eq!(surface.text(), "");
        assert_eq!(rendered, "abcdef");
    }

    #[tokio::test]
    async fn suffix_boundary_counts_characters_not_bytes() {
        let surface = MemorySurface::new();
        let mut rendered = "héllo".to_string();
        render_update(&mut rendered, &update("héllo!", false), &typist(false), &surface).await;
        assert_eq!(surface.text(), "!");
        assert_eq!(rendered, "héllo!");
    }

    #[tokio::test]
    async fn sentinels_in_the_suffix_become_breaks() {
        let surface = MemorySurface::new();
        let mut rendered = String::new();
        render_update(&mut rendered, &update("a<<b", true), &typist(false), &surface).await;
        assert_eq!(surface.text(), "a\n\nb");
    }

    #[tokio::test]
    async fn aborted_pass_leaves_rendered_state_alone() {
        let surface = MemorySurface::new();
        let mut rendered = "a".to_string();
        let outcome =
            render_update(&mut rendered, &update("abc", false), &typist(true), &surface).await;
        assert_eq!(outcome, TypeOutcome::Stopped);
        assert_eq!(rendered, "a");
        // Labels still refreshed before the abort.
        assert_eq!(surface.region(Region::Book), Some("Book 7".to_string()));
    }
}
