//! Framework-agnostic fallback navigator
//!
//! Emulates the reader: press the configured keys and watch the document
//! for changes. The deck is over once no key press changes anything.

use std::time::Duration;

use async_trait::async_trait;

use super::navigator::{Capabilities, Navigator};
use crate::error::Result;

/// Interactive surface driven by [`GenericNavigator`]
#[async_trait]
pub trait KeyboardSurface: Send {
    /// Start observing document mutations
    async fn observe_mutations(&mut self) -> Result<()>;

    async fn press_key(&mut self, key: &str) -> Result<()>;

    /// Whether the document changed since the previous call
    async fn take_mutations(&mut self) -> Result<bool>;

    /// Fragment of the current location, without the leading `#` or `#/`
    async fn location_fragment(&mut self) -> Result<Option<String>>;
}

pub struct GenericNavigator<S> {
    surface: S,
    keys: Vec<String>,
    settle: Duration,
    max_slides: Option<u32>,
    current_slide: u32,
}

impl<S: KeyboardSurface> GenericNavigator<S> {
    pub const NAME: &'static str = "generic";

    pub fn new(surface: S) -> Self {
        Self {
            surface,
            keys: vec!["ArrowRight".to_string()],
            settle: Duration::from_millis(1000),
            max_slides: None,
            current_slide: 1,
        }
    }

    /// Keys tried in order to reach the next slide
    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        if !keys.is_empty() {
            self.keys = keys;
        }
        self
    }

    /// Time given to the document to react to a key press
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_max_slides(mut self, max_slides: Option<u32>) -> Self {
        self.max_slides = max_slides;
        self
    }
}

#[async_trait]
impl<S: KeyboardSurface> Navigator for GenericNavigator<S> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            configure: true,
            preferred_viewport: false,
            has_next_slide: true,
        }
    }

    async fn is_compatible(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn configure(&mut self) -> Result<()> {
        self.surface.observe_mutations().await
    }

    async fn slide_count(&mut self) -> Result<Option<u32>> {
        Ok(None)
    }

    // The next slide can only be detected a posteriori, by pressing keys.
    // TODO: detect cycles in loopable decks, which never stop mutating
    async fn has_next_slide(&mut self) -> Result<bool> {
        if self.max_slides.is_some_and(|max| self.current_slide >= max) {
            return Ok(false);
        }
        for key in &self.keys {
            self.surface.take_mutations().await?;
            self.surface.press_key(key).await?;
            tokio::time::sleep(self.settle).await;
            if self.surface.take_mutations().await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn advance(&mut self) -> Result<()> {
        self.current_slide += 1;
        Ok(())
    }

    async fn current_slide_label(&mut self) -> Result<String> {
        Ok(self
            .surface
            .location_fragment()
            .await?
            .filter(|fragment| !fragment.is_empty())
            .unwrap_or_else(|| self.current_slide.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A deck of `slides` slides that mutates on every ArrowRight until the end
    struct Deck {
        slides: u32,
        shown: u32,
        mutated: bool,
        pressed: Vec<String>,
    }

    impl Deck {
        fn new(slides: u32) -> Self {
            Self { slides, shown: 1, mutated: false, pressed: Vec::new() }
        }
    }

    #[async_trait]
    impl KeyboardSurface for Deck {
        async fn observe_mutations(&mut self) -> Result<()> {
            Ok(())
        }

        async fn press_key(&mut self, key: &str) -> Result<()> {
            self.pressed.push(key.to_string());
            if key == "ArrowRight" && self.shown < self.slides {
                self.shown += 1;
                self.mutated = true;
            }
            Ok(())
        }

        async fn take_mutations(&mut self) -> Result<bool> {
            Ok(std::mem::take(&mut self.mutated))
        }

        async fn location_fragment(&mut self) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_detects_end_of_deck() {
        let mut navigator = GenericNavigator::new(Deck::new(3)).with_settle(Duration::ZERO);

        let mut visited = 1;
        while navigator.has_next_slide().await.unwrap() {
            navigator.advance().await.unwrap();
            visited += 1;
        }
        assert_eq!(visited, 3);
        assert_eq!(navigator.current_slide_label().await.unwrap(), "3");
    }

    #[tokio::test]
    async fn test_tries_every_key_before_giving_up() {
        let mut navigator = GenericNavigator::new(Deck::new(1))
            .with_keys(vec!["Space".to_string(), "ArrowRight".to_string()])
            .with_settle(Duration::ZERO);

        assert!(!navigator.has_next_slide().await.unwrap());
        assert_eq!(navigator.surface.pressed, vec!["Space", "ArrowRight"]);
    }

    #[tokio::test]
    async fn test_max_slides_stops_without_pressing() {
        let mut navigator = GenericNavigator::new(Deck::new(10))
            .with_settle(Duration::ZERO)
            .with_max_slides(Some(1));

        assert!(!navigator.has_next_slide().await.unwrap());
        assert!(navigator.surface.pressed.is_empty());
    }
}
