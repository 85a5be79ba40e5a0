//! Navigator plugins and their selection
//!
//! A navigator knows how to detect, count and advance through one slide
//! framework. Optional operations are declared up front through
//! [`Capabilities`] and checked once when the run is configured.

use async_trait::async_trait;

use super::options::ViewportSize;
use crate::error::{Error, Result};

/// Optional operations a navigator implements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// [`Navigator::configure`] does one-time setup
    pub configure: bool,
    /// [`Navigator::preferred_viewport_size`] is meaningful
    pub preferred_viewport: bool,
    /// [`Navigator::has_next_slide`] is authoritative; otherwise the
    /// driver compares the current index with [`Navigator::slide_count`]
    pub has_next_slide: bool,
}

#[async_trait]
pub trait Navigator: Send {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Whether this navigator recognizes the loaded presentation
    async fn is_compatible(&mut self) -> Result<bool>;

    async fn configure(&mut self) -> Result<()> {
        Ok(())
    }

    async fn preferred_viewport_size(&mut self) -> Result<Option<ViewportSize>> {
        Ok(None)
    }

    /// Total number of slides, `None` when only discoverable by navigating
    async fn slide_count(&mut self) -> Result<Option<u32>>;

    /// Only called when [`Capabilities::has_next_slide`] is set
    async fn has_next_slide(&mut self) -> Result<bool> {
        Ok(false)
    }

    async fn advance(&mut self) -> Result<()>;

    /// Label of the current slide, for progress display
    async fn current_slide_label(&mut self) -> Result<String>;
}

/// Candidate navigators, asked in registration order
#[derive(Default)]
pub struct NavigatorRegistry {
    candidates: Vec<Box<dyn Navigator>>,
    fallback: Option<Box<dyn Navigator>>,
}

impl NavigatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, navigator: Box<dyn Navigator>) -> &mut Self {
        self.candidates.push(navigator);
        self
    }

    /// Navigator used when no candidate is compatible
    pub fn set_fallback(&mut self, navigator: Box<dyn Navigator>) -> &mut Self {
        self.fallback = Some(navigator);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .chain(self.fallback.iter())
            .map(|navigator| navigator.name())
            .collect()
    }

    /// First compatible candidate, else the fallback
    pub async fn select(self) -> Result<Box<dyn Navigator>> {
        for mut candidate in self.candidates {
            if candidate.is_compatible().await? {
                log::debug!("Selected {} navigator", candidate.name());
                return Ok(candidate);
            }
        }

        match self.fallback {
            Some(fallback) => {
                log::warn!(
                    "No supported presentation framework detected, falling back to the {} navigator",
                    fallback.name()
                );
                Ok(fallback)
            }
            None => Err(Error::NavigationIncompatible { navigator: None }),
        }
    }

    /// The navigator called `name` (case-insensitive), if it is compatible
    pub async fn select_named(self, name: &str) -> Result<Box<dyn Navigator>> {
        let chosen = self
            .candidates
            .into_iter()
            .chain(self.fallback)
            .find(|navigator| navigator.name().eq_ignore_ascii_case(name));

        if let Some(mut navigator) = chosen {
            if navigator.is_compatible().await? {
                return Ok(navigator);
            }
        }
        Err(Error::NavigationIncompatible { navigator: Some(name.to_string()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        compatible: bool,
    }

    #[async_trait]
    impl Navigator for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn is_compatible(&mut self) -> Result<bool> {
            Ok(self.compatible)
        }

        async fn slide_count(&mut self) -> Result<Option<u32>> {
            Ok(Some(1))
        }

        async fn advance(&mut self) -> Result<()> {
            Ok(())
        }

        async fn current_slide_label(&mut self) -> Result<String> {
            Ok("1".to_string())
        }
    }

    fn registry(fallback: bool) -> NavigatorRegistry {
        let mut registry = NavigatorRegistry::new();
        registry
            .register(Box::new(Fixed { name: "reveal", compatible: false }))
            .register(Box::new(Fixed { name: "remark", compatible: true }))
            .register(Box::new(Fixed { name: "shower", compatible: true }));
        if fallback {
            registry.set_fallback(Box::new(Fixed { name: "generic", compatible: true }));
        }
        registry
    }

    #[tokio::test]
    async fn test_first_compatible_wins() {
        let navigator = registry(true).select().await.unwrap();
        assert_eq!(navigator.name(), "remark");
    }

    #[tokio::test]
    async fn test_fallback_when_nothing_matches() {
        let mut registry = NavigatorRegistry::new();
        registry
            .register(Box::new(Fixed { name: "reveal", compatible: false }))
            .set_fallback(Box::new(Fixed { name: "generic", compatible: true }));
        assert_eq!(registry.names(), vec!["reveal", "generic"]);

        let navigator = registry.select().await.unwrap();
        assert_eq!(navigator.name(), "generic");
    }

    #[tokio::test]
    async fn test_no_fallback_is_incompatible() {
        let mut registry = NavigatorRegistry::new();
        registry.register(Box::new(Fixed { name: "reveal", compatible: false }));
        let err = registry.select().await.err().unwrap();
        assert!(matches!(err, Error::NavigationIncompatible { navigator: None }));
    }

    #[tokio::test]
    async fn test_select_named() {
        let navigator = registry(false).select_named("Shower").await.unwrap();
        assert_eq!(navigator.name(), "shower");

        let err = registry(false).select_named("reveal").await.err().unwrap();
        assert_eq!(err.to_string(), "Unable to activate the reveal navigator for this presentation");

        assert!(registry(false).select_named("impress").await.is_err());
    }
}
