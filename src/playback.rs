//! Replay of already-rendered slides
//!
//! A navigator and renderer pair over a list of one-page PDF files, one file
//! per slide. Both halves share the current position, so advancing the
//! navigator changes what the renderer prints.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::{Document, Object};

use crate::error::{Error, Result};
use crate::export::navigator::{Capabilities, Navigator};
use crate::export::options::{ImageFormat, ViewportSize};
use crate::export::renderer::PageRenderer;
use crate::pdf::graph;

/// Build a navigator and renderer replaying `slides` in order
pub fn playback(slides: Vec<PathBuf>) -> (PlaybackNavigator, PlaybackRenderer) {
    let position = Arc::new(AtomicUsize::new(0));
    (
        PlaybackNavigator {
            slides: slides.clone(),
            position: Arc::clone(&position),
        },
        PlaybackRenderer {
            slides,
            position,
            viewport: None,
        },
    )
}

pub struct PlaybackNavigator {
    slides: Vec<PathBuf>,
    position: Arc<AtomicUsize>,
}

impl PlaybackNavigator {
    fn current(&self) -> Result<&Path> {
        let index = self.position.load(Ordering::SeqCst);
        self.slides
            .get(index)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::Navigation {
                navigator: "playback".to_string(),
                message: format!("no slide at position {}", index + 1),
            })
    }
}

#[async_trait]
impl Navigator for PlaybackNavigator {
    fn name(&self) -> &str {
        "playback"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            preferred_viewport: true,
            ..Capabilities::default()
        }
    }

    async fn is_compatible(&mut self) -> Result<bool> {
        Ok(!self.slides.is_empty())
    }

    /// Size of the first slide's media box
    async fn preferred_viewport_size(&mut self) -> Result<Option<ViewportSize>> {
        match self.slides.first() {
            Some(path) => media_box_size(path),
            None => Ok(None),
        }
    }

    async fn slide_count(&mut self) -> Result<Option<u32>> {
        Ok(Some(self.slides.len() as u32))
    }

    async fn advance(&mut self) -> Result<()> {
        let next = self.position.load(Ordering::SeqCst) + 1;
        if next >= self.slides.len() {
            return Err(Error::Navigation {
                navigator: "playback".to_string(),
                message: "already at the last slide".to_string(),
            });
        }
        self.position.store(next, Ordering::SeqCst);
        Ok(())
    }

    async fn current_slide_label(&mut self) -> Result<String> {
        let path = self.current()?;
        Ok(path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| (self.position.load(Ordering::SeqCst) + 1).to_string()))
    }
}

pub struct PlaybackRenderer {
    slides: Vec<PathBuf>,
    position: Arc<AtomicUsize>,
    viewport: Option<ViewportSize>,
}

impl PlaybackRenderer {
    /// Last viewport requested by the driver
    pub fn viewport(&self) -> Option<ViewportSize> {
        self.viewport
    }

    fn current(&self) -> Result<&Path> {
        let index = self.position.load(Ordering::SeqCst);
        self.slides
            .get(index)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::Render(format!("no slide at position {}", index + 1)))
    }
}

#[async_trait]
impl PageRenderer for PlaybackRenderer {
    async fn render_pdf(&mut self, _size: ViewportSize) -> Result<Vec<u8>> {
        let path = self.current()?;
        log::debug!("Replaying {}", path.display());
        Ok(fs::read(path)?)
    }

    async fn render_raster(&mut self, _size: ViewportSize, _format: ImageFormat) -> Result<Vec<u8>> {
        Err(Error::Render("replayed slides cannot be rasterized".to_string()))
    }

    async fn set_viewport(&mut self, size: ViewportSize) -> Result<()> {
        self.viewport = Some(size);
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let path = self.current()?;
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(format!("file://{}", path.display()))
    }
}

/// Width and height of the first page's media box, in points
fn media_box_size(path: &Path) -> Result<Option<ViewportSize>> {
    let doc = Document::load(path)?;
    let Some(page_id) = doc.get_pages().values().next().copied() else {
        return Ok(None);
    };
    let page = graph::object_dict(&doc, page_id)?;
    let media_box = match page.get(b"MediaBox") {
        Ok(media_box) => Some(media_box.clone()),
        Err(_) => graph::inherited_attribute(&doc, page, b"MediaBox")?,
    };
    let Some(media_box) = media_box else {
        return Ok(None);
    };

    let Object::Array(bounds) = graph::resolve(&doc, &media_box)? else {
        return Ok(None);
    };
    let numbers: Vec<f64> = bounds
        .iter()
        .filter_map(|value| match value {
            Object::Integer(n) => Some(*n as f64),
            Object::Real(n) => Some(*n as f64),
            _ => None,
        })
        .collect();
    let &[x1, y1, x2, y2] = numbers.as_slice() else {
        return Ok(None);
    };

    let width = (x2 - x1).abs().round() as u32;
    let height = (y2 - y1).abs().round() as u32;
    if width == 0 || height == 0 {
        return Ok(None);
    }
    Ok(Some(ViewportSize::new(width, height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Stream};
    use tempfile::TempDir;

    fn write_slide(dir: &TempDir, name: &str, width: i64) -> PathBuf {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let contents = doc.add_object(Stream::new(Dictionary::new(), name.as_bytes().to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(contents)),
        ]));
        doc.objects.insert(pages_id, Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(1)),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("MediaBox", Object::Array(vec![
                Object::Integer(0), Object::Integer(0), Object::Integer(width), Object::Real(540.0),
            ])),
        ])));
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let path = dir.path().join(format!("{name}.pdf"));
        doc.save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_navigator_and_renderer_share_position() {
        let dir = TempDir::new().unwrap();
        let slides = vec![write_slide(&dir, "intro", 960), write_slide(&dir, "outro", 960)];
        let (mut navigator, mut renderer) = playback(slides.clone());

        assert!(navigator.is_compatible().await.unwrap());
        assert_eq!(navigator.slide_count().await.unwrap(), Some(2));
        assert_eq!(navigator.current_slide_label().await.unwrap(), "intro");
        assert_eq!(renderer.render_pdf(ViewportSize::default()).await.unwrap(), fs::read(&slides[0]).unwrap());

        navigator.advance().await.unwrap();
        assert_eq!(navigator.current_slide_label().await.unwrap(), "outro");
        assert_eq!(renderer.render_pdf(ViewportSize::default()).await.unwrap(), fs::read(&slides[1]).unwrap());
        assert!(renderer.current_url().await.unwrap().starts_with("file://"));

        assert!(navigator.advance().await.is_err());
    }

    #[tokio::test]
    async fn test_preferred_size_from_inherited_media_box() {
        let dir = TempDir::new().unwrap();
        let (mut navigator, _) = playback(vec![write_slide(&dir, "wide", 960)]);
        assert_eq!(
            navigator.preferred_viewport_size().await.unwrap(),
            Some(ViewportSize::new(960, 540))
        );
    }

    #[tokio::test]
    async fn test_empty_playback_is_incompatible() {
        let (mut navigator, mut renderer) = playback(Vec::new());
        assert!(!navigator.is_compatible().await.unwrap());
        assert!(renderer.render_raster(ViewportSize::default(), ImageFormat::Png).await.is_err());
    }
}
