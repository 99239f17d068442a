//! Texture resource definitions
//!
//! Textures are graph-owned and shared by handle; the optimizer never touches
//! pixel data, only identity, dimensions, and format.

use crate::foundation::collections::TypedHandle;

/// Typed handle to a texture stored in the scene graph
pub type TextureHandle = TypedHandle<Texture>;

/// Pixel formats tracked for the per-format statistics breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA
    Rgba8,
    /// 8-bit RGB
    Rgb8,
    /// 8-bit single channel
    Gray8,
}

impl Default for TextureFormat {
    fn default() -> Self {
        TextureFormat::Rgba8
    }
}

/// Texture resource shared between materials
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Display name for diagnostics
    pub name: String,
    /// URL or path the texture was loaded from, when known
    pub source_url: Option<String>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
}

impl Texture {
    /// Create a new texture record
    pub fn new(name: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            name: name.into(),
            source_url: None,
            width,
            height,
            format,
        }
    }

    /// Set the source URL the texture was loaded from
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Estimated GPU memory footprint, assuming 4 bytes per pixel
    pub fn estimated_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}
