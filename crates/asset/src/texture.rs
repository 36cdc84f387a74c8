//! Texture loading and data structures.
//! RGBA8 pixels plus the sampling settings the material wants.

use std::path::Path;

use anyhow::{Context, Result, bail};
use corelib::loading::TextureWrap;

/// How the stored bytes should be interpreted on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Per-texture wrap on both axes. How often a map tiles is a property of
/// the surface it is drawn on, not of the texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sampling {
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
}

impl Sampling {
    pub fn repeating() -> Self {
        Self {
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
        }
    }
}

impl From<TextureWrap> for Sampling {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::Clamp => Self::default(),
            TextureWrap::Repeat => Self::repeating(),
        }
    }
}

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    /// Tightly packed RGBA8 rows.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub sampling: Sampling,
}

impl TextureData {
    /// Wrap raw RGBA8 pixels; fails if the byte count does not match.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>, color_space: ColorSpace) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected || width == 0 || height == 0 {
            bail!(
                "RGBA8 data for {width}x{height} must be {expected} bytes, got {}",
                data.len()
            );
        }
        Ok(Self {
            data,
            width,
            height,
            color_space,
            sampling: Sampling::default(),
        })
    }

    /// Load and decode an image file (PNG or JPEG), expanding to RGBA8.
    pub fn load<P: AsRef<Path>>(path: P, color_space: ColorSpace) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Self::from_rgba8(width, height, data, color_space)
    }

    /// 1×1 texture of a single color, used while the real one is loading.
    pub fn solid(rgba: [u8; 4], color_space: ColorSpace) -> Self {
        Self {
            data: rgba.to_vec(),
            width: 1,
            height: 1,
            color_space,
            sampling: Sampling::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Bytes per row of the tightly packed data.
    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size = self.width as usize * self.height as usize * 4;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}
