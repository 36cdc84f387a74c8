//! Six-face cube maps (px, nx, py, ny, pz, nz).

use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::texture::{ColorSpace, TextureData};

#[derive(Clone, Debug)]
pub struct CubemapData {
    /// Faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub faces: Vec<TextureData>,
    pub size: u32,
}

impl CubemapData {
    pub fn from_faces(faces: Vec<TextureData>) -> Result<Self> {
        if faces.len() != 6 {
            bail!("cube map needs 6 faces, got {}", faces.len());
        }
        let size = faces[0].width;
        for (i, f) in faces.iter().enumerate() {
            if f.width != f.height {
                bail!("cube face {i} is not square ({}x{})", f.width, f.height);
            }
            if f.width != size {
                bail!("cube face {i} is {}px, face 0 is {size}px", f.width);
            }
        }
        Ok(Self { faces, size })
    }

    /// Decode every face. sRGB, like the original color images.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        if paths.len() != 6 {
            bail!("cube map needs 6 face paths, got {}", paths.len());
        }
        let faces = paths
            .iter()
            .map(|p| TextureData::load(p, ColorSpace::Srgb))
            .collect::<Result<Vec<_>>>()?;
        Self::from_faces(faces)
    }

    /// Tightly packed layers for a single upload.
    pub fn layer_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.faces.iter().map(|f| f.data.len()).sum());
        for f in &self.faces {
            out.extend_from_slice(&f.data);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(size: u32, h: u32) -> TextureData {
        TextureData::from_rgba8(size, h, vec![0; (size * h * 4) as usize], ColorSpace::Srgb).unwrap()
    }

    #[test]
    fn six_equal_square_faces() {
        let c = CubemapData::from_faces((0..6).map(|_| face(8, 8)).collect()).unwrap();
        assert_eq!(c.size, 8);
        assert_eq!(c.layer_bytes().len(), 6 * 8 * 8 * 4);
    }

    #[test]
    fn rejects_bad_face_sets() {
        assert!(CubemapData::from_faces((0..5).map(|_| face(8, 8)).collect()).is_err());
        let mut faces: Vec<_> = (0..6).map(|_| face(8, 8)).collect();
        faces[3] = face(16, 16);
        assert!(CubemapData::from_faces(faces).is_err());
        let mut faces: Vec<_> = (0..6).map(|_| face(8, 8)).collect();
        faces[5] = face(8, 4);
        assert!(CubemapData::from_faces(faces).is_err());
    }

    #[test]
    fn load_fails_on_missing_face() {
        let paths: Vec<PathBuf> = (0..6).map(|i| format!("/nonexistent/{i}.png").into()).collect();
        assert!(CubemapData::load(&paths).is_err());
    }
}
