//! Asset loading and decoding: glTF models, textures, cube maps.
//! Everything here produces CPU-side data; uploads happen in the renderer.

pub mod cubemap;
pub mod loader;
pub mod mesh;
pub mod model;
pub mod texture;

pub use loader::{AssetLoader, LoadedAsset};
