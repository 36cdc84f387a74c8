//! Core types: math re-exports, transforms, camera + orbit controls,
//! scene state, frame clock and loop, asset attachment, tunables.
//!
//! Nothing in here touches the GPU or the window; the renderer and the
//! platform shell plug in through [`frame::SceneRenderer`] and the
//! completion queue in [`loading`].

pub use glam::{EulerRot, Mat4, Quat, Vec3, vec3};

pub mod animation;
pub mod attach;
pub mod camera;
pub mod clock;
pub mod error;
pub mod frame;
pub mod loading;
pub mod orbit;
pub mod presets;
pub mod scene;
pub mod transform;
pub mod tunables;
pub mod viewport;

pub use error::{CoreError, CoreResult};
