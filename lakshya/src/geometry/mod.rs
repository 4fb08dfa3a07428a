//! Pixel-to-world coordinate resolution.
//!
//! - [`transform`]: apply live frame transforms to 3D points
//! - [`coordinates`]: turn an observation into a world-frame object pose

pub mod coordinates;
pub mod transform;

pub use coordinates::{CoordinateResolver, FrameIds};
pub use transform::{apply_transform, resolve};
