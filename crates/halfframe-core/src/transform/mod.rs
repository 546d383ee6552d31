//! Color transforms: matrix, 3D LUT, LUT storage and atlas baking.

pub mod atlas;
pub mod evaluate;
pub mod lut;
pub mod matrix;
pub mod store;

pub use atlas::LutAtlas;
pub use evaluate::ColorTransform;
pub use lut::Lut3D;
pub use matrix::ColorMatrix;
pub use store::LutStore;
