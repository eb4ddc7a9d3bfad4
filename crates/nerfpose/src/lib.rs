#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use nerfpose_3d as k3d;

#[doc(inline)]
pub use nerfpose_colmap as colmap;

#[doc(inline)]
pub use nerfpose_dataset as dataset;

#[doc(inline)]
pub use nerfpose_pipeline as pipeline;

#[doc(inline)]
pub use nerfpose_validation as validation;
