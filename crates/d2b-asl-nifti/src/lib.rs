//! NIfTI image support for d2b-asl
//!
//! Only the parts of the format that ASL post-processing needs are
//! implemented: header parsing for NIfTI-1 and NIfTI-2 (either byte order),
//! volume counting, and dropping volumes along the fourth dimension. Voxel
//! data is never decoded; volumes are moved around as raw bytes so images
//! round-trip exactly.

pub mod datatype;
pub mod errors;
pub mod header;
pub mod image;

pub use datatype::DataType;
pub use errors::NiftiError;
pub use header::{Endianness, NiftiHeader, NiftiVersion};
pub use image::NiftiImage;
