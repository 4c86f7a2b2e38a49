use std::io;
use thiserror::Error;

/// Errors that can occur while reading or editing a NIfTI image
#[derive(Error, Debug)]
pub enum NiftiError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Not a NIfTI file (sizeof_hdr = {0})")]
    NotNifti(i32),

    #[error("Unsupported NIfTI magic {0:?}; only single-file images (.nii) are supported")]
    InvalidMagic(String),

    #[error("File is truncated: expected at least {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Unsupported image dimensions: {0}")]
    UnsupportedDimensions(String),

    #[error("Unsupported NIfTI datatype code {0}")]
    UnsupportedDatatype(i16),

    #[error("Volume index {index} is out of range for an image with {volumes} volumes")]
    VolumeOutOfRange { index: usize, volumes: usize },

    #[error("At least one volume must be kept")]
    NoVolumesRetained,

    #[error("Data length mismatch: header describes {expected} bytes, got {actual}")]
    DataLength { expected: usize, actual: usize },
}
