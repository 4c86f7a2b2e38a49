use crate::errors::NiftiError;

/// Voxel datatypes from the NIfTI `datatype` header field.
///
/// `DT_BINARY` (1 bit per voxel) is not supported because volumes would not
/// start on byte boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    UInt8,
    Int16,
    Int32,
    Float32,
    Complex64,
    Float64,
    Rgb24,
    Int8,
    UInt16,
    UInt32,
    Int64,
    UInt64,
    Float128,
    Complex128,
    Complex256,
    Rgba32,
}

impl DataType {
    pub fn from_code(code: i16) -> Result<Self, NiftiError> {
        let datatype = match code {
            2 => DataType::UInt8,
            4 => DataType::Int16,
            8 => DataType::Int32,
            16 => DataType::Float32,
            32 => DataType::Complex64,
            64 => DataType::Float64,
            128 => DataType::Rgb24,
            256 => DataType::Int8,
            512 => DataType::UInt16,
            768 => DataType::UInt32,
            1024 => DataType::Int64,
            1280 => DataType::UInt64,
            1536 => DataType::Float128,
            1792 => DataType::Complex128,
            2048 => DataType::Complex256,
            2304 => DataType::Rgba32,
            other => return Err(NiftiError::UnsupportedDatatype(other)),
        };
        Ok(datatype)
    }

    pub fn code(self) -> i16 {
        match self {
            DataType::UInt8 => 2,
            DataType::Int16 => 4,
            DataType::Int32 => 8,
            DataType::Float32 => 16,
            DataType::Complex64 => 32,
            DataType::Float64 => 64,
            DataType::Rgb24 => 128,
            DataType::Int8 => 256,
            DataType::UInt16 => 512,
            DataType::UInt32 => 768,
            DataType::Int64 => 1024,
            DataType::UInt64 => 1280,
            DataType::Float128 => 1536,
            DataType::Complex128 => 1792,
            DataType::Complex256 => 2048,
            DataType::Rgba32 => 2304,
        }
    }

    /// Size of one voxel in bytes.
    pub fn bytes_per_voxel(self) -> usize {
        match self {
            DataType::UInt8 | DataType::Int8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Rgb24 => 3,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 | DataType::Rgba32 => 4,
            DataType::Complex64 | DataType::Float64 | DataType::Int64 | DataType::UInt64 => 8,
            DataType::Float128 | DataType::Complex128 => 16,
            DataType::Complex256 => 32,
        }
    }

    pub fn bitpix(self) -> i16 {
        (self.bytes_per_voxel() * 8) as i16
    }
}
