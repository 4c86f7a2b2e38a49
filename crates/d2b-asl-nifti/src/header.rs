//! NIfTI-1 / NIfTI-2 header parsing
//!
//! Only the fields needed to locate and slice the voxel data are decoded:
//! `dim`, `datatype` and `vox_offset`. Everything else stays in the raw
//! header bytes owned by [`crate::NiftiImage`] and is written back untouched.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::datatype::DataType;
use crate::errors::NiftiError;

pub const NIFTI1_HEADER_SIZE: usize = 348;
pub const NIFTI2_HEADER_SIZE: usize = 540;

/// Bytes between the end of the header and the earliest possible data start
/// (the extension flag).
const EXTENSION_FLAG_SIZE: usize = 4;

const NIFTI1_MAGIC_OFFSET: usize = 344;
const NIFTI2_MAGIC_OFFSET: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NiftiVersion {
    Nifti1,
    Nifti2,
}

impl NiftiVersion {
    pub fn header_size(self) -> usize {
        match self {
            NiftiVersion::Nifti1 => NIFTI1_HEADER_SIZE,
            NiftiVersion::Nifti2 => NIFTI2_HEADER_SIZE,
        }
    }

    fn dim_offset(self) -> usize {
        match self {
            NiftiVersion::Nifti1 => 40,
            NiftiVersion::Nifti2 => 16,
        }
    }

    /// Width of one `dim` element: `short` in NIfTI-1, `int64` in NIfTI-2.
    fn dim_width(self) -> usize {
        match self {
            NiftiVersion::Nifti1 => 2,
            NiftiVersion::Nifti2 => 8,
        }
    }

    fn datatype_offset(self) -> usize {
        match self {
            NiftiVersion::Nifti1 => 70,
            NiftiVersion::Nifti2 => 12,
        }
    }

    fn vox_offset_offset(self) -> usize {
        match self {
            NiftiVersion::Nifti1 => 108,
            NiftiVersion::Nifti2 => 168,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    fn read_i16(self, bytes: &[u8], offset: usize) -> Result<i16, NiftiError> {
        let raw = take::<2>(bytes, offset)?;
        Ok(match self {
            Endianness::Little => i16::from_le_bytes(raw),
            Endianness::Big => i16::from_be_bytes(raw),
        })
    }

    fn read_i64(self, bytes: &[u8], offset: usize) -> Result<i64, NiftiError> {
        let raw = take::<8>(bytes, offset)?;
        Ok(match self {
            Endianness::Little => i64::from_le_bytes(raw),
            Endianness::Big => i64::from_be_bytes(raw),
        })
    }

    fn read_f32(self, bytes: &[u8], offset: usize) -> Result<f32, NiftiError> {
        let raw = take::<4>(bytes, offset)?;
        Ok(match self {
            Endianness::Little => f32::from_le_bytes(raw),
            Endianness::Big => f32::from_be_bytes(raw),
        })
    }

    fn i16_bytes(self, value: i16) -> [u8; 2] {
        match self {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        }
    }

    fn i64_bytes(self, value: i64) -> [u8; 8] {
        match self {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        }
    }
}

fn take<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], NiftiError> {
    bytes
        .get(offset..offset + N)
        .and_then(|slice| <[u8; N]>::try_from(slice).ok())
        .ok_or(NiftiError::Truncated {
            expected: offset + N,
            actual: bytes.len(),
        })
}

/// Decoded subset of a NIfTI header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NiftiHeader {
    pub version: NiftiVersion,
    pub endianness: Endianness,
    /// `dim[0]` is the number of dimensions, `dim[1..=dim[0]]` their sizes.
    pub dim: [i64; 8],
    pub datatype: DataType,
    /// Byte offset of the voxel data inside the uncompressed file.
    pub vox_offset: usize,
}

impl NiftiHeader {
    /// Parse the header at the start of an uncompressed `.nii` byte stream.
    pub fn parse(bytes: &[u8]) -> Result<Self, NiftiError> {
        let raw_size = take::<4>(bytes, 0)?;
        let (version, endianness) =
            match (i32::from_le_bytes(raw_size), i32::from_be_bytes(raw_size)) {
                (348, _) => (NiftiVersion::Nifti1, Endianness::Little),
                (_, 348) => (NiftiVersion::Nifti1, Endianness::Big),
                (540, _) => (NiftiVersion::Nifti2, Endianness::Little),
                (_, 540) => (NiftiVersion::Nifti2, Endianness::Big),
                (other, _) => return Err(NiftiError::NotNifti(other)),
            };

        if bytes.len() < version.header_size() {
            return Err(NiftiError::Truncated {
                expected: version.header_size(),
                actual: bytes.len(),
            });
        }
        check_magic(bytes, version)?;

        let mut dim = [0i64; 8];
        for (i, slot) in dim.iter_mut().enumerate() {
            let offset = version.dim_offset() + i * version.dim_width();
            *slot = match version {
                NiftiVersion::Nifti1 => i64::from(endianness.read_i16(bytes, offset)?),
                NiftiVersion::Nifti2 => endianness.read_i64(bytes, offset)?,
            };
        }

        let datatype = DataType::from_code(endianness.read_i16(bytes, version.datatype_offset())?)?;

        let declared_offset = match version {
            NiftiVersion::Nifti1 => {
                let raw = endianness.read_f32(bytes, version.vox_offset_offset())?;
                if raw.is_finite() && raw > 0.0 {
                    raw as usize
                } else {
                    0
                }
            }
            NiftiVersion::Nifti2 => {
                usize::try_from(endianness.read_i64(bytes, version.vox_offset_offset())?)
                    .unwrap_or(0)
            }
        };
        let vox_offset = declared_offset.max(version.header_size() + EXTENSION_FLAG_SIZE);

        let header = NiftiHeader {
            version,
            endianness,
            dim,
            datatype,
            vox_offset,
        };
        header.check_dims()?;
        Ok(header)
    }

    /// Read only the header of a `.nii` or `.nii.gz` file.
    pub fn read(path: &Path) -> Result<Self, NiftiError> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 2];
        let sniffed = file.read(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;

        let limit = NIFTI2_HEADER_SIZE as u64;
        let mut bytes = Vec::with_capacity(NIFTI2_HEADER_SIZE);
        if sniffed == 2 && magic == [0x1f, 0x8b] {
            GzDecoder::new(file).take(limit).read_to_end(&mut bytes)?;
        } else {
            file.take(limit).read_to_end(&mut bytes)?;
        }
        Self::parse(&bytes)
    }

    fn check_dims(&self) -> Result<(), NiftiError> {
        let ndim = self.dim[0];
        if !(1..=7).contains(&ndim) {
            return Err(NiftiError::UnsupportedDimensions(format!(
                "dim[0] must be between 1 and 7, found {}",
                ndim
            )));
        }
        for (i, size) in self.dim.iter().enumerate().skip(1).take(self.ndim()) {
            if *size < 1 {
                return Err(NiftiError::UnsupportedDimensions(format!(
                    "dim[{}] must be positive, found {}",
                    i, size
                )));
            }
        }
        self.data_len().map(|_| ())
    }

    pub fn ndim(&self) -> usize {
        self.dim[0] as usize
    }

    /// Size of dimension `index` (1-based), or 1 beyond `dim[0]`.
    pub fn dim_size(&self, index: usize) -> usize {
        if index == 0 || index > self.ndim() {
            1
        } else {
            self.dim[index] as usize
        }
    }

    /// Number of volumes along the fourth dimension.
    pub fn num_volumes(&self) -> usize {
        self.dim_size(4)
    }

    /// Bytes occupied by one 3D volume.
    pub fn volume_len(&self) -> Result<usize, NiftiError> {
        (1..=3)
            .map(|i| self.dim_size(i))
            .try_fold(self.datatype.bytes_per_voxel(), usize::checked_mul)
            .ok_or_else(too_large)
    }

    /// Number of 4D blocks stacked along dimensions 5 to 7.
    pub fn outer_blocks(&self) -> usize {
        (5..=7).map(|i| self.dim_size(i)).product()
    }

    /// Total bytes of voxel data described by the header.
    pub fn data_len(&self) -> Result<usize, NiftiError> {
        (4..=7)
            .map(|i| self.dim_size(i))
            .try_fold(self.volume_len()?, usize::checked_mul)
            .ok_or_else(too_large)
    }

    /// Set `dim[4]` and write it into the raw header bytes.
    pub(crate) fn write_num_volumes(
        &mut self,
        bytes: &mut [u8],
        volumes: usize,
    ) -> Result<(), NiftiError> {
        if self.ndim() < 4 {
            return Err(NiftiError::UnsupportedDimensions(format!(
                "cannot change the volume count of a {}D image",
                self.ndim()
            )));
        }
        let offset = self.version.dim_offset() + 4 * self.version.dim_width();
        let encoded: Vec<u8> = match self.version {
            NiftiVersion::Nifti1 => {
                let value = i16::try_from(volumes).map_err(|_| too_large())?;
                self.endianness.i16_bytes(value).to_vec()
            }
            NiftiVersion::Nifti2 => {
                let value = i64::try_from(volumes).map_err(|_| too_large())?;
                self.endianness.i64_bytes(value).to_vec()
            }
        };
        let actual = bytes.len();
        let target = bytes
            .get_mut(offset..offset + encoded.len())
            .ok_or(NiftiError::Truncated {
                expected: offset + encoded.len(),
                actual,
            })?;
        target.copy_from_slice(&encoded);
        self.dim[4] = volumes as i64;
        Ok(())
    }
}

fn too_large() -> NiftiError {
    NiftiError::UnsupportedDimensions("image is too large".to_string())
}

fn check_magic(bytes: &[u8], version: NiftiVersion) -> Result<(), NiftiError> {
    let (offset, expected): (usize, &[u8]) = match version {
        NiftiVersion::Nifti1 => (NIFTI1_MAGIC_OFFSET, b"n+1\0"),
        NiftiVersion::Nifti2 => (NIFTI2_MAGIC_OFFSET, b"n+2\0"),
    };
    let found = bytes.get(offset..offset + expected.len()).unwrap_or_default();
    if found == expected {
        Ok(())
    } else {
        Err(NiftiError::InvalidMagic(
            String::from_utf8_lossy(found)
                .trim_end_matches('\0')
                .to_string(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// NIfTI-1 header plus extension flag, int16 voxels, data at byte 352.
    pub(crate) fn nifti1_header(endianness: Endianness, dims: &[i16]) -> Vec<u8> {
        let mut bytes = vec![0u8; NIFTI1_HEADER_SIZE + EXTENSION_FLAG_SIZE];
        let put_i16 = |bytes: &mut Vec<u8>, offset: usize, value: i16| {
            bytes[offset..offset + 2].copy_from_slice(&endianness.i16_bytes(value));
        };
        let size = match endianness {
            Endianness::Little => 348i32.to_le_bytes(),
            Endianness::Big => 348i32.to_be_bytes(),
        };
        bytes[0..4].copy_from_slice(&size);
        put_i16(&mut bytes, 40, dims.len() as i16);
        for (i, d) in dims.iter().enumerate() {
            put_i16(&mut bytes, 42 + 2 * i, *d);
        }
        put_i16(&mut bytes, 70, DataType::Int16.code());
        let offset = match endianness {
            Endianness::Little => 352.0f32.to_le_bytes(),
            Endianness::Big => 352.0f32.to_be_bytes(),
        };
        bytes[108..112].copy_from_slice(&offset);
        bytes[344..348].copy_from_slice(b"n+1\0");
        bytes
    }

    /// NIfTI-2 header plus extension flag, uint8 voxels, data at byte 544.
    pub(crate) fn nifti2_header(endianness: Endianness, dims: &[i64]) -> Vec<u8> {
        let mut bytes = vec![0u8; NIFTI2_HEADER_SIZE + EXTENSION_FLAG_SIZE];
        let size = match endianness {
            Endianness::Little => 540i32.to_le_bytes(),
            Endianness::Big => 540i32.to_be_bytes(),
        };
        bytes[0..4].copy_from_slice(&size);
        bytes[4..12].copy_from_slice(b"n+2\0\r\n\x1a\n");
        bytes[12..14].copy_from_slice(&endianness.i16_bytes(DataType::UInt8.code()));
        bytes[14..16].copy_from_slice(&endianness.i16_bytes(8));
        bytes[16..24].copy_from_slice(&endianness.i64_bytes(dims.len() as i64));
        for (i, d) in dims.iter().enumerate() {
            let offset = 24 + 8 * i;
            bytes[offset..offset + 8].copy_from_slice(&endianness.i64_bytes(*d));
        }
        bytes[168..176].copy_from_slice(&endianness.i64_bytes(544));
        bytes
    }

    #[test]
    fn test_parse_little_endian() -> Result<(), NiftiError> {
        let header = NiftiHeader::parse(&nifti1_header(Endianness::Little, &[4, 5, 6, 10]))?;
        assert_eq!(header.version, NiftiVersion::Nifti1);
        assert_eq!(header.endianness, Endianness::Little);
        assert_eq!(header.num_volumes(), 10);
        assert_eq!(header.volume_len()?, 4 * 5 * 6 * 2);
        assert_eq!(header.data_len()?, 4 * 5 * 6 * 10 * 2);
        assert_eq!(header.vox_offset, 352);
        Ok(())
    }

    #[test]
    fn test_parse_big_endian() -> Result<(), NiftiError> {
        let header = NiftiHeader::parse(&nifti1_header(Endianness::Big, &[2, 2, 2, 3]))?;
        assert_eq!(header.endianness, Endianness::Big);
        assert_eq!(header.num_volumes(), 3);
        Ok(())
    }

    #[test]
    fn test_three_dimensional_image_has_one_volume() -> Result<(), NiftiError> {
        let header = NiftiHeader::parse(&nifti1_header(Endianness::Little, &[8, 8, 8]))?;
        assert_eq!(header.num_volumes(), 1);
        assert_eq!(header.outer_blocks(), 1);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_non_nifti() {
        let bytes = vec![0u8; 600];
        assert!(matches!(
            NiftiHeader::parse(&bytes),
            Err(NiftiError::NotNifti(0))
        ));
    }

    #[test]
    fn test_parse_rejects_detached_header() {
        let mut bytes = nifti1_header(Endianness::Little, &[2, 2, 2, 2]);
        bytes[344..348].copy_from_slice(b"ni1\0");
        let err = NiftiHeader::parse(&bytes).err();
        assert!(matches!(err, Some(NiftiError::InvalidMagic(ref m)) if m == "ni1"));
    }

    #[test]
    fn test_parse_rejects_zero_dimension() {
        let bytes = nifti1_header(Endianness::Little, &[2, 0, 2, 2]);
        assert!(matches!(
            NiftiHeader::parse(&bytes),
            Err(NiftiError::UnsupportedDimensions(_))
        ));
    }

    #[test]
    fn test_read_from_plain_and_gzip_files() -> Result<(), Box<dyn std::error::Error>> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let temp_dir = tempfile::TempDir::new()?;
        let mut bytes = nifti1_header(Endianness::Little, &[2, 2, 2, 6]);
        bytes.extend(std::iter::repeat(0u8).take(2 * 2 * 2 * 6 * 2));

        let plain = temp_dir.path().join("plain.nii");
        std::fs::write(&plain, &bytes)?;
        assert_eq!(NiftiHeader::read(&plain)?.num_volumes(), 6);

        let gzipped = temp_dir.path().join("packed.nii.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&bytes)?;
        std::fs::write(&gzipped, encoder.finish()?)?;
        assert_eq!(NiftiHeader::read(&gzipped)?.num_volumes(), 6);
        Ok(())
    }

    #[test]
    fn test_parse_nifti2_both_byte_orders() -> Result<(), NiftiError> {
        for endianness in [Endianness::Little, Endianness::Big] {
            let header = NiftiHeader::parse(&nifti2_header(endianness, &[2, 1, 1, 3]))?;
            assert_eq!(header.version, NiftiVersion::Nifti2);
            assert_eq!(header.endianness, endianness);
            assert_eq!(header.datatype, DataType::UInt8);
            assert_eq!(header.dim, [4, 2, 1, 1, 3, 0, 0, 0]);
            assert_eq!(header.num_volumes(), 3);
            assert_eq!(header.vox_offset, 544);
            assert_eq!(header.data_len()?, 6);
        }
        Ok(())
    }

    #[test]
    fn test_parse_nifti2_rejects_bad_magic() {
        let mut bytes = nifti2_header(Endianness::Little, &[2, 2, 2, 2]);
        bytes[4..8].copy_from_slice(b"ni2\0");
        assert!(matches!(
            NiftiHeader::parse(&bytes),
            Err(NiftiError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_write_num_volumes_nifti2_uses_eight_bytes() -> Result<(), NiftiError> {
        let mut bytes = nifti2_header(Endianness::Big, &[2, 1, 1, 70_000]);
        let mut header = NiftiHeader::parse(&bytes)?;
        header.write_num_volumes(&mut bytes, 65_536)?;
        // dim[4] lives at 16 + 4 * 8
        assert_eq!(&bytes[48..56], &65_536i64.to_be_bytes());
        assert_eq!(&bytes[40..48], &1i64.to_be_bytes());
        assert_eq!(NiftiHeader::parse(&bytes)?.num_volumes(), 65_536);
        Ok(())
    }

    #[test]
    fn test_write_num_volumes_big_endian() -> Result<(), NiftiError> {
        let mut bytes = nifti1_header(Endianness::Big, &[2, 2, 2, 5]);
        let mut header = NiftiHeader::parse(&bytes)?;
        header.write_num_volumes(&mut bytes, 3)?;
        assert_eq!(header.num_volumes(), 3);
        assert_eq!(NiftiHeader::parse(&bytes)?.num_volumes(), 3);
        Ok(())
    }
}
