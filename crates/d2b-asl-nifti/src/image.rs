use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::datatype::DataType;
use crate::errors::NiftiError;
use crate::header::{NiftiHeader, NIFTI1_HEADER_SIZE};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A single-file NIfTI image held as raw bytes.
///
/// `prefix` is everything before the voxel data (header, extension flag and
/// extensions); `data` is exactly [`NiftiHeader::data_len`] bytes.
#[derive(Debug, Clone)]
pub struct NiftiImage {
    header: NiftiHeader,
    prefix: Vec<u8>,
    data: Vec<u8>,
}

impl NiftiImage {
    /// Load a `.nii` or `.nii.gz` file. Compression is detected from content.
    pub fn load(path: &Path) -> Result<Self, NiftiError> {
        debug!("Loading NIfTI image: {:?}", path);
        let raw = fs::read(path)?;
        let bytes = if raw.starts_with(&GZIP_MAGIC) {
            let mut decoded = Vec::new();
            GzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
            decoded
        } else {
            raw
        };
        Self::from_bytes(bytes)
    }

    /// Parse an uncompressed NIfTI byte stream.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, NiftiError> {
        let header = NiftiHeader::parse(&bytes)?;
        let data_len = header.data_len()?;
        let expected = header.vox_offset + data_len;
        if bytes.len() < expected {
            return Err(NiftiError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }
        let mut data = bytes.split_off(header.vox_offset);
        data.truncate(data_len);
        Ok(NiftiImage {
            header,
            prefix: bytes,
            data,
        })
    }

    /// Build a little-endian NIfTI-1 image from dimensions and raw voxel bytes.
    ///
    /// Spatial units, orientation and scaling are left unset.
    pub fn from_parts(dims: &[usize], datatype: DataType, data: Vec<u8>) -> Result<Self, NiftiError> {
        if dims.is_empty() || dims.len() > 7 {
            return Err(NiftiError::UnsupportedDimensions(format!(
                "expected 1 to 7 dimensions, got {}",
                dims.len()
            )));
        }

        let mut prefix = vec![0u8; NIFTI1_HEADER_SIZE + 4];
        let p = &mut prefix;
        put(p, 0, &(NIFTI1_HEADER_SIZE as i32).to_le_bytes());
        put(p, 40, &(dims.len() as i16).to_le_bytes());
        for (i, size) in dims.iter().enumerate() {
            let size = i16::try_from(*size).map_err(|_| {
                NiftiError::UnsupportedDimensions(format!("dimension {} is too large", size))
            })?;
            put(p, 42 + 2 * i, &size.to_le_bytes());
        }
        put(p, 70, &datatype.code().to_le_bytes());
        put(p, 72, &datatype.bitpix().to_le_bytes());
        // pixdim[0] (qfac) and voxel sizes default to 1.0
        for i in 0..8 {
            put(p, 76 + 4 * i, &1.0f32.to_le_bytes());
        }
        put(p, 108, &((NIFTI1_HEADER_SIZE + 4) as f32).to_le_bytes());
        put(p, 344, b"n+1\0");

        let header = NiftiHeader::parse(&prefix)?;
        let expected = header.data_len()?;
        if data.len() != expected {
            return Err(NiftiError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(NiftiImage {
            header,
            prefix,
            data,
        })
    }

    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    pub fn num_volumes(&self) -> usize {
        self.header.num_volumes()
    }

    /// Raw voxel bytes in file order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes of volume `index`, gathered across any dimensions above 4.
    pub fn volume(&self, index: usize) -> Result<Vec<u8>, NiftiError> {
        let volumes = self.num_volumes();
        if index >= volumes {
            return Err(NiftiError::VolumeOutOfRange { index, volumes });
        }
        let volume_len = self.header.volume_len()?;
        let mut out = Vec::with_capacity(volume_len * self.header.outer_blocks());
        for block in 0..self.header.outer_blocks() {
            let start = (block * volumes + index) * volume_len;
            out.extend_from_slice(&self.data[start..start + volume_len]);
        }
        Ok(out)
    }

    /// Keep only the volumes at `keep` (in the given order) along dimension 4.
    pub fn retain_volumes(&mut self, keep: &[usize]) -> Result<(), NiftiError> {
        if keep.is_empty() {
            return Err(NiftiError::NoVolumesRetained);
        }
        let volumes = self.num_volumes();
        if let Some(&index) = keep.iter().find(|&&i| i >= volumes) {
            return Err(NiftiError::VolumeOutOfRange { index, volumes });
        }
        if keep.len() == volumes && keep.iter().enumerate().all(|(i, &k)| i == k) {
            return Ok(());
        }

        let volume_len = self.header.volume_len()?;
        let blocks = self.header.outer_blocks();
        let mut data = Vec::with_capacity(volume_len * keep.len() * blocks);
        for block in 0..blocks {
            for &index in keep {
                let start = (block * volumes + index) * volume_len;
                data.extend_from_slice(&self.data[start..start + volume_len]);
            }
        }

        self.header.write_num_volumes(&mut self.prefix, keep.len())?;
        self.data = data;
        debug!("Retained {} of {} volumes", keep.len(), volumes);
        Ok(())
    }

    /// Uncompressed file contents.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.prefix.len() + self.data.len());
        bytes.extend_from_slice(&self.prefix);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Write the image; paths ending in `.gz` are gzip-compressed.
    ///
    /// The file is written next to `path` first and renamed over it, so an
    /// existing image is only replaced by a complete one.
    pub fn save(&self, path: &Path) -> Result<(), NiftiError> {
        debug!("Saving NIfTI image: {:?}", path);
        let temp_path = temp_sibling(path);
        let result = self
            .write_to(&temp_path, is_gzip_path(path))
            .and_then(|()| fs::rename(&temp_path, path).map_err(NiftiError::from));
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn write_to(&self, path: &Path, gzip: bool) -> Result<(), NiftiError> {
        let writer = BufWriter::with_capacity(64 * 1024, File::create(path)?);
        if gzip {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            encoder.write_all(&self.prefix)?;
            encoder.write_all(&self.data)?;
            encoder.finish()?.flush()?;
        } else {
            let mut writer = writer;
            writer.write_all(&self.prefix)?;
            writer.write_all(&self.data)?;
            writer.flush()?;
        }
        Ok(())
    }
}

/// `<dir>/.<name>.tmp`, in the same directory so the rename stays on one filesystem.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "image".into(), |name| name.to_string_lossy());
    path.with_file_name(format!(".{}.tmp", name))
}

fn put(prefix: &mut [u8], offset: usize, value: &[u8]) {
    prefix[offset..offset + value.len()].copy_from_slice(value);
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}
