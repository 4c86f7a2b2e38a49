//! Post-move processing of ASL acquisitions
//!
//! [`generate_context_files`] is what the `asl` plugin runs once the host has
//! moved every converted file into the output directory.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::acquisition::Acquisition;
use crate::aslcontext::Aslcontext;
use crate::errors::AslError;
use crate::logger;
use d2b_asl_nifti::NiftiImage;

/// Candidate NIfTI extensions, in lookup order.
pub const NIFTI_EXTENSIONS: &[&str] = &[".nii.gz", ".nii"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFileOptions {
    pub include_aslcontext_json: bool,
    /// Validate and report, but do not write or modify anything.
    pub dry_run: bool,
}

/// What was (or, in dry-run mode, would be) done for one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAcquisition {
    pub src_file: PathBuf,
    pub asl_file: PathBuf,
    pub tsv_file: PathBuf,
    pub json_file: Option<PathBuf>,
    pub discarded: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextReport {
    pub processed: Vec<ProcessedAcquisition>,
}

impl ContextReport {
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    pub fn discarded_total(&self) -> usize {
        self.processed.iter().map(|p| p.discarded.len()).sum()
    }
}

/// Write aslcontext files for every ASL acquisition and drop `discard`
/// volumes. Stops at the first failing acquisition.
pub fn generate_context_files(
    out_dir: &Path,
    acquisitions: &[Acquisition],
    options: &ContextFileOptions,
) -> Result<ContextReport, AslError> {
    let mut report = ContextReport::default();

    for acq in find_asl_acquisitions(acquisitions) {
        logger::info(&msg_asl_found(acq));

        let aslcontext = Aslcontext::from_acquisition(acq)?;
        let asl_file = find_asl_file(out_dir, acq)?;
        aslcontext.validate(&asl_file)?;

        let tsv_file = out_dir.join(aslcontext.tsv_file()?);
        let json_file = if options.include_aslcontext_json {
            Some(out_dir.join(aslcontext.json_file()?))
        } else {
            None
        };
        let discarded: Vec<usize> = aslcontext
            .discarded_volumes()
            .into_iter()
            .map(|(i, _)| i)
            .collect();

        if options.dry_run {
            logger::info(&format!("[dry-run] Would write {}", tsv_file.display()));
            if let Some(ref json_file) = json_file {
                logger::info(&format!("[dry-run] Would write {}", json_file.display()));
            }
            if !discarded.is_empty() {
                logger::info(&format!("[dry-run] {}", msg_will_discard_volumes(acq, &aslcontext)));
            }
        } else {
            aslcontext.write_bids_tsv(out_dir)?;
            debug!("Wrote {:?}", tsv_file);
            if options.include_aslcontext_json {
                aslcontext.write_bids_json(out_dir)?;
                debug!("Wrote {:?}", json_file);
            }
            if aslcontext.should_discard_volumes() {
                logger::info(&msg_will_discard_volumes(acq, &aslcontext));
                discard_volumes(&asl_file, &aslcontext)?;
            }
        }

        report.processed.push(ProcessedAcquisition {
            src_file: acq.src_file.clone(),
            asl_file,
            tsv_file,
            json_file,
            discarded,
        });
    }

    Ok(report)
}

pub fn find_asl_acquisitions(acquisitions: &[Acquisition]) -> Vec<&Acquisition> {
    acquisitions.iter().filter(|acq| is_asl(acq)).collect()
}

pub fn is_asl(acquisition: &Acquisition) -> bool {
    acquisition.description.modality_label() == "_asl"
}

/// First existing `<root>.nii.gz` or `<root>.nii`.
pub fn first_nii(root: &Path) -> Option<PathBuf> {
    NIFTI_EXTENSIONS
        .iter()
        .map(|ext| {
            let mut candidate = root.as_os_str().to_owned();
            candidate.push(ext);
            PathBuf::from(candidate)
        })
        .find(|candidate| candidate.is_file())
}

pub fn find_asl_file(dataset_dir: &Path, acquisition: &Acquisition) -> Result<PathBuf, AslError> {
    first_nii(&dataset_dir.join(&acquisition.dst_root)).ok_or_else(|| AslError::AslFileNotFound {
        dst_root: acquisition.dst_root.clone(),
    })
}

/// Remove the volumes labelled with a non-BIDS label from `asl_file`.
///
/// Returns the number of volumes removed; the file is left untouched when
/// every volume is kept.
pub fn discard_volumes(asl_file: &Path, aslcontext: &Aslcontext) -> Result<usize, AslError> {
    let keep = aslcontext.kept_volumes();
    let total = aslcontext.labels().len();
    if keep.len() == total {
        return Ok(0);
    }

    let path = || asl_file.to_path_buf();
    let mut image =
        NiftiImage::load(asl_file).map_err(|source| AslError::NiftiRead { path: path(), source })?;
    image
        .retain_volumes(&keep)
        .map_err(|source| AslError::NiftiEdit { path: path(), source })?;
    image
        .save(asl_file)
        .map_err(|source| AslError::NiftiWrite { path: path(), source })?;
    Ok(total - keep.len())
}

fn msg_asl_found(acquisition: &Acquisition) -> String {
    format!(
        "Found ASL acquisition associated with file [{}]. Writing aslcontext files.",
        acquisition.src_file.display()
    )
}

fn msg_will_discard_volumes(acquisition: &Acquisition, aslcontext: &Aslcontext) -> String {
    let reasons: Vec<String> = aslcontext
        .discarded_volumes()
        .into_iter()
        .map(|(i, label)| format!("volume at index [{}] with label [{}]", i, label))
        .collect();
    format!(
        "ASL context for acquisition [{}] has non-BIDS-compliant aslContext labels. d2b-asl will remove volumes: {}",
        acquisition.dst_root.display(),
        reasons.join(",")
    )
}
