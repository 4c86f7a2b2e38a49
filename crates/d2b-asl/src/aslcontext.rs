//! The aslcontext: one volume-type label per volume of an ASL series
//!
//! Labels come from the `aslContext` property of the matching description.
//! BIDS labels end up in `*_aslcontext.tsv`; `discard` is accepted as well
//! and marks volumes to remove from the image.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::acquisition::Acquisition;
use crate::errors::AslError;
use crate::sidecar::aslcontext_sidecar_string;
use d2b_asl_nifti::NiftiHeader;

pub const ASL_CONTEXT_DESCRIPTION_PROPERTY: &str = "aslContext";
pub const BIDS_LABELS: &[&str] = &["cbf", "control", "deltam", "label", "m0scan"];
pub const ALLOWED_NON_BIDS_LABELS: &[&str] = &["discard"];

/// Column header of the aslcontext TSV.
pub const VOLUME_TYPE_COLUMN: &str = "volume_type";

/// Row terminator of the aslcontext TSV, the same as files written by
/// earlier d2b-asl releases.
pub const TSV_LINE_TERMINATOR: &str = "\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLabel {
    pub is_bids: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aslcontext {
    labels: Vec<String>,
    file_root: Option<PathBuf>,
}

impl Aslcontext {
    pub fn new(labels: Vec<String>, file_root: Option<PathBuf>) -> Self {
        Aslcontext { labels, file_root }
    }

    pub fn from_acquisition(acquisition: &Acquisition) -> Result<Self, AslError> {
        let index = acquisition.description.index;
        let value = acquisition
            .description
            .get(ASL_CONTEXT_DESCRIPTION_PROPERTY)
            .ok_or(AslError::MissingAslcontext { index })?;

        let labels = match value {
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>(),
            _ => None,
        }
        .ok_or(AslError::InvalidAslcontextValue { index })?;

        Ok(Aslcontext::new(labels, Some(acquisition.dst_root_no_modality())))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn file_root(&self) -> Option<&Path> {
        self.file_root.as_deref()
    }

    /// `<parent>/<name>_aslcontext.tsv`, relative to the dataset root.
    pub fn tsv_file(&self) -> Result<PathBuf, AslError> {
        self.sibling("tsv")
    }

    /// `<parent>/<name>_aslcontext.json`, relative to the dataset root.
    pub fn json_file(&self) -> Result<PathBuf, AslError> {
        self.sibling("json")
    }

    fn sibling(&self, extension: &str) -> Result<PathBuf, AslError> {
        let root = self.file_root.as_deref().ok_or(AslError::MissingFileRoot)?;
        let name = root
            .file_name()
            .ok_or(AslError::MissingFileRoot)?
            .to_string_lossy();
        Ok(root.with_file_name(format!("{}_aslcontext.{}", name, extension)))
    }

    /// Check the labels against the image at `asl_file`.
    pub fn validate(&self, asl_file: &Path) -> Result<(), AslError> {
        let header = NiftiHeader::read(asl_file).map_err(|source| AslError::NiftiRead {
            path: asl_file.to_path_buf(),
            source,
        })?;
        self.validate_volume_count(header.num_volumes(), asl_file)
    }

    /// Volume count is checked first, then each label, then that something
    /// is left once `discard` volumes are removed.
    pub fn validate_volume_count(&self, nvols: usize, asl_file: &Path) -> Result<(), AslError> {
        let nlabels = self.labels.len();
        if nvols != nlabels {
            return Err(AslError::ContextConfiguration {
                file: asl_file.to_path_buf(),
                nvols,
                nlabels,
            });
        }
        if let Some(label) = self
            .labels
            .iter()
            .find(|label| !is_bids_label(label) && !is_allowed_non_bids_label(label))
        {
            return Err(AslError::InvalidLabel {
                label: label.clone(),
            });
        }
        if self.kept_volumes().is_empty() {
            return Err(AslError::AllVolumesDiscarded {
                file: asl_file.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn tagged_labels(&self) -> Vec<TaggedLabel> {
        self.labels
            .iter()
            .map(|label| TaggedLabel {
                is_bids: !is_allowed_non_bids_label(label),
                label: label.clone(),
            })
            .collect()
    }

    pub fn should_discard_volumes(&self) -> bool {
        self.tagged_labels().iter().any(|t| !t.is_bids)
    }

    /// Indices of volumes that stay in the image.
    pub fn kept_volumes(&self) -> Vec<usize> {
        self.tagged_labels()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_bids)
            .map(|(i, _)| i)
            .collect()
    }

    /// `(index, label)` of every volume that will be removed.
    pub fn discarded_volumes(&self) -> Vec<(usize, String)> {
        self.tagged_labels()
            .into_iter()
            .enumerate()
            .filter(|(_, t)| !t.is_bids)
            .map(|(i, t)| (i, t.label))
            .collect()
    }

    /// TSV body: the `volume_type` header followed by every BIDS label.
    pub fn tsv(&self) -> String {
        let mut out = String::from(VOLUME_TYPE_COLUMN);
        out.push_str(TSV_LINE_TERMINATOR);
        for tagged in self.tagged_labels().iter().filter(|t| t.is_bids) {
            out.push_str(&tagged.label);
            out.push_str(TSV_LINE_TERMINATOR);
        }
        out
    }

    pub fn json(&self) -> Result<String, AslError> {
        Ok(aslcontext_sidecar_string()?)
    }

    pub fn write_tsv(&self, filename: &Path) -> Result<PathBuf, AslError> {
        write_file(filename, &self.tsv())
    }

    pub fn write_json(&self, filename: &Path) -> Result<PathBuf, AslError> {
        write_file(filename, &self.json()?)
    }

    pub fn write_bids_tsv(&self, dataset_dir: &Path) -> Result<PathBuf, AslError> {
        self.write_tsv(&dataset_dir.join(self.tsv_file()?))
    }

    pub fn write_bids_json(&self, dataset_dir: &Path) -> Result<PathBuf, AslError> {
        self.write_json(&dataset_dir.join(self.json_file()?))
    }
}

pub fn is_bids_label(label: &str) -> bool {
    BIDS_LABELS.contains(&label)
}

pub fn is_allowed_non_bids_label(label: &str) -> bool {
    ALLOWED_NON_BIDS_LABELS.contains(&label)
}

fn write_file(path: &Path, contents: &str) -> Result<PathBuf, AslError> {
    let to_error = |source| AslError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(to_error)?;
        }
    }
    fs::write(path, contents).map_err(to_error)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::Description;
    use serde_json::json;
    use tempfile::TempDir;

    fn context(labels: &[&str]) -> Aslcontext {
        Aslcontext::new(
            labels.iter().map(|l| l.to_string()).collect(),
            Some(PathBuf::from("sub-01/perf/sub-01")),
        )
    }

    fn acquisition(data: Value) -> Acquisition {
        let map = data.as_object().cloned().unwrap_or_default();
        Acquisition::new("in/asl.json", "sub-01/perf/sub-01_asl", Description::new(4, map))
    }

    #[test]
    fn test_from_acquisition() -> Result<(), AslError> {
        let acq = acquisition(json!({
            "modalityLabel": "asl",
            "aslContext": ["control", "label"]
        }));
        let ctx = Aslcontext::from_acquisition(&acq)?;
        assert_eq!(ctx.labels(), ["control", "label"]);
        assert_eq!(ctx.file_root(), Some(Path::new("sub-01/perf/sub-01")));
        Ok(())
    }

    #[test]
    fn test_from_acquisition_missing_property() {
        let acq = acquisition(json!({"modalityLabel": "asl"}));
        assert!(matches!(
            Aslcontext::from_acquisition(&acq),
            Err(AslError::MissingAslcontext { index: 4 })
        ));
    }

    #[test]
    fn test_from_acquisition_rejects_non_string_labels() {
        for value in [json!("control"), json!(["control", 1])] {
            let acq = acquisition(json!({"modalityLabel": "asl", "aslContext": value}));
            assert!(matches!(
                Aslcontext::from_acquisition(&acq),
                Err(AslError::InvalidAslcontextValue { index: 4 })
            ));
        }
    }

    #[test]
    fn test_sidecar_paths() -> Result<(), AslError> {
        let ctx = context(&["control"]);
        assert_eq!(ctx.tsv_file()?, PathBuf::from("sub-01/perf/sub-01_aslcontext.tsv"));
        assert_eq!(ctx.json_file()?, PathBuf::from("sub-01/perf/sub-01_aslcontext.json"));
        Ok(())
    }

    #[test]
    fn test_sidecar_paths_keep_dotted_entities() -> Result<(), AslError> {
        let ctx = Aslcontext::new(vec![], Some(PathBuf::from("sub-01/perf/sub-01_acq-1.5mm")));
        assert_eq!(
            ctx.tsv_file()?,
            PathBuf::from("sub-01/perf/sub-01_acq-1.5mm_aslcontext.tsv")
        );
        Ok(())
    }

    #[test]
    fn test_sidecar_paths_need_file_root() {
        let ctx = Aslcontext::new(vec!["control".to_string()], None);
        assert!(matches!(ctx.tsv_file(), Err(AslError::MissingFileRoot)));
        assert!(matches!(ctx.json_file(), Err(AslError::MissingFileRoot)));
    }

    #[test]
    fn test_count_mismatch_is_reported_before_bad_labels() {
        let ctx = context(&["control", "tag"]);
        let err = ctx.validate_volume_count(3, Path::new("asl.nii")).err();
        assert!(matches!(
            err,
            Some(AslError::ContextConfiguration {
                nvols: 3,
                nlabels: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let ctx = context(&["control", "tag"]);
        let err = ctx.validate_volume_count(2, Path::new("asl.nii")).err();
        assert!(matches!(err, Some(AslError::InvalidLabel { ref label }) if label == "tag"));
    }

    #[test]
    fn test_all_discard_is_rejected() {
        let ctx = context(&["discard", "discard"]);
        let err = ctx.validate_volume_count(2, Path::new("asl.nii")).err();
        assert!(matches!(err, Some(AslError::AllVolumesDiscarded { .. })));
    }

    #[test]
    fn test_tagging_and_discards() {
        let ctx = context(&["discard", "control", "label", "discard", "m0scan"]);
        assert!(ctx.should_discard_volumes());
        assert_eq!(ctx.kept_volumes(), vec![1, 2, 4]);
        assert_eq!(
            ctx.discarded_volumes(),
            vec![(0, "discard".to_string()), (3, "discard".to_string())]
        );
        assert!(!context(&["control", "label"]).should_discard_volumes());
    }

    #[test]
    fn test_tsv_skips_discarded_volumes() {
        let ctx = context(&["discard", "control", "label", "m0scan"]);
        assert_eq!(ctx.tsv(), "volume_type\r\ncontrol\r\nlabel\r\nm0scan\r\n");
    }

    #[test]
    fn test_write_bids_files() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let ctx = context(&["deltam", "cbf"]);

        let tsv = ctx.write_bids_tsv(temp_dir.path())?;
        assert_eq!(tsv, temp_dir.path().join("sub-01/perf/sub-01_aslcontext.tsv"));
        assert_eq!(fs::read_to_string(&tsv)?, "volume_type\r\ndeltam\r\ncbf\r\n");

        let json = ctx.write_bids_json(temp_dir.path())?;
        let parsed: Value = serde_json::from_str(&fs::read_to_string(&json)?)?;
        assert_eq!(parsed["volume_type"]["LongName"], "Volume type");
        Ok(())
    }
}
