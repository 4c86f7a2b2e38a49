//! Acquisition model handed over by the host after files have been moved
//!
//! A [`Description`] is one entry of the host's configuration file (the
//! criteria that matched, the BIDS data type and modality label, plus any
//! plugin-specific properties such as `aslContext`). An [`Acquisition`] pairs
//! a matched source file with its description and its destination root.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AslError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
    /// Position of the description in the host configuration file.
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Description {
    pub fn new(index: usize, data: Map<String, Value>) -> Self {
        Description { index, data }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Modality label with its leading underscore (`"_asl"`), or an empty
    /// string when the description has none.
    pub fn modality_label(&self) -> String {
        self.data
            .get("modalityLabel")
            .and_then(Value::as_str)
            .map(|label| format!("_{}", label))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acquisition {
    pub src_file: PathBuf,
    /// Destination path without extension, relative to the output directory.
    pub dst_root: PathBuf,
    /// Destination path without extension and without the modality label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_root_no_modality: Option<PathBuf>,
    pub description: Description,
}

impl Acquisition {
    pub fn new(src_file: impl Into<PathBuf>, dst_root: impl Into<PathBuf>, description: Description) -> Self {
        Acquisition {
            src_file: src_file.into(),
            dst_root: dst_root.into(),
            dst_root_no_modality: None,
            description,
        }
    }

    /// `dst_root` with the modality label removed from its last component,
    /// unless the host supplied it explicitly.
    pub fn dst_root_no_modality(&self) -> PathBuf {
        if let Some(ref explicit) = self.dst_root_no_modality {
            return explicit.clone();
        }

        let label = self.description.modality_label();
        let Some(name) = self.dst_root.file_name().and_then(|n| n.to_str()) else {
            return self.dst_root.clone();
        };
        match name.strip_suffix(label.as_str()) {
            Some(stripped) if !label.is_empty() && !stripped.is_empty() => {
                self.dst_root.with_file_name(OsString::from(stripped))
            }
            _ => self.dst_root.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HandOff {
    List(Vec<Acquisition>),
    Wrapped { acquisitions: Vec<Acquisition> },
}

/// Parse a hand-off document: either a JSON array of acquisitions or an
/// object with an `acquisitions` array.
pub fn parse_acquisitions(json: &str) -> Result<Vec<Acquisition>, serde_json::Error> {
    let handoff: HandOff = serde_json::from_str(json)?;
    Ok(match handoff {
        HandOff::List(acquisitions) | HandOff::Wrapped { acquisitions } => acquisitions,
    })
}

pub fn load_acquisitions(path: &Path) -> Result<Vec<Acquisition>, AslError> {
    let content = fs::read_to_string(path).map_err(|source| AslError::AcquisitionsRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_acquisitions(&content).map_err(|source| AslError::AcquisitionsParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn description(data: Value) -> Description {
        match data {
            Value::Object(map) => Description::new(0, map),
            _ => Description::default(),
        }
    }

    #[test]
    fn test_modality_label_has_leading_underscore() {
        let desc = description(json!({"dataType": "perf", "modalityLabel": "asl"}));
        assert_eq!(desc.modality_label(), "_asl");
        assert_eq!(Description::default().modality_label(), "");
    }

    #[test]
    fn test_dst_root_no_modality_is_derived() {
        let acq = Acquisition::new(
            "dicom/asl.json",
            "sub-01/perf/sub-01_acq-pcasl_asl",
            description(json!({"modalityLabel": "asl"})),
        );
        assert_eq!(
            acq.dst_root_no_modality(),
            PathBuf::from("sub-01/perf/sub-01_acq-pcasl")
        );
    }

    #[test]
    fn test_dst_root_no_modality_prefers_explicit_value() {
        let mut acq = Acquisition::new(
            "dicom/asl.json",
            "sub-01/perf/sub-01_asl",
            description(json!({"modalityLabel": "asl"})),
        );
        acq.dst_root_no_modality = Some(PathBuf::from("sub-01/perf/custom"));
        assert_eq!(acq.dst_root_no_modality(), PathBuf::from("sub-01/perf/custom"));
    }

    #[test]
    fn test_dst_root_without_matching_suffix_is_unchanged() {
        let acq = Acquisition::new(
            "dicom/t1.json",
            "sub-01/anat/sub-01_T1w",
            description(json!({"modalityLabel": "asl"})),
        );
        assert_eq!(acq.dst_root_no_modality(), PathBuf::from("sub-01/anat/sub-01_T1w"));
    }

    #[test]
    fn test_parse_both_handoff_shapes() -> Result<(), serde_json::Error> {
        let entry = json!({
            "src_file": "in/001.json",
            "dst_root": "sub-01/perf/sub-01_asl",
            "description": {"index": 2, "data": {"modalityLabel": "asl"}}
        });
        let list = parse_acquisitions(&json!([entry.clone()]).to_string())?;
        let wrapped = parse_acquisitions(&json!({"acquisitions": [entry]}).to_string())?;
        assert_eq!(list, wrapped);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].description.index, 2);
        Ok(())
    }

    #[test]
    fn test_load_acquisitions_reports_path() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("acquisitions.json");
        fs::write(&path, "{not json")?;
        let err = load_acquisitions(&path).err().ok_or("expected parse error")?;
        assert!(matches!(err, AslError::AcquisitionsParse { .. }));
        assert!(err.to_string().contains("acquisitions.json"));
        Ok(())
    }
}
