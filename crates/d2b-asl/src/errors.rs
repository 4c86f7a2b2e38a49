//! Error types for the d2b-asl plugin
//!
//! [`AslError`] covers everything the `asl` plugin can report while
//! processing acquisitions; [`PluginError`] covers registration and hook
//! dispatch on the host side.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::aslcontext::{ALLOWED_NON_BIDS_LABELS, ASL_CONTEXT_DESCRIPTION_PROPERTY, BIDS_LABELS};
use d2b_asl_nifti::NiftiError;

#[derive(Error, Debug)]
pub enum AslError {
    #[error(
        "Description at index [{index}] is missing the required property [{property}]",
        property = ASL_CONTEXT_DESCRIPTION_PROPERTY
    )]
    MissingAslcontext { index: usize },

    #[error(
        "Description at index [{index}] has an invalid [{property}] property: expected a list of labels",
        property = ASL_CONTEXT_DESCRIPTION_PROPERTY
    )]
    InvalidAslcontextValue { index: usize },

    #[error(
        "File [{}] has a mismatch between the number of volumes in the acquisition [{nvols}] and the number of volume_type labels [{nlabels}] in the associated description",
        .file.display()
    )]
    ContextConfiguration {
        file: PathBuf,
        nvols: usize,
        nlabels: usize,
    },

    #[error(
        "Unknown aslcontext label [{label}]. BIDS-compliant labels are: {bids:?}, d2b-asl also allows for the usage of {allowed:?}",
        bids = BIDS_LABELS,
        allowed = ALLOWED_NON_BIDS_LABELS
    )]
    InvalidLabel { label: String },

    #[error("Every volume of [{}] is labelled for removal; at least one BIDS volume type is required", .file.display())]
    AllVolumesDiscarded { file: PathBuf },

    #[error(
        "Could not find ASL NIfTI file for the acquisition with dst_root [{}]",
        .dst_root.display()
    )]
    AslFileNotFound { dst_root: PathBuf },

    #[error("Cannot locate aslcontext files without a file root")]
    MissingFileRoot,

    #[error("Failed to read NIfTI file [{}]", .path.display())]
    NiftiRead {
        path: PathBuf,
        #[source]
        source: NiftiError,
    },

    #[error("Failed to remove volumes from NIfTI file [{}]", .path.display())]
    NiftiEdit {
        path: PathBuf,
        #[source]
        source: NiftiError,
    },

    #[error("Failed to write NIfTI file [{}]", .path.display())]
    NiftiWrite {
        path: PathBuf,
        #[source]
        source: NiftiError,
    },

    #[error("Failed to write [{}]", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read acquisitions from [{}]", .path.display())]
    AcquisitionsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse acquisitions from [{}]", .path.display())]
    AcquisitionsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize sidecar")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while registering plugins or dispatching hooks
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin '{0}' is already registered")]
    Duplicate(String),

    #[error("Plugin '{plugin}' failed in post_move")]
    Hook {
        plugin: String,
        #[source]
        source: AslError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_aslcontext_display() {
        let err = AslError::MissingAslcontext { index: 3 };
        assert_eq!(
            err.to_string(),
            "Description at index [3] is missing the required property [aslContext]"
        );
    }

    #[test]
    fn test_invalid_label_lists_allowed_labels() {
        let err = AslError::InvalidLabel {
            label: "tag".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("Unknown aslcontext label [tag]."));
        assert!(message.contains(r#"["cbf", "control", "deltam", "label", "m0scan"]"#));
        assert!(message.contains(r#"["discard"]"#));
    }

    #[test]
    fn test_configuration_error_display() {
        let err = AslError::ContextConfiguration {
            file: PathBuf::from("sub-01/perf/sub-01_asl.nii.gz"),
            nvols: 10,
            nlabels: 9,
        };
        let message = err.to_string();
        assert!(message.starts_with("File [sub-01/perf/sub-01_asl.nii.gz] has a mismatch"));
        assert!(message.contains("[10]"));
        assert!(message.contains("[9]"));
    }

    #[test]
    fn test_nifti_cause_is_reported_once() {
        let err = AslError::NiftiRead {
            path: PathBuf::from("bad.nii"),
            source: NiftiError::Truncated {
                expected: 4,
                actual: 1,
            },
        };
        assert_eq!(err.to_string(), "Failed to read NIfTI file [bad.nii]");

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(
            chain,
            "Failed to read NIfTI file [bad.nii]: File is truncated: expected at least 4 bytes, found 1"
        );
    }

    #[test]
    fn test_nifti_write_failure_is_not_a_read() {
        let err = AslError::NiftiWrite {
            path: PathBuf::from("sub-01_asl.nii.gz"),
            source: NiftiError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        };
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain, "Failed to write NIfTI file [sub-01_asl.nii.gz]: denied");
    }
}
