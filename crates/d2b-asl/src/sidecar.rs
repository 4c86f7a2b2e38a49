//! Content of the `*_aslcontext.json` column-description sidecar

use serde_json::{json, Value};

pub const ASLCONTEXT_TERM_URL: &str = "https://bids-specification.readthedocs.io/en/v1.6.0/04-modality-specific-files/01-magnetic-resonance-imaging-data.html#_aslcontexttsv";

/// Describes the `volume_type` column and each of its BIDS levels.
pub fn aslcontext_sidecar_content() -> Value {
    json!({
        "volume_type": {
            "LongName": "Volume type",
            "Description": "Labels identifying the volume type of each volume in the corresponding *_asl.nii[.gz] file. Volume types are based on DICOM Tag (0018,9257) ASL Context.",
            "Levels": {
                "control": "The control image is acquired in the exact same way as the label image, except that the magnetization of the blood flowing into the imaging region has not been inverted.",
                "label": "The label image is acquired in the exact same way as the control image, except that the blood magnetization flowing into the imaging region has been inverted.",
                "m0scan": "The M0 image is a calibration image, used to estimate the equilibrium magnetization of blood.",
                "deltam": "The deltaM image is a perfusion-weighted image, obtained by the subtraction of control - label.",
                "cbf": "The cerebral blood flow (CBF) image is produced by dividing the deltaM by the M0, quantified into mL/100g/min (See also doi:10.1002/mrm.25197)."
            },
            "TermURL": ASLCONTEXT_TERM_URL
        }
    })
}

/// Pretty-printed sidecar with two-space indentation.
pub fn aslcontext_sidecar_string() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&aslcontext_sidecar_content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aslcontext::BIDS_LABELS;

    #[test]
    fn test_levels_cover_bids_labels_in_documented_order() {
        let content = aslcontext_sidecar_content();
        let levels: Vec<&str> = content["volume_type"]["Levels"]
            .as_object()
            .map(|levels| levels.keys().map(String::as_str).collect())
            .unwrap_or_default();
        assert_eq!(levels, vec!["control", "label", "m0scan", "deltam", "cbf"]);

        let mut sorted = levels.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, BIDS_LABELS);
    }

    #[test]
    fn test_string_uses_two_space_indent() -> Result<(), serde_json::Error> {
        let text = aslcontext_sidecar_string()?;
        assert!(text.starts_with("{\n  \"volume_type\": {\n    \"LongName\": \"Volume type\""));
        assert!(text.contains(ASLCONTEXT_TERM_URL));
        Ok(())
    }
}
