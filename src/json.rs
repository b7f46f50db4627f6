use std::path::Path;

use serde::Serialize;
use serde_json::{Value, json, to_string_pretty};

use crate::{
    cli::Settings, detectors::DetectionMode, error::SliceError, output, segmenter::SliceRecord,
};

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: String,
    #[serde(rename = "cutPoints")]
    pub cut_points: Vec<usize>,
    pub slices: Vec<SliceRecord>,
}

pub fn report(settings: &Settings, files: &[FileReport]) -> Value {
    let (threshold, db_floor, every) = match settings.detection {
        DetectionMode::Transient {
            threshold,
            db_floor,
        } => (Some(threshold), db_floor, None),
        DetectionMode::Interval { every } => (None, None, Some(every)),
    };

    json!({
        "mode": settings.detection.name(),
        "threshold": threshold,
        "dbFloor": db_floor,
        "everyUnits": every,
        "keepIntro": settings.keep_intro,
        "files": files,
    })
}

pub fn write_json(path: &Path, settings: &Settings, files: &[FileReport]) -> Result<(), SliceError> {
    let value = report(settings, files);
    std::fs::write(path, to_string_pretty(&value)?)?;
    output!("Wrote JSON output to {}", path.display());
    Ok(())
}
