use super::report::ValidationReport;
use crate::error::ExportError;
use crate::remote::{bcf_document, BcfIssue};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn write_pretty<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;

    let mut file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    file.write_all(json.as_bytes())
        .map_err(|e| ExportError::WriteError {
            message: e.to_string(),
        })?;

    Ok(())
}

pub fn export_json<P: AsRef<Path>>(report: &ValidationReport, path: P) -> Result<(), ExportError> {
    write_pretty(report, path)
}

/// Writes `issue` as a BCF exchange document.
pub fn export_bcf<P: AsRef<Path>>(issue: &BcfIssue, path: P) -> Result<(), ExportError> {
    write_pretty(&bcf_document(issue), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::report::tests::sample_report;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        export_json(&sample_report(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["results"]["summary"]["totalSpecs"], 2);
        assert_eq!(value["results"]["summary"]["totalFailedElements"], 2);
        assert_eq!(value["elements"][0]["type"], "Wall");
        assert_eq!(value["elements"][0]["status"], "pass");
    }
}
