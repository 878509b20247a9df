use super::report::ValidationReport;
use crate::error::ExportError;
use std::fs::File;
use std::path::Path;

/// Writes one row per (specification, outcome, GUID).
pub fn export_csv<P: AsRef<Path>>(report: &ValidationReport, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(["Specification", "Outcome", "GlobalId"])?;

    for (outcome, entries) in [("fail", &report.results.failed), ("pass", &report.results.passed)] {
        for spec in entries {
            for guid in &spec.guids {
                writer.write_record([spec.name.as_str(), outcome, guid.as_str()])?;
            }
        }
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::report::tests::sample_report;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_failures_before_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        export_csv(&sample_report(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Specification,Outcome,GlobalId",
                "Wall fire rating,fail,1hOSvn6df7F8_7GcBWlRGQ",
                "Door fire rating,fail,3cUkl32yn9qRSPvBJVyWYp",
                "Wall fire rating,pass,2O2Fr$t4X7Zf8NOew3FLOH",
            ]
        );
    }

    #[test]
    fn unwritable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.csv");
        assert!(matches!(
            export_csv(&sample_report(), &path),
            Err(ExportError::FileCreate { .. })
        ));
    }
}
