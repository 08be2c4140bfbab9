//! CSV report of bad files

use std::io::Write;
use std::path::Path;

use crate::error::ScanError;
use crate::models::FailureRecord;

/// Header row of the report
pub const REPORT_HEADER: [&str; 3] = ["file_name", "error_message", "file_size[bytes]"];

/// Write the report to `path`, replacing any existing file
pub fn write_report(path: &Path, rows: &[FailureRecord]) -> Result<(), ScanError> {
    let file = std::fs::File::create(path)
        .map_err(|e| ScanError::from(e).with_path(path.to_path_buf()))?;
    write_report_to(file, rows).map_err(|e| ScanError::from(e).with_path(path.to_path_buf()))
}

/// Write the header and one row per failure, in the given order
pub fn write_report_to<W: Write>(writer: W, rows: &[FailureRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(REPORT_HEADER)?;
    for row in rows {
        let name = row.path.to_string_lossy();
        let size = row
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        wtr.write_record([
            &*name,
            row.error.as_str(),
            size.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn rows() -> Vec<FailureRecord> {
        vec![
            FailureRecord {
                path: PathBuf::from("/m/empty.jpg"),
                error: "Zero size file".to_string(),
                size: Some(0),
            },
            FailureRecord {
                path: PathBuf::from("/m/cut, short.png"),
                error: "Format error decoding Png: \"unexpected EOF\"".to_string(),
                size: None,
            },
        ]
    }

    #[test]
    fn test_report_layout() {
        let mut buf = Vec::new();
        write_report_to(&mut buf, &rows()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "file_name,error_message,file_size[bytes]");
        assert_eq!(lines[1], "/m/empty.jpg,Zero size file,0");
        assert_eq!(
            lines[2],
            "\"/m/cut, short.png\",\"Format error decoding Png: \"\"unexpected EOF\"\"\",unknown"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_report_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        write_report(&path, &rows()).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), REPORT_HEADER);

        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][0], "/m/cut, short.png");
        assert_eq!(&records[1][2], "unknown");
    }

    #[test]
    fn test_report_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("bad.csv");
        let err = write_report(&path, &rows()).unwrap_err();
        assert_eq!(err.path, Some(path));
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let mut buf = Vec::new();
        write_report_to(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "file_name,error_message,file_size[bytes]\n");
    }
}
