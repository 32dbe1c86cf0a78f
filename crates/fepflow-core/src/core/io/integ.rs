use crate::core::work::WorkSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegError {
    #[error("Failed to open '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read integrated work table '{path}': {source}", path = path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Row {row} of '{path}' has no parsable work value", path = path.display())]
    BadValue { path: PathBuf, row: usize },
}

/// Writes the two-column `<dgdl file> <work>` table so that integration can
/// be cached and analysis re-run without the xvg inputs.
pub fn write_integ(path: &Path, set: &WorkSet) -> Result<(), IntegError> {
    let file = File::create(path).map_err(|source| IntegError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_writer(file);

    for (name, value) in set.files.iter().zip(&set.values) {
        writer
            .write_record([name.as_str(), &value.to_string()])
            .map_err(|source| IntegError::Table {
                path: path.to_path_buf(),
                source,
            })?;
    }
    writer.flush().map_err(|source| IntegError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Reads a two-column integrated work table back into a `WorkSet`.
pub fn read_integ(path: &Path) -> Result<WorkSet, IntegError> {
    let file = File::open(path).map_err(|source| IntegError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut set = WorkSet::default();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|source| IntegError::Table {
            path: path.to_path_buf(),
            source,
        })?;
        let name = record.get(0).unwrap_or_default().to_string();
        let value = record
            .get(1)
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or(IntegError::BadValue {
                path: path.to_path_buf(),
                row: idx + 1,
            })?;
        set.push(name, value);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn written_table_reads_back_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("integA.dat");
        let set = WorkSet::new(
            vec!["dgdl_0.xvg".into(), "dgdl_1.xvg".into()],
            vec![12.25, -3.5],
        );

        write_integ(&path, &set).unwrap();
        let loaded = read_integ(&path).unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn row_without_numeric_work_value_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("integA.dat");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "dgdl_0.xvg 1.5").unwrap();
        writeln!(f, "dgdl_1.xvg not-a-number").unwrap();

        match read_integ(&path) {
            Err(IntegError::BadValue { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected BadValue, got {:?}", other),
        }
    }

    #[test]
    fn missing_table_is_an_io_error() {
        assert!(matches!(
            read_integ(Path::new("/nonexistent/integ.dat")),
            Err(IntegError::Io { .. })
        ));
    }
}
