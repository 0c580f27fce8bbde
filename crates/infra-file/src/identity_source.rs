// CSV-backed identity source

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use mailferry_core::domain::Identity;
use mailferry_core::port::IdentitySource;
use mailferry_core::{AppError, Result};

/// Streams mailbox identities from a CSV file.
///
/// Opening validates the input up front: the header must carry the identity
/// column (matched case-insensitively) and the file must have at least one
/// data row with a non-empty identity. The total is counted in a first pass;
/// windows stream from a second reader so the full list is never held.
#[derive(Debug)]
pub struct CsvIdentitySource {
    path: PathBuf,
    reader: csv::Reader<File>,
    column_index: usize,
    total: usize,
}

impl CsvIdentitySource {
    pub fn open(path: impl AsRef<Path>, identity_column: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut counting = Self::reader_for(&path)?;
        let column_index = Self::find_column(&mut counting, &path, identity_column)?;

        let mut total = 0usize;
        for record in counting.records() {
            let record = record.map_err(|e| {
                AppError::Input(format!("{}: malformed CSV row: {}", path.display(), e))
            })?;
            match record.get(column_index).map(str::trim) {
                Some(value) if !value.is_empty() => total += 1,
                _ => warn!(
                    path = %path.display(),
                    row = ?record.position().map(|p| p.line()),
                    "Skipping row with empty identity"
                ),
            }
        }
        if total == 0 {
            return Err(AppError::Input(format!(
                "{} contains no data rows with a {} value",
                path.display(),
                identity_column
            )));
        }

        let mut reader = Self::reader_for(&path)?;
        // Re-resolve on the streaming reader to consume its header
        Self::find_column(&mut reader, &path, identity_column)?;

        info!(
            path = %path.display(),
            identities = %total,
            column = %identity_column,
            "Identity source opened"
        );
        Ok(Self {
            path,
            reader,
            column_index,
            total,
        })
    }

    fn reader_for(path: &Path) -> Result<csv::Reader<File>> {
        let file = File::open(path).map_err(|e| {
            AppError::Input(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file))
    }

    fn find_column(
        reader: &mut csv::Reader<File>,
        path: &Path,
        identity_column: &str,
    ) -> Result<usize> {
        let headers = reader.headers().map_err(|e| {
            AppError::Input(format!("{}: unreadable CSV header: {}", path.display(), e))
        })?;
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(identity_column))
            .ok_or_else(|| {
                AppError::Input(format!(
                    "{}: missing column {} (found: {})",
                    path.display(),
                    identity_column,
                    headers.iter().collect::<Vec<_>>().join(", ")
                ))
            })
    }
}

#[async_trait]
impl IdentitySource for CsvIdentitySource {
    fn total(&self) -> usize {
        self.total
    }

    async fn next_window(&mut self, max: usize) -> Result<Vec<Identity>> {
        let mut window = Vec::with_capacity(max);
        while window.len() < max {
            let mut record = csv::StringRecord::new();
            let more = self.reader.read_record(&mut record).map_err(|e| {
                AppError::Input(format!("{}: malformed CSV row: {}", self.path.display(), e))
            })?;
            if !more {
                break;
            }
            if let Some(value) = record.get(self.column_index).map(str::trim) {
                if !value.is_empty() {
                    window.push(value.to_string());
                }
            }
        }
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_streams_identities_in_windows() {
        let file = csv_file(
            "DisplayName,EmailAddress\n\
             Alice,alice@contoso.com\n\
             Bob,bob@contoso.com\n\
             Carol,carol@contoso.com\n",
        );
        let mut source = CsvIdentitySource::open(file.path(), "EmailAddress").unwrap();

        assert_eq!(source.total(), 3);
        assert_eq!(
            source.next_window(2).await.unwrap(),
            vec!["alice@contoso.com", "bob@contoso.com"]
        );
        assert_eq!(
            source.next_window(2).await.unwrap(),
            vec!["carol@contoso.com"]
        );
        assert!(source.next_window(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_column_match_is_case_insensitive() {
        let file = csv_file("emailaddress\nalice@contoso.com\n");
        let source = CsvIdentitySource::open(file.path(), "EmailAddress").unwrap();
        assert_eq!(source.total(), 1);
    }

    #[tokio::test]
    async fn test_missing_column_is_rejected() {
        let file = csv_file("DisplayName\nAlice\n");
        let error = CsvIdentitySource::open(file.path(), "EmailAddress").unwrap_err();
        assert!(matches!(error, AppError::Input(_)));
        assert!(error.to_string().contains("EmailAddress"));
    }

    #[tokio::test]
    async fn test_header_only_file_is_rejected() {
        let file = csv_file("EmailAddress\n");
        let error = CsvIdentitySource::open(file.path(), "EmailAddress").unwrap_err();
        assert!(matches!(error, AppError::Input(_)));
        assert!(error.to_string().contains("no data rows"));
    }

    #[tokio::test]
    async fn test_rows_with_empty_identity_are_skipped() {
        let file = csv_file(
            "EmailAddress\n\
             alice@contoso.com\n\
             \n\
             bob@contoso.com\n",
        );
        let mut source = CsvIdentitySource::open(file.path(), "EmailAddress").unwrap();
        assert_eq!(source.total(), 2);
        assert_eq!(
            source.next_window(10).await.unwrap(),
            vec!["alice@contoso.com", "bob@contoso.com"]
        );
    }
}
