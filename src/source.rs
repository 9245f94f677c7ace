// Tabular source layer
// Raw sheet model + the collaborator seams the pipeline consumes

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// ERROR TAXONOMY
// ============================================================================

/// Errors a data source can produce. The pipeline branches on these:
/// a missing required column aborts the table load, a named sheet that does
/// not exist is recovered to an empty table, connectivity problems halt the
/// load attempt until the user refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// A required column is absent from an ingested table. Fatal for that
    /// table: no meaningful aggregation can proceed without it.
    MissingColumn { table: String, column: String },

    /// A sheet requested by name does not exist in the workbook.
    /// Distinct from an index read so callers can substitute an empty table.
    SheetNotFound { name: String },

    /// The source could not be reached, authenticated, or read.
    /// Fatal per load attempt; the user-triggered refresh is the retry.
    Unavailable { reason: String },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::MissingColumn { table, column } => {
                write!(f, "missing column {:?} in table {:?}", column, table)
            }
            SourceError::SheetNotFound { name } => {
                write!(f, "sheet {:?} not found in workbook", name)
            }
            SourceError::Unavailable { reason } => {
                write!(f, "data source unavailable: {}", reason)
            }
        }
    }
}

impl std::error::Error for SourceError {}

impl SourceError {
    pub fn is_sheet_not_found(&self) -> bool {
        matches!(self, SourceError::SheetNotFound { .. })
    }
}

// ============================================================================
// RAW TABLES
// ============================================================================

/// One sheet as fetched: a header row plus string-typed data rows.
/// Row order is preserved from the source; the aggregator's first-seen
/// reductions depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RawTable { headers, rows }
    }

    /// Empty table with a known schema. Used when an optional sheet is
    /// absent from the source.
    pub fn empty(headers: &[&str]) -> Self {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell accessor tolerant of ragged rows (short rows read as empty cells).
    pub fn cell<'a>(&'a self, row: usize, col: usize) -> &'a str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// A fetched workbook: every sheet of the remote document, read in one batch.
/// Sheet lookups after the fetch are local and never re-issue I/O.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<(String, RawTable)>,
}

impl Workbook {
    pub fn new(sheets: Vec<(String, RawTable)>) -> Self {
        Workbook { sheets }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Read all records of sheet N (position in the workbook).
    pub fn sheet_at(&self, index: usize) -> Result<&RawTable, SourceError> {
        self.sheets
            .get(index)
            .map(|(_, table)| table)
            .ok_or_else(|| SourceError::Unavailable {
                reason: format!(
                    "workbook has {} sheets, sheet {} requested",
                    self.sheets.len(),
                    index
                ),
            })
    }

    /// Read all records of the sheet named `name` (tab names compare
    /// case-insensitively). Fails distinctly from an index read so optional
    /// sheets can be recovered to empty tables.
    pub fn sheet_named(&self, name: &str) -> Result<&RawTable, SourceError> {
        self.sheets
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, table)| table)
            .ok_or_else(|| SourceError::SheetNotFound {
                name: name.to_string(),
            })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(n, _)| n.as_str()).collect()
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Inbound seam to the spreadsheet backend. One call fetches the whole
/// workbook; the loader must not call this more than once per load cycle.
///
/// Remote implementations must bound the fetch with a timeout and report it
/// as [`SourceError::Unavailable`]; the user-triggered refresh is the retry,
/// there is no automatic backoff.
pub trait TableSource {
    fn fetch_workbook(&self) -> Result<Workbook, SourceError>;
}

/// One file visible in the remote folder scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedFile {
    pub name: String,
    pub id: String,
}

/// One page of a folder listing. `next_page` carries the continuation token
/// when more pages remain.
#[derive(Debug, Clone)]
pub struct FilePage {
    pub files: Vec<ListedFile>,
    pub next_page: Option<String>,
}

/// Inbound seam to the file-storage backend (paginated folder listing).
pub trait FileListing {
    fn list_page(
        &self,
        folder_id: &str,
        mime_type: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, SourceError>;
}

/// Follow continuation tokens until exhausted. The file set is not complete
/// until the last page has been consumed.
pub fn fetch_all_files(
    listing: &dyn FileListing,
    folder_id: &str,
    mime_type: &str,
) -> Result<Vec<ListedFile>, SourceError> {
    let mut files = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = listing.list_page(folder_id, mime_type, token.as_deref())?;
        files.extend(page.files);
        match page.next_page {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(files)
}

// ============================================================================
// CSV-BACKED SOURCE
// ============================================================================

/// Workbook backed by a directory of CSV files, one file per sheet (sheet
/// name = file stem, minus an optional ordering prefix). Used by the CLI and
/// tests; the production spreadsheet client lives behind the same
/// `TableSource` trait.
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CsvDirSource {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn read_sheet(&self, path: &Path) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open sheet file: {}", path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to read headers from {}", path.display()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (line_num, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line_num + 2, path.display())
            })?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(RawTable::new(headers, rows))
    }
}

/// Sheet files may carry a numeric prefix ("01_contratos.csv") to control
/// sheet order; the prefix is not part of the sheet name.
fn strip_order_prefix(stem: &str) -> &str {
    let rest = stem.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() < stem.len() {
        if let Some(stripped) = rest.strip_prefix(['_', '-', ' ']) {
            return stripped;
        }
    }
    stem
}

impl TableSource for CsvDirSource {
    fn fetch_workbook(&self) -> Result<Workbook, SourceError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| SourceError::Unavailable {
            reason: format!("cannot read {}: {}", self.dir.display(), e),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("csv"))
            .collect();

        // Deterministic sheet order regardless of directory iteration order
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::Unavailable {
                reason: format!("no sheet files in {}", self.dir.display()),
            });
        }

        let mut sheets = Vec::new();
        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("sheet");
            let name = strip_order_prefix(stem).to_string();
            let table = self
                .read_sheet(&path)
                .map_err(|e| SourceError::Unavailable {
                    reason: format!("{:#}", e),
                })?;
            sheets.push((name, table));
        }

        Ok(Workbook::new(sheets))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_workbook() -> Workbook {
        Workbook::new(vec![
            (
                "contratos".to_string(),
                RawTable::new(
                    vec!["A".to_string(), "B".to_string()],
                    vec![vec!["1".to_string(), "2".to_string()]],
                ),
            ),
            ("clc".to_string(), RawTable::empty(&["C", "D"])),
        ])
    }

    #[test]
    fn test_sheet_at_in_range() {
        let wb = sample_workbook();
        let sheet = wb.sheet_at(0).unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.cell(0, 1), "2");
    }

    #[test]
    fn test_sheet_at_out_of_range() {
        let wb = sample_workbook();
        let err = wb.sheet_at(5).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[test]
    fn test_sheet_named_found() {
        let wb = sample_workbook();
        assert!(wb.sheet_named("clc").unwrap().is_empty());
    }

    #[test]
    fn test_sheet_named_missing_is_distinct() {
        let wb = sample_workbook();
        let err = wb.sheet_named("evolucion").unwrap_err();
        assert!(err.is_sheet_not_found());
        assert_eq!(
            err,
            SourceError::SheetNotFound {
                name: "evolucion".to_string()
            }
        );
    }

    #[test]
    fn test_ragged_row_cell_reads_empty() {
        let table = RawTable::new(
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec![vec!["x".to_string()]],
        );
        assert_eq!(table.cell(0, 0), "x");
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.cell(9, 0), "");
    }

    /// Listing that serves a fixed sequence of pages keyed by token.
    struct PagedListing {
        pages: Vec<Vec<ListedFile>>,
    }

    impl FileListing for PagedListing {
        fn list_page(
            &self,
            _folder_id: &str,
            _mime_type: &str,
            page_token: Option<&str>,
        ) -> Result<FilePage, SourceError> {
            let index: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let files = self.pages.get(index).cloned().unwrap_or_default();
            let next_page = if index + 1 < self.pages.len() {
                Some((index + 1).to_string())
            } else {
                None
            };
            Ok(FilePage { files, next_page })
        }
    }

    fn file(name: &str) -> ListedFile {
        ListedFile {
            name: name.to_string(),
            id: format!("id-{}", name),
        }
    }

    #[test]
    fn test_fetch_all_files_consumes_pagination() {
        let listing = PagedListing {
            pages: vec![
                vec![file("a.pdf"), file("b.pdf")],
                vec![file("c.pdf")],
                vec![file("d.pdf")],
            ],
        };

        let files = fetch_all_files(&listing, "folder-1", "application/pdf").unwrap();
        assert_eq!(files.len(), 4);
        assert_eq!(files[3].name, "d.pdf");
    }

    #[test]
    fn test_fetch_all_files_single_page() {
        let listing = PagedListing {
            pages: vec![vec![file("only.pdf")]],
        };
        let files = fetch_all_files(&listing, "folder-1", "application/pdf").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_csv_dir_source_reads_sheets_in_name_order() {
        let dir = tempfile::tempdir().unwrap();

        let mut f1 = std::fs::File::create(dir.path().join("01_contratos.csv")).unwrap();
        writeln!(f1, "N° CONTRATO,PROYECTO").unwrap();
        writeln!(f1, "C-001,Puente Norte").unwrap();

        let mut f2 = std::fs::File::create(dir.path().join("02_clc.csv")).unwrap();
        writeln!(f2, "CONTRATO,CLC,MONTO").unwrap();

        let source = CsvDirSource::new(dir.path());
        let wb = source.fetch_workbook().unwrap();

        assert_eq!(wb.sheet_count(), 2);
        assert_eq!(wb.sheet_names(), vec!["contratos", "clc"]);
        assert_eq!(wb.sheet_at(0).unwrap().cell(0, 0), "C-001");
        assert!(wb.sheet_named("CLC").unwrap().is_empty());
    }

    #[test]
    fn test_strip_order_prefix() {
        assert_eq!(strip_order_prefix("01_contratos"), "contratos");
        assert_eq!(strip_order_prefix("2-clc"), "clc");
        assert_eq!(strip_order_prefix("contratos"), "contratos");
        assert_eq!(strip_order_prefix("2024_reporte"), "reporte");
        assert_eq!(strip_order_prefix("42"), "42");
    }

    #[test]
    fn test_csv_dir_source_missing_dir_unavailable() {
        let source = CsvDirSource::new("/nonexistent/path/for/test");
        let err = source.fetch_workbook().unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }
}
