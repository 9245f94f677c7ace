// Ingestion normalizer
// Coerces raw string-typed sheets into typed records. Pure transformation:
// no I/O, no logging; callers decide what to do with the coercion stats.

use crate::schema::{self, ColumnMap};
use crate::source::{ListedFile, RawTable, SourceError};
use serde::{Deserialize, Serialize};

// ============================================================================
// AMOUNT PARSING
// ============================================================================

/// Parse a currency- or percent-formatted cell into a number.
///
/// Strips the currency marker, thousands separators, percent sign and
/// whitespace, then parses as a decimal. Returns `None` for anything that
/// still fails, including empty cells. Examples of accepted input:
/// `"$ 1,234.56"`, `"1234.56"`, `"-$500.00"`, `"85.5%"`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok()
}

/// Per-table record of how lenient the parse had to be. Malformed amounts
/// never abort the load, but data-quality regressions should be visible,
/// so every non-empty cell coerced to zero is counted here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    /// Non-empty cells that failed numeric parsing and became 0.0.
    pub coerced: usize,
    /// Rows dropped because the key cell was blank (trailing spreadsheet rows).
    pub skipped_rows: usize,
}

impl NormalizeStats {
    pub fn merge(self, other: NormalizeStats) -> NormalizeStats {
        NormalizeStats {
            coerced: self.coerced + other.coerced,
            skipped_rows: self.skipped_rows + other.skipped_rows,
        }
    }
}

/// Lenient-parse policy: empty cells are missing values (0.0, uncounted);
/// non-empty malformed cells are coerced to 0.0 and counted.
fn amount_or_zero(raw: &str, stats: &mut NormalizeStats) -> f64 {
    match parse_amount(raw) {
        Some(value) => value,
        None => {
            if !raw.trim().is_empty() {
                stats.coerced += 1;
            }
            0.0
        }
    }
}

// ============================================================================
// TYPED RECORDS
// ============================================================================

/// One row of the main contract/payment table. `total` repeats per row (it is
/// a property of the contract); `exercised` and `pending` are per-row
/// contributions that the aggregator sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract_no: String,
    pub project: String,
    pub company: String,
    pub description: String,
    pub total: f64,
    pub exercised: f64,
    pub pending: f64,
    pub pct_paid: f64,
    pub pct_pending: f64,
}

/// Project-level budget figures. One record per project, independent of the
/// contract table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEvolutionRecord {
    pub project: String,
    pub original: f64,
    pub modified: f64,
    pub committed: f64,
    pub exercised: f64,
}

/// Reference to a listed file in the remote folder. `resource_id` is the
/// opaque identifier the UI layer turns into a clickable link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileLink {
    pub name: String,
    pub resource_id: String,
}

/// One CLC row: a disbursement document tied to a contract. CLC amounts feed
/// their own total and never mix into contract-level sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedDocumentRecord {
    pub contract_no: String,
    pub document_id: String,
    pub amount: f64,
    pub link: Option<FileLink>,
}

// ============================================================================
// NORMALIZERS
// ============================================================================

/// Typed rows plus the stats the lenient parse accumulated.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub stats: NormalizeStats,
}

fn cell<'a>(table: &'a RawTable, map: &ColumnMap, row: usize, column: &'static str) -> &'a str {
    match map.get(column) {
        Some(col) => table.cell(row, col).trim(),
        None => "",
    }
}

/// Normalize the main contract table. Source row order is preserved; the
/// aggregator's first-seen reductions depend on it.
pub fn normalize_contracts(table: &RawTable) -> Result<Normalized<ContractRecord>, SourceError> {
    let map = schema::CONTRACTS.resolve(table)?;
    let mut stats = NormalizeStats::default();
    let mut records = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let contract_no = cell(table, &map, row, schema::CONTRACT_NO);
        if contract_no.is_empty() {
            stats.skipped_rows += 1;
            continue;
        }

        records.push(ContractRecord {
            contract_no: contract_no.to_string(),
            project: cell(table, &map, row, schema::PROJECT).to_string(),
            company: cell(table, &map, row, schema::COMPANY).to_string(),
            description: cell(table, &map, row, schema::DESCRIPTION).to_string(),
            total: amount_or_zero(cell(table, &map, row, schema::TOTAL), &mut stats),
            exercised: amount_or_zero(cell(table, &map, row, schema::EXERCISED), &mut stats),
            pending: amount_or_zero(cell(table, &map, row, schema::PENDING), &mut stats),
            pct_paid: amount_or_zero(cell(table, &map, row, schema::PCT_PAID), &mut stats),
            pct_pending: amount_or_zero(cell(table, &map, row, schema::PCT_PENDING), &mut stats),
        });
    }

    Ok(Normalized { records, stats })
}

/// Normalize the budget evolution table (keyed by project).
pub fn normalize_evolution(
    table: &RawTable,
) -> Result<Normalized<BudgetEvolutionRecord>, SourceError> {
    let map = schema::EVOLUTION.resolve(table)?;
    let mut stats = NormalizeStats::default();
    let mut records = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let project = cell(table, &map, row, schema::EVO_PROJECT);
        if project.is_empty() {
            stats.skipped_rows += 1;
            continue;
        }

        records.push(BudgetEvolutionRecord {
            project: project.to_string(),
            original: amount_or_zero(cell(table, &map, row, schema::EVO_ORIGINAL), &mut stats),
            modified: amount_or_zero(cell(table, &map, row, schema::EVO_MODIFIED), &mut stats),
            committed: amount_or_zero(cell(table, &map, row, schema::EVO_COMMITTED), &mut stats),
            exercised: amount_or_zero(cell(table, &map, row, schema::EVO_EXERCISED), &mut stats),
        });
    }

    Ok(Normalized { records, stats })
}

/// Normalize the CLC table. Links are attached afterwards from the folder
/// listing (see [`annotate_links`]).
pub fn normalize_documents(
    table: &RawTable,
) -> Result<Normalized<RelatedDocumentRecord>, SourceError> {
    let map = schema::CLC.resolve(table)?;
    let mut stats = NormalizeStats::default();
    let mut records = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let contract_no = cell(table, &map, row, schema::CLC_CONTRACT);
        if contract_no.is_empty() {
            stats.skipped_rows += 1;
            continue;
        }

        records.push(RelatedDocumentRecord {
            contract_no: contract_no.to_string(),
            document_id: cell(table, &map, row, schema::CLC_ID).to_string(),
            amount: amount_or_zero(cell(table, &map, row, schema::CLC_AMOUNT), &mut stats),
            link: None,
        });
    }

    Ok(Normalized { records, stats })
}

// ============================================================================
// LINK ANNOTATION
// ============================================================================

/// Attach listed files to the CLC documents they belong to. A file matches a
/// document when its name contains the document id (case-insensitive); the
/// first match wins. Documents with no matching file keep `link = None`,
/// which is an expected state, not an error.
pub fn annotate_links(documents: &mut [RelatedDocumentRecord], files: &[ListedFile]) {
    for doc in documents.iter_mut() {
        if doc.document_id.is_empty() {
            continue;
        }
        let needle = doc.document_id.to_lowercase();
        doc.link = files
            .iter()
            .find(|f| f.name.to_lowercase().contains(&needle))
            .map(|f| FileLink {
                name: f.name.clone(),
                resource_id: f.id.clone(),
            });
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_currency_formats() {
        assert_eq!(parse_amount("$ 1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("$1000"), Some(1000.0));
        assert_eq!(parse_amount("1234.56"), Some(1234.56));
        assert_eq!(parse_amount("-$500.00"), Some(-500.0));
        assert_eq!(parse_amount("  2,000,000.00 "), Some(2_000_000.0));
    }

    #[test]
    fn test_parse_amount_percent() {
        assert_eq!(parse_amount("85.5%"), Some(85.5));
        assert_eq!(parse_amount("% 12"), Some(12.0));
    }

    #[test]
    fn test_parse_amount_malformed_is_none() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("$"), None);
        assert_eq!(parse_amount("1.2.3"), None);
    }

    fn contracts_table(rows: Vec<Vec<&str>>) -> RawTable {
        RawTable::new(
            vec![
                "N° CONTRATO".to_string(),
                "PROYECTO".to_string(),
                "EMPRESA".to_string(),
                "DESCRIPCION".to_string(),
                "Importe total (LC)".to_string(),
                "Importe ejercido (LC)".to_string(),
                "Importe pendiente (LC)".to_string(),
                "% PAGADO".to_string(),
                "% PENDIENTE POR EJERCER".to_string(),
            ],
            rows.into_iter()
                .map(|r| r.into_iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_normalize_contracts_parses_currency_cells() {
        let table = contracts_table(vec![vec![
            " C-001 ",
            "Puente Norte",
            "Constructora Azteca",
            "Obra civil",
            "$ 1,000.00",
            "$200.00",
            "$800.00",
            "20%",
            "80%",
        ]]);

        let out = normalize_contracts(&table).unwrap();
        assert_eq!(out.records.len(), 1);
        let rec = &out.records[0];
        assert_eq!(rec.contract_no, "C-001");
        assert_eq!(rec.project, "Puente Norte");
        assert_eq!(rec.total, 1000.0);
        assert_eq!(rec.exercised, 200.0);
        assert_eq!(rec.pending, 800.0);
        assert_eq!(rec.pct_paid, 20.0);
        assert_eq!(out.stats.coerced, 0);
    }

    #[test]
    fn test_normalize_contracts_coerces_and_counts_malformed() {
        let table = contracts_table(vec![vec![
            "C-002",
            "Hospital Sur",
            "Grupo ICA",
            "Equipamiento",
            "sin dato",
            "",
            "$100.00",
            "",
            "",
        ]]);

        let out = normalize_contracts(&table).unwrap();
        let rec = &out.records[0];
        // Malformed total coerces to zero, never an error
        assert_eq!(rec.total, 0.0);
        assert_eq!(rec.exercised, 0.0);
        assert_eq!(rec.pending, 100.0);
        // Only the non-empty malformed cell is counted
        assert_eq!(out.stats.coerced, 1);
    }

    #[test]
    fn test_normalize_contracts_skips_blank_key_rows() {
        let table = contracts_table(vec![
            vec!["C-001", "P", "E", "D", "$1.00", "$1.00", "", "", ""],
            vec!["", "", "", "", "", "", "", "", ""],
        ]);

        let out = normalize_contracts(&table).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.stats.skipped_rows, 1);
    }

    #[test]
    fn test_normalize_contracts_preserves_row_order() {
        let table = contracts_table(vec![
            vec!["C-2", "P", "E", "D", "$2.00", "$0.00", "", "", ""],
            vec!["C-1", "P", "E", "D", "$1.00", "$0.00", "", "", ""],
        ]);

        let out = normalize_contracts(&table).unwrap();
        assert_eq!(out.records[0].contract_no, "C-2");
        assert_eq!(out.records[1].contract_no, "C-1");
    }

    #[test]
    fn test_normalize_contracts_missing_required_column() {
        let table = RawTable::new(
            vec!["N° CONTRATO".to_string(), "PROYECTO".to_string()],
            Vec::new(),
        );
        let err = normalize_contracts(&table).unwrap_err();
        assert!(matches!(err, SourceError::MissingColumn { .. }));
    }

    fn clc_table(rows: Vec<Vec<&str>>) -> RawTable {
        RawTable::new(
            vec!["CONTRATO".to_string(), "CLC".to_string(), "MONTO".to_string()],
            rows.into_iter()
                .map(|r| r.into_iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_normalize_documents() {
        let table = clc_table(vec![
            vec!["C-001", "CLC-77", "$ 350.00"],
            vec!["C-001", "CLC-78", "$ 150.00"],
        ]);

        let out = normalize_documents(&table).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].document_id, "CLC-77");
        assert_eq!(out.records[0].amount, 350.0);
        assert!(out.records[0].link.is_none());
    }

    #[test]
    fn test_normalize_evolution() {
        let table = RawTable::new(
            vec![
                "PROYECTO".to_string(),
                "ORIGINAL".to_string(),
                "MODIFICADO".to_string(),
                "COMPROMETIDO".to_string(),
                "EJERCIDO".to_string(),
            ],
            vec![vec![
                "Puente Norte".to_string(),
                "$ 5,000.00".to_string(),
                "$ 5,500.00".to_string(),
                "$ 4,000.00".to_string(),
                "$ 3,200.00".to_string(),
            ]],
        );

        let out = normalize_evolution(&table).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].modified, 5500.0);
        assert_eq!(out.records[0].exercised, 3200.0);
    }

    #[test]
    fn test_annotate_links_matches_by_document_id() {
        let mut docs = vec![
            RelatedDocumentRecord {
                contract_no: "C-001".to_string(),
                document_id: "CLC-77".to_string(),
                amount: 350.0,
                link: None,
            },
            RelatedDocumentRecord {
                contract_no: "C-001".to_string(),
                document_id: "CLC-99".to_string(),
                amount: 10.0,
                link: None,
            },
        ];
        let files = vec![ListedFile {
            name: "clc-77_factura.pdf".to_string(),
            id: "file-abc".to_string(),
        }];

        annotate_links(&mut docs, &files);

        let link = docs[0].link.as_ref().unwrap();
        assert_eq!(link.resource_id, "file-abc");
        assert_eq!(link.name, "clc-77_factura.pdf");
        // No matching file is an expected state, not an error
        assert!(docs[1].link.is_none());
    }

    #[test]
    fn test_stats_merge() {
        let a = NormalizeStats {
            coerced: 2,
            skipped_rows: 1,
        };
        let b = NormalizeStats {
            coerced: 3,
            skipped_rows: 0,
        };
        assert_eq!(
            a.merge(b),
            NormalizeStats {
                coerced: 5,
                skipped_rows: 1
            }
        );
    }
}
