// Export
// Serializes a formatted results table into a spreadsheet-format byte buffer
// ready for file download. The Excel-binary writer is an external
// collaborator; this produces the portable CSV form.

use crate::format::DashboardTable;
use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Serialize the table (headers + display rows, amounts already formatted)
/// into a downloadable byte buffer.
pub fn export_table(table: &DashboardTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(DashboardTable::headers())
        .context("Failed to write export headers")?;

    for row in &table.rows {
        writer
            .write_record([
                row.contract_no.as_str(),
                row.description.as_str(),
                row.total.as_str(),
                row.exercised.as_str(),
                row.pending.as_str(),
                row.pct_paid.as_str(),
                row.pct_pending.as_str(),
            ])
            .with_context(|| format!("Failed to write export row for {}", row.contract_no))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush export buffer: {}", e))
}

/// Default download name, date-stamped per export.
pub fn export_filename(date: NaiveDate) -> String {
    format!("resultados_contratos_{}.csv", date.format("%Y-%m-%d"))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ContractRow, SummaryRow};

    fn sample_table() -> DashboardTable {
        DashboardTable {
            rows: vec![ContractRow {
                contract_no: "C-001".to_string(),
                description: "Obra civil, etapa 1".to_string(),
                total: "$ 1,000.00".to_string(),
                exercised: "$ 500.00".to_string(),
                pending: "$ 500.00".to_string(),
                pct_paid: "50.0%".to_string(),
                pct_pending: "50.0%".to_string(),
            }],
            summary: SummaryRow {
                total: "$ 1,000.00".to_string(),
                exercised: "$ 500.00".to_string(),
                pending: "$ 500.00".to_string(),
            },
            evolution: None,
        }
    }

    #[test]
    fn test_export_contains_headers_and_rows() {
        let bytes = export_table(&sample_table()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("N° CONTRATO,DESCRIPCION"));

        let row = lines.next().unwrap();
        // Commas inside formatted amounts and descriptions stay quoted
        assert!(row.contains("C-001"));
        assert!(row.contains("\"$ 1,000.00\""));
        assert!(row.contains("\"Obra civil, etapa 1\""));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_round_trips_through_csv_reader() {
        let bytes = export_table(&sample_table()).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "C-001");
        assert_eq!(&records[0][2], "$ 1,000.00");
    }

    #[test]
    fn test_export_filename_is_date_stamped() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        assert_eq!(export_filename(date), "resultados_contratos_2026-08-08.csv");
    }
}
