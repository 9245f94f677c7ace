// Table schemas
// Declared-once column mapping: source headers are canonicalized and resolved
// into stable names here, so a renamed or missing column is one detectable
// schema error instead of scattered lookup failures downstream.

use crate::source::{RawTable, SourceError};
use std::collections::HashMap;

// ============================================================================
// HEADER CANONICALIZATION
// ============================================================================

/// Canonical form of a source header: trimmed, internal whitespace collapsed,
/// uppercased. Unifies variants like "n° contrato", " N° CONTRATO " and
/// "N°  Contrato" that appear across exports of the same workbook.
pub fn canonicalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

// ============================================================================
// COLUMN SPECS
// ============================================================================

/// One column of a table schema. `canonical` is the stable name the rest of
/// the crate addresses; `aliases` absorb the alternate headers seen in the
/// source workbooks. Optional columns degrade to empty cells when absent.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

const fn required(canonical: &'static str, aliases: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        canonical,
        aliases,
        required: true,
    }
}

const fn optional(canonical: &'static str, aliases: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        canonical,
        aliases,
        required: false,
    }
}

/// Schema of one source table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

// Column names follow the source workbook headers (Spanish, as exported).

pub const CONTRACT_NO: &str = "N° CONTRATO";
pub const PROJECT: &str = "PROYECTO";
pub const COMPANY: &str = "EMPRESA";
pub const DESCRIPTION: &str = "DESCRIPCION";
pub const TOTAL: &str = "IMPORTE TOTAL (LC)";
pub const EXERCISED: &str = "IMPORTE EJERCIDO (LC)";
pub const PENDING: &str = "IMPORTE PENDIENTE (LC)";
pub const PCT_PAID: &str = "% PAGADO";
pub const PCT_PENDING: &str = "% PENDIENTE POR EJERCER";

pub const CLC_CONTRACT: &str = "CONTRATO";
pub const CLC_ID: &str = "CLC";
pub const CLC_AMOUNT: &str = "MONTO";

pub const EVO_PROJECT: &str = "PROYECTO";
pub const EVO_ORIGINAL: &str = "ORIGINAL";
pub const EVO_MODIFIED: &str = "MODIFICADO";
pub const EVO_COMMITTED: &str = "COMPROMETIDO";
pub const EVO_EXERCISED: &str = "EJERCIDO";

/// Main contract/payment table (sheet 0 of the workbook).
pub const CONTRACTS: TableSchema = TableSchema {
    name: "contratos",
    columns: &[
        required(CONTRACT_NO, &["NO CONTRATO", "NO. CONTRATO", "CONTRATO"]),
        required(PROJECT, &[]),
        required(COMPANY, &[]),
        required(DESCRIPTION, &["DESCRIPCIÓN"]),
        required(TOTAL, &["IMPORTE TOTAL"]),
        required(EXERCISED, &["IMPORTE EJERCIDO", "EJERCIDO"]),
        optional(PENDING, &["IMPORTE PENDIENTE", "PENDIENTE POR EJERCER (LC)"]),
        optional(PCT_PAID, &[]),
        optional(PCT_PENDING, &["% PENDIENTE"]),
    ],
};

/// Related-document table (named sheet, may be absent from the workbook).
pub const CLC: TableSchema = TableSchema {
    name: "clc",
    columns: &[
        required(CLC_CONTRACT, &["N° CONTRATO"]),
        required(CLC_ID, &["N° CLC", "FOLIO CLC"]),
        required(CLC_AMOUNT, &["IMPORTE", "MONTO (LC)"]),
    ],
};

/// Budget evolution table (named sheet, may be absent from the workbook).
pub const EVOLUTION: TableSchema = TableSchema {
    name: "evolucion",
    columns: &[
        required(EVO_PROJECT, &[]),
        required(EVO_ORIGINAL, &["PRESUPUESTO ORIGINAL"]),
        required(EVO_MODIFIED, &["PRESUPUESTO MODIFICADO"]),
        required(EVO_COMMITTED, &[]),
        required(EVO_EXERCISED, &["PRESUPUESTO EJERCIDO"]),
    ],
};

// ============================================================================
// RESOLUTION
// ============================================================================

/// Canonical column name → index into the raw rows.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    indices: HashMap<&'static str, usize>,
}

impl ColumnMap {
    /// Index of a resolved column. `None` for optional columns absent from
    /// the source.
    pub fn get(&self, canonical: &'static str) -> Option<usize> {
        self.indices.get(canonical).copied()
    }
}

impl TableSchema {
    /// Headers of an empty substitute table, in declared column order.
    pub fn canonical_headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.canonical).collect()
    }

    /// Match the table's headers against this schema. Every required column
    /// must resolve (directly or via an alias) or the whole table load fails.
    pub fn resolve(&self, table: &RawTable) -> Result<ColumnMap, SourceError> {
        let mut by_header: HashMap<String, usize> = HashMap::new();
        for (idx, header) in table.headers.iter().enumerate() {
            // First occurrence wins for duplicated headers
            by_header
                .entry(canonicalize_header(header))
                .or_insert(idx);
        }

        let mut indices = HashMap::new();
        for spec in self.columns {
            let found = std::iter::once(spec.canonical)
                .chain(spec.aliases.iter().copied())
                .find_map(|name| by_header.get(&canonicalize_header(name)).copied());

            match found {
                Some(idx) => {
                    indices.insert(spec.canonical, idx);
                }
                None if spec.required => {
                    return Err(SourceError::MissingColumn {
                        table: self.name.to_string(),
                        column: spec.canonical.to_string(),
                    });
                }
                None => {}
            }
        }

        Ok(ColumnMap { indices })
    }
}

// ============================================================================
// TESTS
// ============================================================================
