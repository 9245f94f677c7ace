// Dataset load + process-wide cache
// One workbook fetch per load cycle feeds every table; the cache then serves
// the loaded dataset until an explicit user-triggered refresh invalidates it.

use crate::config::SourceConfig;
use crate::normalize::{
    annotate_links, normalize_contracts, normalize_documents, normalize_evolution,
    BudgetEvolutionRecord, ContractRecord, NormalizeStats, RelatedDocumentRecord,
};
use crate::schema;
use crate::source::{fetch_all_files, FileListing, RawTable, SourceError, TableSource};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};

/// The main contract table is always the first sheet of the workbook.
pub const CONTRACTS_SHEET_INDEX: usize = 0;
/// Optional named sheets. Absence is recovered, not fatal.
pub const CLC_SHEET: &str = "CLC";
pub const EVOLUTION_SHEET: &str = "EVOLUCION";
/// MIME filter for the linked-file folder scan.
pub const LINKED_FILE_MIME: &str = "application/pdf";

// ============================================================================
// DATASET
// ============================================================================

/// Everything one load cycle produced. Immutable once loaded; filter runs
/// borrow from it and never mutate it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub contracts: Vec<ContractRecord>,
    pub evolution: Vec<BudgetEvolutionRecord>,
    pub documents: Vec<RelatedDocumentRecord>,
    /// Lenient-parse observability across all three tables.
    pub stats: NormalizeStats,
    /// Content hash of the fetched tables; identical refetches are visible
    /// in the logs without diffing the data.
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

fn fingerprint(tables: &[&RawTable]) -> String {
    let mut hasher = Sha256::new();
    for table in tables {
        for header in &table.headers {
            hasher.update(header.as_bytes());
            hasher.update(b"\x1f");
        }
        hasher.update(b"\x1e");
        for row in &table.rows {
            for cell in row {
                hasher.update(cell.as_bytes());
                hasher.update(b"\x1f");
            }
            hasher.update(b"\x1e");
        }
        hasher.update(b"\x1d");
    }
    format!("{:x}", hasher.finalize())
}

/// Resolve an optional named sheet: present → its table, absent → an empty
/// table with the expected schema. Any other source failure propagates.
fn optional_sheet(
    workbook: &crate::source::Workbook,
    name: &str,
    schema: &schema::TableSchema,
) -> Result<RawTable, SourceError> {
    match workbook.sheet_named(name) {
        Ok(table) => Ok(table.clone()),
        Err(err) if err.is_sheet_not_found() => {
            debug!("sheet {:?} absent, substituting empty table", name);
            Ok(RawTable::empty(&schema.canonical_headers()))
        }
        Err(err) => Err(err),
    }
}

/// Run one full load cycle: fetch the workbook exactly once, normalize the
/// three tables, and annotate CLC documents with links from the
/// fully-paginated folder listing.
pub fn load_dataset(
    source: &dyn TableSource,
    listing: Option<&dyn FileListing>,
    config: &SourceConfig,
) -> Result<Dataset, SourceError> {
    // Single batched fetch per load cycle; every table below reads from it.
    let workbook = source.fetch_workbook()?;

    let contracts_table = workbook.sheet_at(CONTRACTS_SHEET_INDEX)?.clone();
    let clc_table = optional_sheet(&workbook, CLC_SHEET, &schema::CLC)?;
    let evolution_table = optional_sheet(&workbook, EVOLUTION_SHEET, &schema::EVOLUTION)?;

    let fingerprint = fingerprint(&[&contracts_table, &clc_table, &evolution_table]);

    let contracts = normalize_contracts(&contracts_table)?;
    let documents = normalize_documents(&clc_table)?;
    let evolution = normalize_evolution(&evolution_table)?;

    let mut documents_records = documents.records;
    if let Some(listing) = listing {
        let files = fetch_all_files(listing, &config.linked_folder_id, LINKED_FILE_MIME)?;
        debug!("folder scan found {} linked files", files.len());
        annotate_links(&mut documents_records, &files);
    }

    let stats = contracts
        .stats
        .merge(documents.stats)
        .merge(evolution.stats);

    if stats.coerced > 0 {
        warn!("{} amount cells failed to parse and were coerced to zero", stats.coerced);
    }
    info!(
        "loaded {} contract rows, {} CLC rows, {} evolution rows (fingerprint {})",
        contracts.records.len(),
        documents_records.len(),
        evolution.records.len(),
        &fingerprint[..12]
    );

    Ok(Dataset {
        contracts: contracts.records,
        evolution: evolution.records,
        documents: documents_records,
        stats,
        fingerprint,
        loaded_at: Utc::now(),
    })
}

// ============================================================================
// PROCESS-WIDE CACHE
// ============================================================================

/// Load-once-per-invalidation cache of the dataset. Only an explicit
/// [`DatasetCache::refresh`] clears it; the next access refetches.
#[derive(Debug, Default)]
pub struct DatasetCache {
    current: Option<Dataset>,
}

impl DatasetCache {
    pub fn new() -> Self {
        DatasetCache { current: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    /// Serve the cached dataset, loading it first if the cache is empty.
    /// A failed load leaves the cache empty, so the user's next refresh
    /// retries from scratch.
    pub fn get_or_load(
        &mut self,
        source: &dyn TableSource,
        listing: Option<&dyn FileListing>,
        config: &SourceConfig,
    ) -> Result<&Dataset, SourceError> {
        if self.current.is_none() {
            self.current = Some(load_dataset(source, listing, config)?);
        }
        Ok(self.current.as_ref().expect("dataset just loaded"))
    }

    /// User-triggered invalidation. This is also the retry mechanism after a
    /// failed or outdated load; there is no automatic retry.
    pub fn refresh(&mut self) {
        if self.current.is_some() {
            info!("cache invalidated by refresh");
        }
        self.current = None;
    }
}

// ============================================================================
// TESTS
// ============================================================================
