// Contract Control - Core Library
// Filter-and-aggregate pipeline for the contract/payment dashboard:
// raw sheets → normalize → filter → aggregate → format, plus the dataset
// cache and the export serialization. Exposed for the CLI and tests.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod export;
pub mod filter;
pub mod format;
pub mod normalize;
pub mod schema;
pub mod source;

// Re-export commonly used types
pub use aggregate::{aggregate, summary_totals, AggregatedContract, SummaryTotals};
pub use cache::{load_dataset, Dataset, DatasetCache};
pub use config::SourceConfig;
pub use export::{export_filename, export_table};
pub use filter::{
    company_options, project_options, reduce, run_filters, ContractMatchMode, FilterAction,
    FilterResult, FilterSelection,
};
pub use format::{
    build_clc_section, build_dashboard, format_currency, format_percent, ClcRow, ClcSection,
    ContractRow, DashboardTable, DashboardView, EvolutionRow, SummaryRow,
};
pub use normalize::{
    annotate_links, parse_amount, BudgetEvolutionRecord, ContractRecord, FileLink,
    NormalizeStats, RelatedDocumentRecord,
};
pub use source::{
    fetch_all_files, CsvDirSource, FileListing, FilePage, ListedFile, RawTable, SourceError,
    TableSource, Workbook,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// DASHBOARD RUN
// ============================================================================

/// Everything one interaction produces: the results view, the CLC section
/// when a single contract is pinned, and the dependent selector options.
#[derive(Debug, Clone)]
pub struct DashboardOutput {
    pub view: DashboardView,
    /// Present only when the contract filter pins exactly one contract.
    pub clc: Option<ClcSection>,
    /// Contract numbers still selectable given the project/company choice.
    pub contract_options: Vec<String>,
    /// The selection actually applied (stale contract choices cleared).
    pub selection: FilterSelection,
}

/// One full synchronous re-run of filter → aggregate → format against a
/// loaded dataset. Called once per user interaction; the dataset itself is
/// only touched by the cache layer.
pub fn render_dashboard(
    dataset: &Dataset,
    selection: &FilterSelection,
    mode: ContractMatchMode,
) -> DashboardOutput {
    let result = run_filters(&dataset.contracts, selection, mode);
    let groups = aggregate(&result.rows);
    let view = build_dashboard(&result, &groups, &dataset.evolution);

    let clc = if result.selection.contract.is_some() {
        let mut contract_nos: Vec<&str> = groups.iter().map(|g| g.contract_no.as_str()).collect();
        contract_nos.sort_unstable();
        contract_nos.dedup();
        match contract_nos[..] {
            [only] => Some(build_clc_section(&dataset.documents, only)),
            _ => None,
        }
    } else {
        None
    };

    DashboardOutput {
        view,
        clc,
        contract_options: result.contract_options,
        selection: result.selection,
    }
}

// ============================================================================
// TESTS
// ============================================================================
