// Presentation formatter
// Shapes aggregated results into display-ready rows. Currency fields render
// as fixed two-decimal, thousands-grouped strings with the `$` marker the
// dashboard uses. The core never renders; it only hands these structs to the
// UI layer.

use crate::aggregate::{summary_totals, AggregatedContract};
use crate::filter::FilterResult;
use crate::normalize::{BudgetEvolutionRecord, FileLink, RelatedDocumentRecord};
use crate::schema;
use num_format::{Locale, ToFormattedString as _};
use serde::Serialize;

// ============================================================================
// CURRENCY RENDERING
// ============================================================================

/// Render an amount as `$ 1,234.56`: two decimals, en-locale thousands
/// grouping, sign ahead of the marker. Round-trips through
/// [`crate::normalize::parse_amount`].
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let integer = (cents.abs() / 100).to_formatted_string(&Locale::en);
    let fraction = cents.abs() % 100;
    format!("{}$ {}.{:02}", sign, integer, fraction)
}

/// Render a percent field as the source displays it (one decimal).
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

// ============================================================================
// DASHBOARD VIEW
// ============================================================================

/// One display-ready contract row; every amount already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractRow {
    pub contract_no: String,
    pub description: String,
    pub total: String,
    pub exercised: String,
    pub pending: String,
    pub pct_paid: String,
    pub pct_pending: String,
}

/// Metric tiles over the filtered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub total: String,
    pub exercised: String,
    pub pending: String,
}

/// Project budget evolution, shown when a single project is selected and the
/// evolution table knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionRow {
    pub project: String,
    pub original: String,
    pub modified: String,
    pub committed: String,
    pub exercised: String,
}

/// The assembled results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardTable {
    pub rows: Vec<ContractRow>,
    pub summary: SummaryRow,
    pub evolution: Option<EvolutionRow>,
}

impl DashboardTable {
    /// Column headers, matching the source workbook names the users know.
    pub fn headers() -> [&'static str; 7] {
        [
            schema::CONTRACT_NO,
            schema::DESCRIPTION,
            schema::TOTAL,
            schema::EXERCISED,
            schema::PENDING,
            schema::PCT_PAID,
            schema::PCT_PENDING,
        ]
    }
}

/// What the results area shows. Rendering the full unfiltered dataset by
/// default is deliberately guarded against; no filter and no matches are
/// distinct states with distinct indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DashboardView {
    /// No filter is active: prompt instead of the whole table.
    ApplyFilterPrompt,
    /// Filters are active but matched nothing.
    NoMatches,
    Table(DashboardTable),
}

impl DashboardView {
    /// User-facing indicator text, as the dashboard phrases it.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            DashboardView::ApplyFilterPrompt => Some("Aplica un filtro para ver resultados"),
            DashboardView::NoMatches => Some("Sin resultados para los filtros aplicados"),
            DashboardView::Table(_) => None,
        }
    }
}

/// Assemble the results view from one filter run. The evolution row is
/// attached only when the selection pins a single project that the evolution
/// table knows about.
pub fn build_dashboard(
    result: &FilterResult,
    groups: &[AggregatedContract],
    evolution: &[BudgetEvolutionRecord],
) -> DashboardView {
    if !result.selection.is_active() {
        return DashboardView::ApplyFilterPrompt;
    }
    if groups.is_empty() {
        return DashboardView::NoMatches;
    }

    let rows = groups
        .iter()
        .map(|g| ContractRow {
            contract_no: g.contract_no.clone(),
            description: g.description.clone(),
            total: format_currency(g.total),
            exercised: format_currency(g.exercised),
            pending: format_currency(g.pending),
            pct_paid: format_percent(g.pct_paid),
            pct_pending: format_percent(g.pct_pending),
        })
        .collect();

    let totals = summary_totals(groups);
    let summary = SummaryRow {
        total: format_currency(totals.total),
        exercised: format_currency(totals.exercised),
        pending: format_currency(totals.pending),
    };

    let evolution_row = result.selection.project.as_ref().and_then(|project| {
        evolution
            .iter()
            .find(|e| &e.project == project)
            .map(|e| EvolutionRow {
                project: e.project.clone(),
                original: format_currency(e.original),
                modified: format_currency(e.modified),
                committed: format_currency(e.committed),
                exercised: format_currency(e.exercised),
            })
    });

    DashboardView::Table(DashboardTable {
        rows,
        summary,
        evolution: evolution_row,
    })
}

// ============================================================================
// CLC SECTION
// ============================================================================

/// One display-ready CLC row. The link, when present, is the clickable
/// reference to the stored file; absent is an expected state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClcRow {
    pub document_id: String,
    pub amount: String,
    pub link: Option<FileLink>,
}

/// The related-document area for a selected contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClcSection {
    /// Explicit indicator instead of an empty table.
    NoDocuments,
    Documents { rows: Vec<ClcRow>, total: String },
}

impl ClcSection {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ClcSection::NoDocuments => Some("Este contrato no tiene CLC registrados"),
            ClcSection::Documents { .. } => None,
        }
    }
}

/// CLC rows for one contract (exact match on contract number), with their own
/// total. CLC amounts never mix into the contract-level sums.
pub fn build_clc_section(documents: &[RelatedDocumentRecord], contract_no: &str) -> ClcSection {
    let matching: Vec<&RelatedDocumentRecord> = documents
        .iter()
        .filter(|d| d.contract_no == contract_no)
        .collect();

    if matching.is_empty() {
        return ClcSection::NoDocuments;
    }

    let total: f64 = matching.iter().map(|d| d.amount).sum();
    let rows = matching
        .into_iter()
        .map(|d| ClcRow {
            document_id: d.document_id.clone(),
            amount: format_currency(d.amount),
            link: d.link.clone(),
        })
        .collect();

    ClcSection::Documents {
        rows,
        total: format_currency(total),
    }
}

// ============================================================================
// TESTS
// ============================================================================
