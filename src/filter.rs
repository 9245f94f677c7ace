// Filter engine
// Immutable selection state + pure reducer, ordered predicates, and the
// dependent contract-option derivation.

use crate::normalize::ContractRecord;
use serde::{Deserialize, Serialize};

// ============================================================================
// SELECTION STATE
// ============================================================================

/// One render's filter choices. `None` means "all" for project/company and
/// "none selected" for contract. The struct is never mutated in place: user
/// actions go through [`reduce`] and produce the next state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub project: Option<String>,
    pub company: Option<String>,
    pub contract: Option<String>,
}

impl FilterSelection {
    /// Whether any filter is applied. Distinguishes "identity transform"
    /// from "filters applied but zero rows matched" downstream.
    pub fn is_active(&self) -> bool {
        self.project.is_some() || self.company.is_some() || self.contract.is_some()
    }
}

/// A user interaction with the filter controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterAction {
    /// Choose a project, or `None` to return to "all".
    SetProject(Option<String>),
    /// Choose a company, or `None` to return to "all".
    SetCompany(Option<String>),
    /// Choose or type a contract query, or `None` to clear it.
    SetContract(Option<String>),
    /// Clear every filter.
    Reset,
}

/// Next selection from (current selection, action). Pure; empty strings are
/// treated as cleared choices so UI layers can pass raw input through.
pub fn reduce(current: &FilterSelection, action: FilterAction) -> FilterSelection {
    fn non_empty(choice: Option<String>) -> Option<String> {
        choice.filter(|s| !s.trim().is_empty())
    }

    let mut next = current.clone();
    match action {
        FilterAction::SetProject(choice) => next.project = non_empty(choice),
        FilterAction::SetCompany(choice) => next.company = non_empty(choice),
        FilterAction::SetContract(choice) => next.contract = non_empty(choice),
        FilterAction::Reset => next = FilterSelection::default(),
    }
    next
}

// ============================================================================
// CONTRACT MATCH SEMANTICS
// ============================================================================

/// How the contract predicate interprets the selected value. Dropdown
/// variants of the dashboard select exactly; free-text variants search by
/// case-insensitive substring. Both exist in production, so the choice is
/// configuration, not a constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractMatchMode {
    #[default]
    Exact,
    Substring,
}

impl ContractMatchMode {
    fn matches(&self, contract_no: &str, query: &str) -> bool {
        match self {
            ContractMatchMode::Exact => contract_no == query,
            ContractMatchMode::Substring => contract_no
                .to_lowercase()
                .contains(&query.to_lowercase()),
        }
    }
}

// ============================================================================
// FILTER RUN
// ============================================================================

/// Output of one filter run.
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Rows surviving every predicate, in source order.
    pub rows: Vec<ContractRecord>,
    /// Contract numbers still selectable given the project/company choice.
    /// Always derived from the project/company-filtered subset, never from
    /// the full table and never narrowed by the contract filter itself.
    pub contract_options: Vec<String>,
    /// The selection actually applied: a stale contract choice (one that
    /// selects none of the options) has been reset to none.
    pub selection: FilterSelection,
}

/// Apply the selection to the normalized records, in order: project equality,
/// company equality, then the contract predicate.
pub fn run_filters(
    records: &[ContractRecord],
    selection: &FilterSelection,
    mode: ContractMatchMode,
) -> FilterResult {
    let base: Vec<&ContractRecord> = records
        .iter()
        .filter(|r| match &selection.project {
            Some(p) => &r.project == p,
            None => true,
        })
        .filter(|r| match &selection.company {
            Some(c) => &r.company == c,
            None => true,
        })
        .collect();

    let contract_options = distinct(base.iter().map(|r| r.contract_no.as_str()));

    // Stale contract choices reset to none instead of silently matching
    // nothing forever.
    let contract = selection.contract.clone().filter(|query| {
        contract_options
            .iter()
            .any(|option| mode.matches(option, query))
    });

    let rows: Vec<ContractRecord> = base
        .into_iter()
        .filter(|r| match &contract {
            Some(query) => mode.matches(&r.contract_no, query),
            None => true,
        })
        .cloned()
        .collect();

    FilterResult {
        rows,
        contract_options,
        selection: FilterSelection {
            project: selection.project.clone(),
            company: selection.company.clone(),
            contract,
        },
    }
}

/// Distinct project names across the full table, for the project selector.
pub fn project_options(records: &[ContractRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.project.as_str()))
}

/// Distinct company names across the full table, for the company selector.
pub fn company_options(records: &[ContractRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.company.as_str()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if !value.is_empty() && seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
