// Contract Control - CLI
// Loads a workbook from a directory of CSV sheets, applies the requested
// filters, and prints the dashboard the UI layer would render.

use anyhow::{bail, Context, Result};
use std::env;

use contract_control::{
    company_options, export_filename, export_table, project_options, reduce, render_dashboard,
    ClcSection, ContractMatchMode, CsvDirSource, DashboardView, DatasetCache, FilterAction,
    FilterSelection, SourceConfig,
};

struct CliArgs {
    data_dir: String,
    config_path: Option<String>,
    project: Option<String>,
    company: Option<String>,
    contract: Option<String>,
    substring: bool,
    export_path: Option<String>,
}

fn take_value(iter: &mut std::iter::Peekable<std::vec::IntoIter<String>>, name: &str) -> Result<String> {
    iter.next()
        .with_context(|| format!("{} requires a value", name))
}

fn parse_args(mut args: Vec<String>) -> Result<CliArgs> {
    if args.is_empty() {
        bail!(
            "Usage: contract-control <data-dir> [--config FILE] [--project P] \
             [--company E] [--contract C] [--substring] [--export [FILE]]"
        );
    }

    let data_dir = args.remove(0);
    let mut parsed = CliArgs {
        data_dir,
        config_path: None,
        project: None,
        company: None,
        contract: None,
        substring: false,
        export_path: None,
    };

    let mut iter = args.into_iter().peekable();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--config" => parsed.config_path = Some(take_value(&mut iter, "--config")?),
            "--project" => parsed.project = Some(take_value(&mut iter, "--project")?),
            "--company" => parsed.company = Some(take_value(&mut iter, "--company")?),
            "--contract" => parsed.contract = Some(take_value(&mut iter, "--contract")?),
            "--substring" => parsed.substring = true,
            "--export" => {
                // Path is optional; default is the date-stamped filename
                parsed.export_path = match iter.peek() {
                    Some(value) if !value.starts_with("--") => iter.next(),
                    _ => Some(export_filename(chrono::Utc::now().date_naive())),
                };
            }
            other => bail!("Unknown argument: {}", other),
        }
    }

    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args(env::args().skip(1).collect())?;

    let config = match &args.config_path {
        Some(path) => SourceConfig::from_file(path)?,
        None => SourceConfig::default(),
    };
    let mode = if args.substring {
        ContractMatchMode::Substring
    } else {
        config.contract_match
    };

    // Build the selection the way the UI would: one action at a time
    let mut selection = FilterSelection::default();
    selection = reduce(&selection, FilterAction::SetProject(args.project.clone()));
    selection = reduce(&selection, FilterAction::SetCompany(args.company.clone()));
    selection = reduce(&selection, FilterAction::SetContract(args.contract.clone()));

    let source = CsvDirSource::new(&args.data_dir);
    let mut cache = DatasetCache::new();
    let dataset = cache
        .get_or_load(&source, None, &config)
        .context("Failed to load workbook")?;

    println!("Loaded {} contract rows from {}", dataset.contracts.len(), args.data_dir);
    if dataset.stats.coerced > 0 {
        println!("  ({} amount cells coerced to zero)", dataset.stats.coerced);
    }

    let output = render_dashboard(dataset, &selection, mode);

    match &output.view {
        DashboardView::ApplyFilterPrompt => {
            println!("\n{}", output.view.message().unwrap_or_default());
            println!("\nProyectos: {}", project_options(&dataset.contracts).join(", "));
            println!("Empresas: {}", company_options(&dataset.contracts).join(", "));
        }
        DashboardView::NoMatches => {
            println!("\n{}", output.view.message().unwrap_or_default());
        }
        DashboardView::Table(table) => {
            println!("\nResultados");
            println!(
                "{:<14} {:<32} {:>16} {:>16} {:>16} {:>9} {:>9}",
                "N° CONTRATO", "DESCRIPCION", "TOTAL", "EJERCIDO", "PENDIENTE", "% PAG", "% PEND"
            );
            for row in &table.rows {
                println!(
                    "{:<14} {:<32} {:>16} {:>16} {:>16} {:>9} {:>9}",
                    row.contract_no,
                    row.description,
                    row.total,
                    row.exercised,
                    row.pending,
                    row.pct_paid,
                    row.pct_pending
                );
            }
            println!(
                "\nTotal: {}   Ejercido: {}   Pendiente: {}",
                table.summary.total, table.summary.exercised, table.summary.pending
            );

            if let Some(evo) = &table.evolution {
                println!(
                    "\nEvolución presupuestal ({}): original {}, modificado {}, comprometido {}, ejercido {}",
                    evo.project, evo.original, evo.modified, evo.committed, evo.exercised
                );
            }

            if let Some(path) = &args.export_path {
                let bytes = export_table(table)?;
                std::fs::write(path, bytes)
                    .with_context(|| format!("Failed to write export file: {}", path))?;
                println!("\nExportado a {}", path);
            }
        }
    }

    match &output.clc {
        Some(ClcSection::NoDocuments) => {
            println!("\nCLC del contrato seleccionado");
            println!("{}", ClcSection::NoDocuments.message().unwrap_or_default());
        }
        Some(ClcSection::Documents { rows, total }) => {
            println!("\nCLC del contrato seleccionado");
            for row in rows {
                match &row.link {
                    Some(link) => println!(
                        "{:<14} {:>16}   [{}]",
                        row.document_id, row.amount, link.name
                    ),
                    None => println!("{:<14} {:>16}", row.document_id, row.amount),
                }
            }
            println!("Total CLC: {}", total);
        }
        None => {}
    }

    if !output.contract_options.is_empty() {
        println!(
            "\nContratos disponibles: {}",
            output.contract_options.join(", ")
        );
    }

    Ok(())
}
