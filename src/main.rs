// Inventory Handler CLI - one batch run, start to finish

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use inventory_handler::{
    logging, AnomalyAuditor, BatchAssembler, Config, EmptyBatch, PrioritySorter,
    SourceRecordBuilder, Stats,
};

fn main() -> Result<()> {
    let args = match CliArgs::parse(env::args().skip(1)) {
        Some(args) => args,
        None => {
            eprintln!("Usage: inventory-handler <input-dir> <output.csv> [--master-list <file>] [--config <file>]");
            std::process::exit(2);
        }
    };

    logging::init_logging();

    let config = match &args.config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    run_batch(&args, &config)
}

// ============================================================================
// ARGUMENTS
// ============================================================================

struct CliArgs {
    input_dir: PathBuf,
    output_path: PathBuf,
    master_list_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Option<Self> {
        let mut positional = Vec::new();
        let mut master_list_path = None;
        let mut config_path = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--master-list" => master_list_path = Some(PathBuf::from(args.next()?)),
                "--config" => config_path = Some(PathBuf::from(args.next()?)),
                _ => positional.push(arg),
            }
        }

        if positional.len() != 2 {
            return None;
        }
        let mut positional = positional.into_iter();
        Some(CliArgs {
            input_dir: PathBuf::from(positional.next()?),
            output_path: PathBuf::from(positional.next()?),
            master_list_path,
            config_path,
        })
    }
}

// ============================================================================
// BATCH RUN
// ============================================================================

fn run_batch(args: &CliArgs, config: &Config) -> Result<()> {
    let builder = SourceRecordBuilder::new(config);
    let mut stats = Stats::new();

    // Step 1: process messages, one at a time, in listing order
    let mut attachment_group = Vec::new();
    let mut workflow_group = Vec::new();

    for path in message_files(&args.input_dir)? {
        let produced = builder.process_file(&path, &mut stats);
        attachment_group.extend(produced.attachment_records);
        workflow_group.extend(produced.workflow_record);
    }
    info!(
        messages = stats.total_messages,
        attachment_rows = attachment_group.len(),
        workflow_rows = workflow_group.len(),
        "Message processing complete"
    );

    // Step 2: combine, clean, and order
    let assembler = BatchAssembler::new(config)?;
    let records = match assembler.assemble(attachment_group, workflow_group) {
        Ok(records) => records,
        Err(e) if e.downcast_ref::<EmptyBatch>().is_some() => {
            println!("No data found to process.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let mut records = PrioritySorter::new(config)?.sort(records);

    // Step 3: audit pass, master list optional and non-fatal
    let master = args.master_list_path.as_deref().and_then(load_master_or_warn);
    let auditor = AnomalyAuditor::new(config);
    let outcome = auditor.audit(&mut records, master.as_ref());

    // Step 4: write the report
    inventory_handler::report::write_csv(&args.output_path, &records, &outcome.flags)
        .with_context(|| format!("Failed to write {:?}", args.output_path))?;

    let output_name = args
        .output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.output_path.display().to_string());
    println!(
        "\n{}",
        inventory_handler::report::summary(&output_name, &records, &stats, &outcome)
    );

    Ok(())
}

/// Message files in the input directory, sorted by name so the final
/// record order (and the sorter's stability guarantee) is deterministic
fn message_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list input directory: {:?}", dir))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn load_master_or_warn(path: &Path) -> Option<std::collections::HashSet<String>> {
    match inventory_handler::load_master_list(path) {
        Ok(set) => {
            info!(serials = set.len(), "Loaded master identifier list");
            Some(set)
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Master list unavailable, skipping serial check");
            eprintln!("Could not read master list ({}); serial check skipped.", e);
            None
        }
    }
}
