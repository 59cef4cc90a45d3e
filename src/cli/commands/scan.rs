//! Scan command - import a host directory and list the resulting addresses

use crate::cache::PathUrlCache;
use crate::cli::args::{OutputFormat, ScanArgs};
use crate::config::{self, Config, ConfigManager};
use crate::error::PreviewResult;
use crate::events::JournalSink;
use crate::import::{FileImporter, ImportReport};
use crate::provider::ProviderKind;
use crate::ui::{self, Mark, UiContext};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct ScanOutput<'a> {
    provider: ProviderKind,
    base_address: String,
    #[serde(flatten)]
    report: &'a ImportReport,
}

/// Execute the scan command
pub async fn execute(args: ScanArgs, config: &Config) -> PreviewResult<()> {
    let root = args
        .root
        .clone()
        .unwrap_or_else(|| config.cache.project_root.clone());

    let cache = PathUrlCache::new(&config.cache, Arc::new(root))
        .with_store_set(config::store_set(&config.cache))
        .with_sink(Arc::new(JournalSink::new(
            ConfigManager::journal_path(),
            config.general.journal,
        )));

    let kind = cache.initialize(args.mode).await?;
    let report = FileImporter::from_config(&config.import)
        .import_tree(&cache, &args.dir, None)
        .await?;
    let base_address = cache.base_address()?;

    match args.format {
        OutputFormat::Table => print_table(&cache, kind, &base_address, &report),
        OutputFormat::Json => {
            let output = ScanOutput {
                provider: kind,
                base_address,
                report: &report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for file in &report.imported {
                println!("{}\t{}", file.path, file.address);
            }
        }
    }

    Ok(())
}

fn print_table(cache: &PathUrlCache, kind: ProviderKind, base: &str, report: &ImportReport) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Preview Cache Scan");
    ui::provider_ready(&ctx, kind, base);

    if report.imported.is_empty() {
        ui::step(&ctx, Mark::Info, "No files imported", None);
    } else {
        ui::entry_table(&report.imported, cache.mime_resolver().as_ref());
    }

    for rejected in &report.rejected {
        ui::rejected(&ctx, rejected);
    }

    let summary = format!(
        "{} file(s), {} bytes cached",
        report.imported.len(),
        report.total_bytes()
    );
    if report.rejected.is_empty() {
        ui::outro(&ctx, Mark::Ok, &summary);
    } else {
        ui::outro(
            &ctx,
            Mark::Warn,
            &format!("{}, {} skipped", summary, report.rejected.len()),
        );
    }
}
