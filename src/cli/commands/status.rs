//! Status command - report store capabilities and provider selection
//!
//! Only probes; it never initializes a cache, so persistent stores are left
//! untouched.

use crate::cli::args::StatusArgs;
use crate::config::{self, Config, StoreBackend};
use crate::error::PreviewResult;
use crate::path;
use crate::provider::{persistent, select, Capabilities, ProviderKind};
use crate::ui::{self, Mark, UiContext};

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> PreviewResult<()> {
    let ctx = UiContext::detect();
    let stores = config::store_set(&config.cache);

    ui::intro(&ctx, "Preview Cache Status");

    let capabilities = Capabilities::probe(stores.as_ref()).await;
    ui::section(&ctx, "Store");
    ui::key_value(&ctx, "Backend", stores.name());
    if config.cache.store == StoreBackend::Disk {
        let dir = config
            .cache
            .store_dir
            .clone()
            .unwrap_or_else(config::ConfigManager::stores_dir);
        ui::key_value(&ctx, "Location", &dir.display().to_string());
    }
    ui::store_capability(&ctx, "Persistent store", capabilities.persistent_store);

    let mode = args.mode.unwrap_or(config.cache.mode);
    let kind = select(capabilities, mode);
    let origin = config.cache.origin.trim_end_matches('/');
    let root = path::normalize(&config.cache.project_root);
    let base = match kind {
        ProviderKind::Ephemeral => format!("{}/", origin),
        ProviderKind::Persistent => persistent::base_address(origin, &root),
    };

    ui::section(&ctx, "Provider");
    ui::key_value(&ctx, "Mode", &format!("{:?}", mode).to_lowercase());
    ui::key_value(&ctx, "Selected", kind.name());
    ui::key_value(&ctx, "Project root", &root);
    ui::key_value(&ctx, "Base address", &base);
    ui::key_value(
        &ctx,
        "Rewrites URLs",
        if kind == ProviderKind::Ephemeral { "yes" } else { "no" },
    );

    if kind == ProviderKind::Persistent && !capabilities.persistent_store {
        ui::outro(
            &ctx,
            Mark::Warn,
            "Persistent mode requested but the store is unavailable",
        );
    } else {
        ui::outro(&ctx, Mark::Ok, "Ready");
    }

    Ok(())
}
