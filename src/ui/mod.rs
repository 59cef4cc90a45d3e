//! Terminal output for the CLI
//!
//! Uses `cliclack` framing on interactive terminals and falls back to plain
//! bracketed prefixes (`[OK]`, `[WARN]`) in CI and when piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use preview_cache::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "Preview Cache Status");
//! ui::store_capability(&ctx, "Persistent store", true);
//! ui::outro(&ctx, ui::Mark::Ok, "Ready");
//! ```

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    entry_table, intro, key_value, outro, provider_ready, rejected, section, step,
    store_capability, Mark,
};
