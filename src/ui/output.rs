//! Output functions for consistent CLI formatting

use super::context::UiContext;
use crate::import::{ImportedFile, RejectedFile};
use crate::mime::{self, MimeResolver};
use crate::provider::ProviderKind;
use console::{style, Style};

/// Outcome shown in front of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Ok,
    Warn,
    Info,
}

impl Mark {
    fn tag(self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Warn => "[WARN]",
            Self::Info => "[INFO]",
        }
    }

    fn color(self) -> Style {
        match self {
            Self::Ok => Style::new().green(),
            Self::Warn => Style::new().yellow(),
            Self::Info => Style::new().cyan(),
        }
    }
}

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
        println!();
    }
}

/// Closing line of a command
pub fn outro(ctx: &UiContext, mark: Mark, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(mark.color().bold().apply_to(message)).ok();
    } else {
        println!();
        println!("{} {}", mark.color().apply_to(mark.tag()), message);
    }
}

/// Display a section header
pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!("{}", style(title).bold());
    }
}

/// One progress line, with an optional dimmed detail
pub fn step(ctx: &UiContext, mark: Mark, message: &str, detail: Option<&str>) {
    if ctx.use_fancy_output() {
        let line = match detail {
            Some(detail) => format!("{} ({})", message, style(detail).dim()),
            None => message.to_string(),
        };
        match mark {
            Mark::Ok => cliclack::log::success(line),
            Mark::Warn => cliclack::log::warning(line),
            Mark::Info => cliclack::log::info(line),
        }
        .ok();
    } else {
        let tag = mark.color().apply_to(mark.tag());
        match detail {
            Some(detail) => println!("  {} {} ({})", tag, message, detail),
            None => println!("  {} {}", tag, message),
        }
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Whether a backing store can be used
pub fn store_capability(ctx: &UiContext, label: &str, available: bool) {
    let (value, mark) = if available {
        ("available", Mark::Ok)
    } else {
        ("unavailable", Mark::Warn)
    };
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(label).dim(), mark.color().apply_to(value));
    } else {
        println!("  {} {}: {}", mark.tag(), label, value);
    }
}

/// The provider a cache came up with and the prefix its addresses share
pub fn provider_ready(ctx: &UiContext, kind: ProviderKind, base: &str) {
    step(ctx, Mark::Ok, &format!("Using {}", kind), Some(base));
}

/// Cached entries as a `PATH / CONTENT / ADDRESS` table
pub fn entry_table(files: &[ImportedFile], mime: &dyn MimeResolver) {
    let width = files.iter().map(|f| f.path.len()).max().unwrap_or(0).max(4);

    println!();
    println!(
        "{:<width$}  {:<7}  {}",
        style("PATH").bold(),
        style("CONTENT").bold(),
        style("ADDRESS").bold(),
        width = width
    );
    for file in files {
        println!("{}", entry_row(file, mime, width));
    }
}

fn entry_row(file: &ImportedFile, mime: &dyn MimeResolver, width: usize) -> String {
    let content = if mime::is_text(&mime.mime_for(&file.path)) {
        "text"
    } else {
        "binary"
    };
    format!(
        "{:<width$}  {:<7}  {}",
        file.path,
        content,
        file.address,
        width = width
    )
}

/// A host file the import skipped
pub fn rejected(ctx: &UiContext, file: &RejectedFile) {
    step(ctx, Mark::Warn, &file.reason, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::ExtensionMimeResolver;

    fn imported(path: &str) -> ImportedFile {
        ImportedFile {
            path: path.to_string(),
            address: format!("http://localhost:8000/dist/vfs{}", path),
            size: 1,
        }
    }

    #[test]
    fn rows_classify_content() {
        let row = entry_row(&imported("/project/index.html"), &ExtensionMimeResolver, 20);
        assert!(row.starts_with("/project/index.html   text"));

        let row = entry_row(&imported("/project/logo.png"), &ExtensionMimeResolver, 20);
        assert!(row.contains("binary"));
        assert!(row.ends_with("/dist/vfs/project/logo.png"));
    }

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        // These should not panic
        intro(&ctx, "Test");
        section(&ctx, "Store");
        store_capability(&ctx, "Persistent store", false);
        provider_ready(&ctx, ProviderKind::Persistent, "http://localhost:8000/dist/vfs/");
        step(&ctx, Mark::Warn, "Skipped", Some("too large"));
        entry_table(&[imported("/project/a.css")], &ExtensionMimeResolver);
        outro(&ctx, Mark::Ok, "Done");
    }
}
