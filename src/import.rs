//! Host filesystem import
//!
//! Copies host files into the cache under a virtual parent directory.
//! Dropping a folder keeps its name (`/project/<folder>/...`); scanning a
//! project maps the directory's contents straight onto the parent.

use crate::cache::PathUrlCache;
use crate::config::schema::ImportConfig;
use crate::error::{PreviewError, PreviewResult};
use crate::events::CacheEvent;
use crate::path;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A file that made it into the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedFile {
    pub path: String,
    pub address: String,
    pub size: u64,
}

/// A file that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFile {
    pub source: PathBuf,
    pub reason: String,
}

/// What an import did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<ImportedFile>,
    pub rejected: Vec<RejectedFile>,
}

impl ImportReport {
    pub fn total_bytes(&self) -> u64 {
        self.imported.iter().map(|f| f.size).sum()
    }
}

/// Copies host files into a cache
#[derive(Debug, Clone)]
pub struct FileImporter {
    byte_limit: u64,
}

impl FileImporter {
    pub fn new(byte_limit: u64) -> Self {
        Self { byte_limit }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.byte_limit)
    }

    /// Import a file or directory under `parent` (the project root if `None`).
    ///
    /// A directory is imported as a whole, so its own name becomes part of
    /// every cached path.
    pub async fn import(
        &self,
        cache: &PathUrlCache,
        source: &Path,
        parent: Option<&str>,
    ) -> PreviewResult<ImportReport> {
        let parent = parent
            .map(path::normalize)
            .unwrap_or_else(|| cache.project_root());
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PreviewError::InvalidSource(source.to_path_buf()))?;

        self.run(cache, source, &path::join(&parent, &name)).await
    }

    /// Import the contents of directory `dir` directly under `parent`
    pub async fn import_tree(
        &self,
        cache: &PathUrlCache,
        dir: &Path,
        parent: Option<&str>,
    ) -> PreviewResult<ImportReport> {
        if !dir.is_dir() {
            return Err(PreviewError::InvalidSource(dir.to_path_buf()));
        }
        let parent = parent
            .map(path::normalize)
            .unwrap_or_else(|| cache.project_root());

        self.run(cache, dir, &parent).await
    }

    async fn run(
        &self,
        cache: &PathUrlCache,
        source: &Path,
        target: &str,
    ) -> PreviewResult<ImportReport> {
        let files = collect(source.to_path_buf(), target.to_string()).await?;
        debug!("Importing {} files from {}", files.len(), source.display());

        let mut report = ImportReport::default();
        for (host, virtual_path, size) in files {
            // host names may carry escapes; report the key the cache stores
            let virtual_path = path::normalize(&virtual_path);
            if size > self.byte_limit {
                let err = PreviewError::ImportTooLarge {
                    path: host.clone(),
                    size,
                    limit: self.byte_limit,
                };
                warn!("Skipping import: {}", err);
                report.rejected.push(RejectedFile {
                    source: host,
                    reason: err.to_string(),
                });
                continue;
            }

            let content = tokio::fs::read(&host)
                .await
                .map_err(|e| PreviewError::io(format!("reading {}", host.display()), e))?;
            let mime = cache.mime_resolver().mime_for(&virtual_path);
            let address = cache.create_entry(&virtual_path, content, &mime).await?;

            report.imported.push(ImportedFile {
                path: virtual_path,
                address,
                size,
            });
        }

        if !report.imported.is_empty() {
            cache
                .notify(CacheEvent::Imported {
                    paths: report.imported.iter().map(|f| f.path.clone()).collect(),
                })
                .await;
        }

        info!(
            "Imported {} files ({} bytes), rejected {}",
            report.imported.len(),
            report.total_bytes(),
            report.rejected.len()
        );
        Ok(report)
    }
}

/// List `(host path, virtual path, size)` for every regular file in `source`
async fn collect(source: PathBuf, target: String) -> PreviewResult<Vec<(PathBuf, String, u64)>> {
    tokio::task::spawn_blocking(move || -> PreviewResult<Vec<(PathBuf, String, u64)>> {
        let meta = std::fs::metadata(&source)
            .map_err(|_| PreviewError::InvalidSource(source.clone()))?;

        if meta.is_file() {
            return Ok(vec![(source, target, meta.len())]);
        }
        if !meta.is_dir() {
            return Err(PreviewError::InvalidSource(source));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&source).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&source)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push((
                entry.path().to_path_buf(),
                path::join(&target, &relative),
                size,
            ));
        }
        Ok(files)
    })
    .await
    .map_err(|e| PreviewError::Internal(format!("import walk panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::events::ChangeSink;
    use crate::provider::ProviderMode;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Events(Mutex<Vec<CacheEvent>>);

    #[async_trait]
    impl ChangeSink for Events {
        async fn notify(&self, event: &CacheEvent) {
            self.0.lock().push(event.clone());
        }
    }

    async fn ready_cache(sink: Arc<Events>) -> PathUrlCache {
        let cache = PathUrlCache::new(&CacheConfig::default(), Arc::new("/project".to_string()))
            .with_sink(sink);
        cache.initialize(Some(ProviderMode::Persistent)).await.unwrap();
        cache
    }

    fn site() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("site").join("css")).unwrap();
        std::fs::write(temp.path().join("site").join("index.html"), "<h1>").unwrap();
        std::fs::write(temp.path().join("site").join("css").join("a.css"), "a{}").unwrap();
        temp
    }

    #[tokio::test]
    async fn directory_keeps_its_name() {
        let temp = site();
        let events = Arc::new(Events::default());
        let cache = ready_cache(events.clone()).await;

        let report = FileImporter::new(1024)
            .import(&cache, &temp.path().join("site"), None)
            .await
            .unwrap();

        let paths: Vec<&str> = report.imported.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/project/site/css/a.css", "/project/site/index.html"]);
        assert_eq!(report.total_bytes(), 7);

        let response = cache
            .fetch(&cache.address_of("/project/site/css/a.css"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.content_type(), Some("text/css"));

        let imported = events
            .0
            .lock()
            .iter()
            .any(|e| matches!(e, CacheEvent::Imported { paths } if paths.len() == 2));
        assert!(imported);
    }

    #[tokio::test]
    async fn tree_maps_contents_onto_parent() {
        let temp = site();
        let cache = ready_cache(Arc::new(Events::default())).await;

        let report = FileImporter::new(1024)
            .import_tree(&cache, &temp.path().join("site"), Some("/project/public"))
            .await
            .unwrap();

        assert_eq!(report.imported[1].path, "/project/public/index.html");
        assert_eq!(
            cache.path_of(&report.imported[1].address),
            "/project/public/index.html"
        );
    }

    #[tokio::test]
    async fn single_file_lands_under_parent() {
        let temp = site();
        let cache = ready_cache(Arc::new(Events::default())).await;

        let report = FileImporter::new(1024)
            .import(&cache, &temp.path().join("site").join("index.html"), None)
            .await
            .unwrap();
        assert_eq!(report.imported[0].path, "/project/index.html");
    }

    #[tokio::test]
    async fn escaped_host_names_report_the_cached_key() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a%20b.html"), "<p>").unwrap();
        let cache = ready_cache(Arc::new(Events::default())).await;

        let report = FileImporter::new(1024)
            .import_tree(&cache, temp.path(), None)
            .await
            .unwrap();

        assert_eq!(report.imported[0].path, "/project/a b.html");
        assert_eq!(cache.entries()[0].0, report.imported[0].path);
        assert_eq!(
            cache.path_of(&report.imported[0].address),
            report.imported[0].path
        );
    }

    #[tokio::test]
    async fn oversize_files_are_rejected() {
        let temp = site();
        std::fs::write(temp.path().join("site").join("big.bin"), vec![0u8; 64]).unwrap();
        let cache = ready_cache(Arc::new(Events::default())).await;

        let report = FileImporter::new(16)
            .import_tree(&cache, &temp.path().join("site"), None)
            .await
            .unwrap();

        assert_eq!(report.imported.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].source.ends_with("big.bin"));
        assert_eq!(cache.address_of("/project/big.bin"), "/project/big.bin");
    }

    #[tokio::test]
    async fn missing_source_is_invalid() {
        let temp = TempDir::new().unwrap();
        let cache = ready_cache(Arc::new(Events::default())).await;

        let err = FileImporter::new(1024)
            .import(&cache, &temp.path().join("nope"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::InvalidSource(_)));

        let err = FileImporter::new(1024)
            .import_tree(&cache, &temp.path().join("nope"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::InvalidSource(_)));
    }

    #[tokio::test]
    async fn import_requires_ready_cache() {
        let temp = site();
        let cache = PathUrlCache::new(&CacheConfig::default(), Arc::new("/project".to_string()));

        let err = FileImporter::new(1024)
            .import_tree(&cache, &temp.path().join("site"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::NotReady));
    }
}
