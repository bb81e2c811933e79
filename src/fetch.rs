use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::ThemeError;
use crate::manifest::ThemeManifest;

/// Where theme packages are read from. Pure I/O: no retries, no caching; a
/// failure aborts the apply step that asked for the asset.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Reads and parses `<theme>/manifest.json`.
    async fn fetch_manifest(&self, theme: &str) -> Result<ThemeManifest, ThemeError>;

    /// Reads one of the theme's files as text.
    async fn fetch_text(&self, theme: &str, file: &str) -> Result<String, ThemeError>;
}

/// Builds the URL a theme asset is presented to the webview under.
/// Stylesheet links use this plain form; the protocol's no-cache response
/// headers keep re-applied themes fresh.
pub fn asset_url(theme: &str, file: &str) -> String {
    format!("theme://{}/{}", theme, file)
}

/// Cache-busted variant used for script modules, where a cached copy would
/// mean a previous load's code runs again. The `t` query parameter is the
/// freshness token; the protocol strips it before resolving the file.
pub fn busted_asset_url(theme: &str, file: &str, token: i64) -> String {
    format!("{}?t={}", asset_url(theme, file), token)
}

/// Millisecond timestamp used as the cache-defeating token for one load.
pub fn freshness_token() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Reads theme packages from a directory on disk.
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolves a path under the themes root, refusing anything that could
    /// escape it (absolute paths, parent components).
    fn resolve(&self, theme: &str, file: &str) -> Result<PathBuf, ThemeError> {
        let mut path = self.root.clone();
        for raw in [theme, file] {
            let rel = Path::new(raw);
            if rel.is_absolute()
                || rel
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)))
            {
                return Err(ThemeError::Fetch {
                    path: format!("{}/{}", theme, file),
                    reason: "path escapes the themes directory".into(),
                });
            }
            path.push(rel);
        }
        Ok(path)
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn fetch_manifest(&self, theme: &str) -> Result<ThemeManifest, ThemeError> {
        let path = self.resolve(theme, "manifest.json").map_err(|_| {
            ThemeError::Manifest {
                theme: theme.to_string(),
                reason: "invalid theme name".into(),
            }
        })?;
        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ThemeError::Manifest {
                    theme: theme.to_string(),
                    reason: e.to_string(),
                })?;
        serde_json::from_str(&content).map_err(|e| ThemeError::Manifest {
            theme: theme.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_text(&self, theme: &str, file: &str) -> Result<String, ThemeError> {
        let path = self.resolve(theme, file)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ThemeError::Fetch {
                path: format!("{}/{}", theme, file),
                reason: e.to_string(),
            })
    }
}
