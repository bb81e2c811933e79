//! Lifecycle coordinator: decides a theme's type, sequences the injection
//! and script steps, and owns the reset-before-apply guarantee.

use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::ThemeError;
use crate::fetch::{self, AssetSource};
use crate::host::{HostBridge, NoticeLevel};
use crate::inject;
use crate::manifest::{ThemeManifest, ThemeType};
use crate::registry::{LoadedScript, LoadedTheme};
use crate::script::{HookKind, ScriptRuntime};
use crate::settings::{SettingsStore, ThemeSettings};

/// Entry produced when scanning the themes directory.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeListing {
    /// Folder name, which is also the name passed to apply.
    pub folder: String,
    /// Display name from the manifest, falling back to the folder name.
    pub name: String,
    /// Declared type string, defaulted to "full".
    pub kind: String,
}

/// Coordinates applying and removing theme packages.
///
/// Owns the element registry and is the only writer to it. Callers must not
/// issue overlapping apply/reset operations; the command layer serializes
/// access through a mutex, which realizes that precondition.
pub struct ThemeManager {
    themes_root: PathBuf,
    settings: SettingsStore,
    source: Box<dyn AssetSource>,
    bridge: Box<dyn HostBridge>,
    scripts: ScriptRuntime,
    loaded: LoadedTheme,
}

impl ThemeManager {
    pub fn new(
        themes_root: PathBuf,
        settings: SettingsStore,
        source: Box<dyn AssetSource>,
        bridge: Box<dyn HostBridge>,
        scripts: ScriptRuntime,
    ) -> Self {
        Self {
            themes_root,
            settings,
            source,
            bridge,
            scripts,
            loaded: LoadedTheme::new(),
        }
    }

    pub fn settings(&self) -> ThemeSettings {
        self.settings.snapshot()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.update(|s| s.enabled = enabled);
    }

    /// Records the user's theme selection and acknowledges it.
    pub fn select_theme(&mut self, name: &str) {
        self.settings.update(|s| s.theme = name.to_string());
        self.bridge
            .notify(NoticeLevel::Success, "Saved selected theme.");
    }

    /// Everything currently attributed to the active theme. Drained by reset.
    pub fn loaded(&self) -> &LoadedTheme {
        &self.loaded
    }

    /// Writes the settings to disk immediately, bypassing the save debounce.
    pub fn flush_settings(&self) -> Result<(), String> {
        self.settings.flush()
    }

    pub fn themes_root(&self) -> &Path {
        &self.themes_root
    }

    /// Applies the named theme. Always resets first, so a failed apply can
    /// leave at most this apply's partial artifacts behind, never a previous
    /// theme's.
    pub async fn apply_theme(&mut self, theme_name: &str, silent: bool) -> Result<(), ThemeError> {
        if !self.settings.snapshot().enabled {
            self.bridge
                .notify(NoticeLevel::Error, "Theming is not enabled.");
            return Err(ThemeError::Disabled);
        }
        if theme_name.trim().is_empty() {
            self.bridge.notify(NoticeLevel::Error, "No theme selected.");
            return Err(ThemeError::NoThemeSelected);
        }

        // Ensure the last theme is cleaned up before applying a new one.
        self.reset_theme(true).await;

        let manifest = match self.source.fetch_manifest(theme_name).await {
            Ok(manifest) => manifest,
            Err(e) => {
                eprintln!(
                    "[ThemeManager] Failed to read manifest for '{}': {}",
                    theme_name, e
                );
                self.bridge.notify(
                    NoticeLevel::Error,
                    &format!(
                        "Theme \"{}\" was not found or its manifest could not be read.",
                        theme_name
                    ),
                );
                return Err(e);
            }
        };

        let kind = match manifest.effective_type() {
            Ok(kind) => kind,
            Err(e) => {
                self.bridge.notify(NoticeLevel::Error, &e.to_string());
                return Err(e);
            }
        };

        let outcome = match kind {
            ThemeType::Css => {
                inject::inject_css(self.bridge.as_ref(), &mut self.loaded, theme_name, &manifest)
            }
            // html and full sequence identically: CSS, then HTML, then script.
            ThemeType::Html | ThemeType::Full => self.apply_overlay(theme_name, &manifest).await,
        };

        match outcome {
            Ok(()) => {
                self.settings
                    .update(|s| s.last_successful_theme = Some(theme_name.to_string()));
                if !silent {
                    self.bridge.notify(
                        NoticeLevel::Success,
                        &format!(
                            "Applied '{}' theme successfully.",
                            manifest.display_name(theme_name)
                        ),
                    );
                }
                Ok(())
            }
            Err(e) => {
                eprintln!(
                    "[ThemeManager] Failed to apply theme '{}': {}",
                    theme_name, e
                );
                self.bridge.notify(
                    NoticeLevel::Error,
                    &format!(
                        "Failed to apply theme \"{}\". Check the console for details.",
                        theme_name
                    ),
                );
                Err(e)
            }
        }
    }

    async fn apply_overlay(
        &mut self,
        theme_name: &str,
        manifest: &ThemeManifest,
    ) -> Result<(), ThemeError> {
        inject::inject_html(
            self.source.as_ref(),
            self.bridge.as_ref(),
            &mut self.loaded,
            theme_name,
            manifest,
        )
        .await?;
        // Script problems never abort the apply: styles and markup that are
        // already in place stand.
        self.load_theme_script(theme_name, manifest).await;
        Ok(())
    }

    async fn load_theme_script(&mut self, theme_name: &str, manifest: &ThemeManifest) {
        let Some(js_file) = manifest.files.js.as_deref() else {
            return;
        };
        // Only the script URL is cache-busted: a stale cached module would
        // mean a previous theme's code runs.
        let source_url =
            fetch::busted_asset_url(theme_name, js_file, fetch::freshness_token());

        let code = match self.source.fetch_text(theme_name, js_file).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("[ThemeManager] Failed to load script '{}': {}", source_url, e);
                self.bridge.notify(
                    NoticeLevel::Warning,
                    "The theme's script failed to load. Styles and markup were still applied.",
                );
                return;
            }
        };

        match self.scripts.load(&code).await {
            Ok(hooks) => {
                self.loaded.register_script(LoadedScript {
                    source_url: source_url.clone(),
                    hooks,
                });
                if hooks.execute {
                    if let Err(e) = self.scripts.invoke(HookKind::Execute).await {
                        eprintln!(
                            "[ThemeManager] Script activation failed for '{}': {}",
                            source_url, e
                        );
                        self.bridge.notify(
                            NoticeLevel::Warning,
                            "The theme's script failed to run. Styles and markup were still applied.",
                        );
                    }
                }
            }
            Err(e) => {
                eprintln!(
                    "[ThemeManager] Failed to evaluate script '{}': {}",
                    source_url, e
                );
                self.bridge.notify(
                    NoticeLevel::Warning,
                    "The theme's script failed to load. Styles and markup were still applied.",
                );
            }
        }
    }

    /// Removes every artifact of the active theme. Never fails: teardown
    /// problems are logged and reported, and the registry is always left
    /// empty. Safe to call when nothing is loaded.
    pub async fn reset_theme(&mut self, silent: bool) {
        for handle in self.loaded.take_css() {
            if let Err(e) = self.bridge.remove_node(&handle) {
                eprintln!(
                    "[ThemeManager] Failed to remove stylesheet {}: {}",
                    handle.as_str(),
                    e
                );
            }
        }

        for handle in self.loaded.take_html() {
            if let Err(e) = self.bridge.remove_node(&handle) {
                eprintln!(
                    "[ThemeManager] Failed to remove element {}: {}",
                    handle.as_str(),
                    e
                );
            }
        }

        match self.loaded.take_script() {
            Some(script) if script.hooks.disable => {
                if let Err(e) = self.scripts.invoke(HookKind::Disable).await {
                    eprintln!(
                        "[ThemeManager] Error while disabling script '{}': {}",
                        script.source_url, e
                    );
                    self.bridge.notify(
                        NoticeLevel::Warning,
                        "There was an error while shutting down the theme's script. \
                         Reload the app to make sure all theme code is removed.",
                    );
                }
            }
            Some(script) => {
                println!(
                    "[ThemeManager] Script '{}' has no disable hook; nothing to run.",
                    script.source_url
                );
            }
            None => {
                println!(
                    "[ThemeManager] No script to unload for theme {:?}.",
                    self.settings.snapshot().last_successful_theme
                );
            }
        }

        self.settings.update(|s| s.last_successful_theme = None);
        if !silent {
            self.bridge
                .notify(NoticeLevel::Success, "Removed the active theme.");
        }
    }

    /// Scans the themes directory for folders with a parsable manifest.
    pub fn list_themes(&self) -> Vec<ThemeListing> {
        scan_themes(&self.themes_root)
    }

    /// Installs a theme package from a `.zip` archive whose root contains a
    /// `manifest.json` declaring a name. Replaces any existing theme with the
    /// same folder name.
    pub fn install_from_archive(&self, archive_path: &Path) -> Result<ThemeListing, String> {
        install_theme_package(&self.themes_root, archive_path)
    }
}

pub fn scan_themes(themes_root: &Path) -> Vec<ThemeListing> {
    let mut themes = Vec::new();
    let Ok(entries) = fs::read_dir(themes_root) else {
        println!(
            "[ThemeManager] Failed to read themes directory: {:?}",
            themes_root
        );
        return themes;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let manifest_path = path.join("manifest.json");
        let Ok(content) = fs::read_to_string(&manifest_path) else {
            continue;
        };
        let folder = entry.file_name().to_string_lossy().to_string();
        match serde_json::from_str::<ThemeManifest>(&content) {
            Ok(manifest) => {
                themes.push(ThemeListing {
                    name: manifest.display_name(&folder).to_string(),
                    kind: manifest.kind.clone().unwrap_or_else(|| "full".to_string()),
                    folder,
                });
            }
            Err(e) => {
                eprintln!(
                    "[ThemeManager] Skipping {:?}: unparsable manifest.json: {}",
                    path, e
                );
            }
        }
    }

    themes.sort_by(|a, b| a.folder.cmp(&b.folder));
    themes
}

/// Directory names derived from a manifest name: alphanumeric, `-` and `_`
/// only, so a package cannot name itself into a path trick.
fn valid_theme_dir_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn install_theme_package(
    themes_root: &Path,
    archive_path: &Path,
) -> Result<ThemeListing, String> {
    if !archive_path.exists() {
        return Err("Archive does not exist".to_string());
    }

    let file = fs::File::open(archive_path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;

    let mut manifest_content = String::new();
    {
        let mut manifest_file = archive
            .by_name("manifest.json")
            .map_err(|_| "manifest.json not found in archive root".to_string())?;
        manifest_file
            .read_to_string(&mut manifest_content)
            .map_err(|e| e.to_string())?;
    }

    let manifest: ThemeManifest = serde_json::from_str(&manifest_content)
        .map_err(|e| format!("Invalid manifest.json: {}", e))?;

    let folder = manifest
        .name
        .clone()
        .ok_or_else(|| "manifest.json must declare a name to be installable".to_string())?;
    if !valid_theme_dir_name(&folder) {
        return Err(
            "Invalid theme name. Must be alphanumeric, underscore or dash.".to_string(),
        );
    }

    let target_dir = themes_root.join(&folder);
    if target_dir.exists() {
        fs::remove_dir_all(&target_dir)
            .map_err(|e| format!("Failed to remove old theme: {}", e))?;
    }
    fs::create_dir_all(&target_dir).map_err(|e| e.to_string())?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| e.to_string())?;
        let Some(rel) = file.enclosed_name() else {
            continue;
        };
        let outpath = target_dir.join(rel);

        if file.name().ends_with('/') {
            fs::create_dir_all(&outpath).map_err(|e| e.to_string())?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            let mut outfile = fs::File::create(&outpath).map_err(|e| e.to_string())?;
            std::io::copy(&mut file, &mut outfile).map_err(|e| e.to_string())?;
        }
    }

    println!("[ThemeManager] Installed theme '{}' from {:?}", folder, archive_path);
    let kind = manifest.kind.clone().unwrap_or_else(|| "full".to_string());
    Ok(ThemeListing {
        name: manifest.display_name(&folder).to_string(),
        kind,
        folder,
    })
}
