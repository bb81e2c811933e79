//! Persisted user settings for the theming subsystem.
//!
//! Saves are debounced and fire-and-forget: mutations bump a generation
//! counter and schedule a write that only lands if no newer mutation
//! superseded it. Persistence is deliberately not synchronized with DOM
//! mutations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeSettings {
    /// Master switch; nothing is applied while disabled.
    pub enabled: bool,
    /// Name of the theme folder the user selected.
    pub theme: String,
    /// Folder name of the last theme that applied cleanly, cleared on reset.
    pub last_successful_theme: Option<String>,
}

pub struct SettingsStore {
    path: PathBuf,
    state: Arc<Mutex<ThemeSettings>>,
    generation: Arc<AtomicU64>,
    debounce: Duration,
}

impl SettingsStore {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unparsable.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        Self::load_with_debounce(path, DEFAULT_DEBOUNCE)
    }

    pub fn load_with_debounce<P: AsRef<Path>>(path: P, debounce: Duration) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<ThemeSettings>(&content) {
                Ok(settings) => {
                    println!("[ThemeSettings] Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    eprintln!(
                        "[ThemeSettings] Failed to parse {}: {}, using defaults",
                        path.display(),
                        e
                    );
                    ThemeSettings::default()
                }
            },
            Err(_) => {
                println!(
                    "[ThemeSettings] No settings file at {}, using defaults",
                    path.display()
                );
                ThemeSettings::default()
            }
        };

        Self {
            path,
            state: Arc::new(Mutex::new(state)),
            generation: Arc::new(AtomicU64::new(0)),
            debounce,
        }
    }

    pub fn snapshot(&self) -> ThemeSettings {
        self.state.lock().expect("settings lock poisoned").clone()
    }

    /// Mutates the settings and schedules a debounced save.
    pub fn update<F: FnOnce(&mut ThemeSettings)>(&self, mutate: F) {
        {
            let mut state = self.state.lock().expect("settings lock poisoned");
            mutate(&mut state);
        }
        self.save_debounced();
    }

    fn save_debounced(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let gen_handle = self.generation.clone();
        let state = self.state.clone();
        let path = self.path.clone();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // A newer mutation rescheduled the save; let that one write.
            if gen_handle.load(Ordering::SeqCst) != generation {
                return;
            }
            let snapshot = state.lock().expect("settings lock poisoned").clone();
            if let Err(e) = write_settings(&path, &snapshot) {
                eprintln!("[ThemeSettings] Failed to save settings: {}", e);
            }
        });
    }

    /// Writes the current state immediately, bypassing the debounce. Called
    /// at app exit so a mutation still inside its debounce window is not
    /// lost; normal mutation goes through the debounced path.
    pub fn flush(&self) -> Result<(), String> {
        let snapshot = self.snapshot();
        write_settings(&self.path, &snapshot)
    }
}

fn write_settings(path: &Path, settings: &ThemeSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create settings directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("failed to serialize settings: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let store = SettingsStore::load(tmp.path().join("settings.json"));
        let settings = store.snapshot();
        assert!(!settings.enabled);
        assert!(settings.theme.is_empty());
        assert!(settings.last_successful_theme.is_none());
    }

    #[test]
    fn unparsable_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "not json at all").unwrap();
        let store = SettingsStore::load(&path);
        assert!(!store.snapshot().enabled);
    }

    #[test]
    fn flush_round_trips_camel_case() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let store = SettingsStore::load(&path);
        {
            let mut state = store.state.lock().unwrap();
            state.enabled = true;
            state.theme = "midnight".into();
            state.last_successful_theme = Some("midnight".into());
        }
        store.flush().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("lastSuccessfulTheme"));

        let reloaded = SettingsStore::load(&path).snapshot();
        assert!(reloaded.enabled);
        assert_eq!(reloaded.theme, "midnight");
        assert_eq!(reloaded.last_successful_theme.as_deref(), Some("midnight"));
    }

    #[tokio::test]
    async fn debounced_saves_coalesce() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        let store = SettingsStore::load_with_debounce(&path, Duration::from_millis(20));

        store.update(|s| s.theme = "first".into());
        store.update(|s| s.theme = "second".into());
        assert!(!path.exists(), "save should not land before the debounce");

        tokio::time::sleep(Duration::from_millis(80)).await;
        let saved: ThemeSettings =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.theme, "second");
    }
}
