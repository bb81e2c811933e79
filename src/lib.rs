//! Theme package loading and lifecycle management for a hosted chat UI,
//! packaged as a Tauri plugin.
//!
//! A theme package is a folder of CSS, HTML fragments and optional script
//! code described by a `manifest.json`. The plugin applies a selected
//! package's overlay to the running document (stylesheet links, injected
//! fragments, a script module with optional `execute`/`disable` hooks) and
//! guarantees that a reset undoes everything the theme did, including
//! invoking the theme's own teardown code and tolerating its failure.

pub mod commands;
pub mod error;
pub mod fetch;
pub mod fragment;
pub mod host;
pub mod inject;
pub mod manager;
pub mod manifest;
pub mod protocol;
pub mod registry;
pub mod script;
pub mod settings;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::time::Duration;
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, Runtime};
use tokio::sync::Mutex;

pub use error::ThemeError;
pub use manager::ThemeManager;
pub use manifest::ThemeManifest;

use crate::fetch::FsAssetSource;
use crate::host::WebviewBridge;
use crate::script::ScriptRuntime;
use crate::settings::SettingsStore;

/// Overrides for where the plugin keeps its data.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Directory holding one subdirectory per theme package.
    pub themes_root: Option<PathBuf>,
    /// JSON file the user settings persist to.
    pub settings_path: Option<PathBuf>,
}

fn default_settings_path() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chat-themes")
        .join("theme_settings.json")
}

pub fn init<R: Runtime>() -> TauriPlugin<R> {
    init_with(EngineOptions::default())
}

pub fn init_with<R: Runtime>(options: EngineOptions) -> TauriPlugin<R> {
    // Resolved eagerly: the protocol handler can run before .setup() does.
    let themes_root = options
        .themes_root
        .clone()
        .unwrap_or_else(protocol::resolve_themes_root);
    let protocol_root = themes_root.clone();
    let settings_path = options.settings_path.unwrap_or_else(default_settings_path);

    Builder::new("chat-themes")
        .invoke_handler(tauri::generate_handler![
            commands::get_theme_settings,
            commands::set_theme_enabled,
            commands::set_theme_name,
            commands::apply_theme,
            commands::remove_theme,
            commands::list_themes,
            commands::install_theme,
        ])
        .register_uri_scheme_protocol("theme", move |_ctx, request| {
            protocol::handle_theme_request(&protocol_root, &request)
        })
        .on_event(|app, event| {
            // A settings mutation still inside its debounce window at exit
            // must not be lost.
            if let tauri::RunEvent::Exit = event {
                if let Some(state) = app.try_state::<Mutex<ThemeManager>>() {
                    if let Ok(manager) = state.try_lock() {
                        if let Err(e) = manager.flush_settings() {
                            eprintln!("[ThemeEngine] Failed to flush settings on exit: {}", e);
                        }
                    }
                }
            }
        })
        .setup(move |app, _api| {
            println!("[ThemeEngine] Themes directory: {:?}", themes_root);
            let settings = SettingsStore::load(&settings_path);
            let startup = settings.snapshot();

            let manager = ThemeManager::new(
                themes_root.clone(),
                settings,
                Box::new(FsAssetSource::new(&themes_root)),
                Box::new(WebviewBridge::new(app.clone())),
                ScriptRuntime::new(),
            );
            app.manage(Mutex::new(manager));

            // If enabled on startup, apply the selected theme silently once
            // the frontend has had a moment to mount its anchor element.
            if startup.enabled && !startup.theme.is_empty() {
                let handle = app.clone();
                tauri::async_runtime::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    let state = handle.state::<Mutex<ThemeManager>>();
                    let mut manager = state.lock().await;
                    let name = manager.settings().theme;
                    if let Err(e) = manager.apply_theme(&name, true).await {
                        eprintln!("[ThemeEngine] Startup apply failed: {}", e);
                    }
                });
            }

            Ok(())
        })
        .build()
}
