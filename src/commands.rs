//! Tauri command surface: the user-facing operations the settings panel
//! invokes. Access to the manager is serialized through the mutex, which is
//! what guarantees at most one apply-or-reset operation in flight.

use std::path::Path;
use tauri::{command, State};
use tokio::sync::Mutex;

use crate::manager::{ThemeListing, ThemeManager};
use crate::settings::ThemeSettings;

#[command]
pub async fn get_theme_settings(
    manager: State<'_, Mutex<ThemeManager>>,
) -> Result<ThemeSettings, String> {
    let manager = manager.lock().await;
    Ok(manager.settings())
}

/// Master enable/disable toggle. Disabling removes the active theme.
#[command]
pub async fn set_theme_enabled(
    manager: State<'_, Mutex<ThemeManager>>,
    enabled: bool,
) -> Result<(), String> {
    let mut manager = manager.lock().await;
    manager.set_enabled(enabled);
    if !enabled {
        manager.reset_theme(false).await;
    }
    Ok(())
}

#[command]
pub async fn set_theme_name(
    manager: State<'_, Mutex<ThemeManager>>,
    name: String,
) -> Result<(), String> {
    let mut manager = manager.lock().await;
    manager.select_theme(&name);
    Ok(())
}

/// Applies the currently selected theme.
#[command]
pub async fn apply_theme(manager: State<'_, Mutex<ThemeManager>>) -> Result<(), String> {
    let mut manager = manager.lock().await;
    let name = manager.settings().theme;
    manager.apply_theme(&name, false).await.map_err(Into::into)
}

/// Removes the active theme and switches theming off.
#[command]
pub async fn remove_theme(manager: State<'_, Mutex<ThemeManager>>) -> Result<(), String> {
    let mut manager = manager.lock().await;
    manager.reset_theme(false).await;
    manager.set_enabled(false);
    Ok(())
}

#[command]
pub async fn list_themes(
    manager: State<'_, Mutex<ThemeManager>>,
) -> Result<Vec<ThemeListing>, String> {
    let manager = manager.lock().await;
    Ok(manager.list_themes())
}

/// Installs a theme package from a zip archive on disk.
#[command]
pub async fn install_theme(
    manager: State<'_, Mutex<ThemeManager>>,
    file_path: String,
) -> Result<ThemeListing, String> {
    let manager = manager.lock().await;
    manager.install_from_archive(Path::new(&file_path))
}
