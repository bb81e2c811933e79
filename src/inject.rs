//! Places a theme's stylesheets and HTML fragments into the host document,
//! registering every created node so reset can undo the work.

use crate::error::ThemeError;
use crate::fetch::{asset_url, AssetSource};
use crate::fragment;
use crate::host::{HostBridge, NodeHandle};
use crate::manifest::ThemeManifest;
use crate::registry::LoadedTheme;

/// Attaches one stylesheet link per declared CSS file, in declared order.
/// The href is the plain `theme://` URL; freshness comes from the protocol's
/// no-cache headers. No de-duplication: re-applying a theme re-adds links,
/// which is safe because reset always runs first.
pub fn inject_css(
    bridge: &dyn HostBridge,
    registry: &mut LoadedTheme,
    theme: &str,
    manifest: &ThemeManifest,
) -> Result<(), ThemeError> {
    for file in &manifest.files.css {
        let href = asset_url(theme, file);
        let handle = NodeHandle::new();
        bridge.attach_stylesheet(&handle, &href)?;
        registry.register_css(handle);
    }
    Ok(())
}

/// Applies the theme's CSS, then fetches, splits and inserts every declared
/// HTML fragment at the manifest's anchor. Source order is preserved within
/// a file and declaration order across files. Nodes inserted before a
/// failure stay registered; only the next reset clears them.
pub async fn inject_html(
    source: &dyn AssetSource,
    bridge: &dyn HostBridge,
    registry: &mut LoadedTheme,
    theme: &str,
    manifest: &ThemeManifest,
) -> Result<(), ThemeError> {
    inject_css(bridge, registry, theme, manifest)?;

    let inject_point = manifest.inject_point();
    let method = manifest.inject_method();

    for file in &manifest.files.html {
        let text = source.fetch_text(theme, file).await?;
        let nodes = fragment::split_top_level(text.trim())
            .map_err(|e| ThemeError::Inject(format!("{}: {}", file, e)))?;
        for node in nodes {
            let handle = NodeHandle::new();
            bridge.insert_fragment(&handle, &node, inject_point, method)?;
            registry.register_html(handle);
        }
    }
    Ok(())
}
