use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::ThemeError;
use crate::fetch::FsAssetSource;
use crate::host::{HostBridge, NodeHandle, NoticeLevel};
use crate::manager::ThemeManager;
use crate::manifest::InjectMethod;
use crate::script::ScriptRuntime;
use crate::settings::SettingsStore;

// ── Fixture builders ────────────────────────────────────────

/// Writes a theme folder with its manifest and asset files under `root`.
pub fn write_theme(root: &Path, folder: &str, manifest: &str, files: &[(&str, &str)]) {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("manifest.json"), manifest).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

/// Builds a manager over `root` with a mock document bridge and a short
/// settings debounce. The returned bridge handle stays inspectable after the
/// manager takes its copy.
pub fn setup_manager(root: &Path, enabled: bool) -> (ThemeManager, MockBridge) {
    let settings = SettingsStore::load_with_debounce(
        root.join("theme_settings.json"),
        Duration::from_millis(10),
    );
    settings.update(|s| s.enabled = enabled);

    let bridge = MockBridge::new();
    let manager = ThemeManager::new(
        root.to_path_buf(),
        settings,
        Box::new(FsAssetSource::new(root)),
        Box::new(bridge.clone()),
        ScriptRuntime::new(),
    );
    (manager, bridge)
}

// ── In-memory host document ─────────────────────────────────

/// Models the regions around the anchor element. The real frontend preserves
/// arrival order relative to the anchor for every inject method, so each
/// region is an append-only list in document order.
#[derive(Debug, Default)]
pub struct MockDocument {
    pub head_links: Vec<(NodeHandle, String)>,
    pub before_anchor: Vec<(NodeHandle, String)>,
    pub after_anchor: Vec<(NodeHandle, String)>,
    pub prepended: Vec<(NodeHandle, String)>,
    pub appended: Vec<(NodeHandle, String)>,
}

impl MockDocument {
    fn remove(&mut self, handle: &NodeHandle) -> bool {
        let lists = [
            &mut self.head_links,
            &mut self.before_anchor,
            &mut self.after_anchor,
            &mut self.prepended,
            &mut self.appended,
        ];
        for list in lists {
            if let Some(i) = list.iter().position(|(h, _)| h == handle) {
                list.remove(i);
                return true;
            }
        }
        false
    }

    pub fn all_handles(&self) -> Vec<NodeHandle> {
        self.head_links
            .iter()
            .chain(&self.before_anchor)
            .chain(&self.after_anchor)
            .chain(&self.prepended)
            .chain(&self.appended)
            .map(|(h, _)| h.clone())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.all_handles().len()
    }
}

#[derive(Debug, Default)]
pub struct MockBridgeInner {
    pub doc: Mutex<MockDocument>,
    pub notices: Mutex<Vec<(NoticeLevel, String)>>,
    pub insert_points: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<NodeHandle>>,
    insert_count: AtomicUsize,
    fail_inserts_after: AtomicUsize,
}

/// Host bridge backed by [`MockDocument`]. Cloning shares the underlying
/// state, so a test can keep a handle while the manager owns another.
#[derive(Clone)]
pub struct MockBridge(Arc<MockBridgeInner>);

impl MockBridge {
    pub fn new() -> Self {
        let inner = MockBridgeInner {
            fail_inserts_after: AtomicUsize::new(usize::MAX),
            ..Default::default()
        };
        MockBridge(Arc::new(inner))
    }

    /// After `n` successful fragment insertions, further inserts fail.
    pub fn fail_inserts_after(&self, n: usize) {
        self.0.fail_inserts_after.store(n, Ordering::SeqCst);
    }

    pub fn head_hrefs(&self) -> Vec<String> {
        self.0
            .doc
            .lock()
            .unwrap()
            .head_links
            .iter()
            .map(|(_, href)| href.clone())
            .collect()
    }

    pub fn doc_handles(&self) -> Vec<NodeHandle> {
        self.0.doc.lock().unwrap().all_handles()
    }

    pub fn doc_node_count(&self) -> usize {
        self.0.doc.lock().unwrap().node_count()
    }

    pub fn region_html(&self, method: InjectMethod) -> Vec<String> {
        let doc = self.0.doc.lock().unwrap();
        let region = match method {
            InjectMethod::Before => &doc.before_anchor,
            InjectMethod::After => &doc.after_anchor,
            InjectMethod::Prepend => &doc.prepended,
            InjectMethod::Append => &doc.appended,
        };
        region.iter().map(|(_, html)| html.clone()).collect()
    }

    pub fn insert_points(&self) -> Vec<String> {
        self.0.insert_points.lock().unwrap().clone()
    }

    pub fn removed_count(&self) -> usize {
        self.0.removed.lock().unwrap().len()
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.0.notices.lock().unwrap().clone()
    }

    pub fn has_notice(&self, level: NoticeLevel, fragment: &str) -> bool {
        self.notices()
            .iter()
            .any(|(l, m)| *l == level && m.contains(fragment))
    }
}

impl HostBridge for MockBridge {
    fn attach_stylesheet(&self, handle: &NodeHandle, href: &str) -> Result<(), ThemeError> {
        self.0
            .doc
            .lock()
            .unwrap()
            .head_links
            .push((handle.clone(), href.to_string()));
        Ok(())
    }

    fn insert_fragment(
        &self,
        handle: &NodeHandle,
        html: &str,
        inject_point: &str,
        method: InjectMethod,
    ) -> Result<(), ThemeError> {
        let allowed = self.0.fail_inserts_after.load(Ordering::SeqCst);
        let seen = self.0.insert_count.fetch_add(1, Ordering::SeqCst);
        if seen >= allowed {
            return Err(ThemeError::Inject("mock insertion failure".into()));
        }

        self.0
            .insert_points
            .lock()
            .unwrap()
            .push(inject_point.to_string());

        let mut doc = self.0.doc.lock().unwrap();
        let region = match method {
            InjectMethod::Before => &mut doc.before_anchor,
            InjectMethod::After => &mut doc.after_anchor,
            InjectMethod::Prepend => &mut doc.prepended,
            InjectMethod::Append => &mut doc.appended,
        };
        region.push((handle.clone(), html.to_string()));
        Ok(())
    }

    fn remove_node(&self, handle: &NodeHandle) -> Result<(), ThemeError> {
        self.0.doc.lock().unwrap().remove(handle);
        self.0.removed.lock().unwrap().push(handle.clone());
        Ok(())
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.0
            .notices
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}
