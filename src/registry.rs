use crate::host::NodeHandle;
use crate::script::HookSet;

/// Script module currently loaded for the active theme.
#[derive(Debug, Clone)]
pub struct LoadedScript {
    /// Cache-busted URL the script was presented as; used in teardown logs.
    pub source_url: String,
    pub hooks: HookSet,
}

/// Record of everything the active theme placed in the host document, kept so
/// it can all be found and undone later.
///
/// At most one theme's artifacts are registered at a time: the lifecycle
/// coordinator drains this completely before registering anything for a new
/// theme. Only the coordinator's apply/reset paths mutate it.
#[derive(Debug, Default)]
pub struct LoadedTheme {
    css: Vec<NodeHandle>,
    html_elements: Vec<NodeHandle>,
    script: Option<LoadedScript>,
}

impl LoadedTheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_css(&mut self, handle: NodeHandle) {
        self.css.push(handle);
    }

    pub fn register_html(&mut self, handle: NodeHandle) {
        self.html_elements.push(handle);
    }

    pub fn register_script(&mut self, script: LoadedScript) {
        self.script = Some(script);
    }

    /// Drains the stylesheet handles, leaving the list empty.
    pub fn take_css(&mut self) -> Vec<NodeHandle> {
        std::mem::take(&mut self.css)
    }

    /// Drains the HTML node handles, leaving the list empty.
    pub fn take_html(&mut self) -> Vec<NodeHandle> {
        std::mem::take(&mut self.html_elements)
    }

    pub fn take_script(&mut self) -> Option<LoadedScript> {
        self.script.take()
    }

    pub fn css_handles(&self) -> &[NodeHandle] {
        &self.css
    }

    pub fn html_handles(&self) -> &[NodeHandle] {
        &self.html_elements
    }

    pub fn script(&self) -> Option<&LoadedScript> {
        self.script.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.css.is_empty() && self.html_elements.is_empty() && self.script.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registry_is_empty() {
        let registry = LoadedTheme::new();
        assert!(registry.is_empty());
        assert!(registry.css_handles().is_empty());
        assert!(registry.html_handles().is_empty());
        assert!(registry.script().is_none());
    }

    #[test]
    fn registration_preserves_order() {
        let mut registry = LoadedTheme::new();
        let a = NodeHandle::new();
        let b = NodeHandle::new();
        registry.register_css(a.clone());
        registry.register_css(b.clone());
        assert_eq!(registry.css_handles(), &[a, b]);
    }

    #[test]
    fn take_leaves_registry_drained() {
        let mut registry = LoadedTheme::new();
        registry.register_css(NodeHandle::new());
        registry.register_html(NodeHandle::new());
        registry.register_script(LoadedScript {
            source_url: "theme://t/code.js?t=0".into(),
            hooks: HookSet::default(),
        });
        assert!(!registry.is_empty());

        assert_eq!(registry.take_css().len(), 1);
        assert_eq!(registry.take_html().len(), 1);
        assert!(registry.take_script().is_some());
        assert!(registry.is_empty());

        // A second drain finds nothing.
        assert!(registry.take_css().is_empty());
        assert!(registry.take_html().is_empty());
        assert!(registry.take_script().is_none());
    }
}
