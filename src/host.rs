use serde::Serialize;
use tauri::{AppHandle, Emitter, Runtime};
use uuid::Uuid;

use crate::error::ThemeError;
use crate::manifest::InjectMethod;

/// Event names forming the wire contract with the host document. The webview
/// listens for these and performs the actual DOM mutations; for every inject
/// method it must preserve arrival order relative to the anchor.
pub const EVENT_ATTACH_CSS: &str = "theme:attach-css";
pub const EVENT_INJECT_HTML: &str = "theme:inject-html";
pub const EVENT_REMOVE_NODE: &str = "theme:remove-node";
pub const EVENT_NOTICE: &str = "theme:notice";

/// Opaque removal token for a node the engine placed in the host document.
/// The frontend tags the inserted node with this id so a later
/// `theme:remove-node` can find and detach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeHandle(String);

impl NodeHandle {
    pub fn new() -> Self {
        NodeHandle(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Boundary between the lifecycle engine and the host document. The
/// production implementation forwards everything to the webview over the
/// Tauri event bus; tests substitute an in-memory document.
pub trait HostBridge: Send + Sync {
    fn attach_stylesheet(&self, handle: &NodeHandle, href: &str) -> Result<(), ThemeError>;

    fn insert_fragment(
        &self,
        handle: &NodeHandle,
        html: &str,
        inject_point: &str,
        method: InjectMethod,
    ) -> Result<(), ThemeError>;

    fn remove_node(&self, handle: &NodeHandle) -> Result<(), ThemeError>;

    fn notify(&self, level: NoticeLevel, message: &str);
}

#[derive(Serialize, Clone)]
struct AttachCssPayload<'a> {
    handle: &'a NodeHandle,
    href: &'a str,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct InjectHtmlPayload<'a> {
    handle: &'a NodeHandle,
    html: &'a str,
    inject_point: &'a str,
    inject_method: &'static str,
}

#[derive(Serialize, Clone)]
struct RemoveNodePayload<'a> {
    handle: &'a NodeHandle,
}

#[derive(Serialize, Clone)]
struct NoticePayload<'a> {
    level: NoticeLevel,
    message: &'a str,
}

/// Emits theme events to the webview that hosts the chat document.
pub struct WebviewBridge<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> WebviewBridge<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> HostBridge for WebviewBridge<R> {
    fn attach_stylesheet(&self, handle: &NodeHandle, href: &str) -> Result<(), ThemeError> {
        self.app
            .emit(EVENT_ATTACH_CSS, AttachCssPayload { handle, href })
            .map_err(|e| ThemeError::Inject(format!("stylesheet event failed: {}", e)))
    }

    fn insert_fragment(
        &self,
        handle: &NodeHandle,
        html: &str,
        inject_point: &str,
        method: InjectMethod,
    ) -> Result<(), ThemeError> {
        self.app
            .emit(
                EVENT_INJECT_HTML,
                InjectHtmlPayload {
                    handle,
                    html,
                    inject_point,
                    inject_method: method.as_str(),
                },
            )
            .map_err(|e| ThemeError::Inject(format!("inject event failed: {}", e)))
    }

    fn remove_node(&self, handle: &NodeHandle) -> Result<(), ThemeError> {
        self.app
            .emit(EVENT_REMOVE_NODE, RemoveNodePayload { handle })
            .map_err(|e| ThemeError::Inject(format!("remove event failed: {}", e)))
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        // Notices are best-effort; a dropped toast must not fail the operation.
        let _ = self.app.emit(EVENT_NOTICE, NoticePayload { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique() {
        let a = NodeHandle::new();
        let b = NodeHandle::new();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn notice_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&NoticeLevel::Warning).unwrap(),
            "\"warning\""
        );
    }

    #[test]
    fn inject_payload_uses_camel_case() {
        let handle = NodeHandle::new();
        let payload = InjectHtmlPayload {
            handle: &handle,
            html: "<div></div>",
            inject_point: "#x",
            inject_method: "append",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("injectPoint").is_some());
        assert!(json.get("injectMethod").is_some());
    }
}
