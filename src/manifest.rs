use serde::{Deserialize, Serialize};

use crate::error::ThemeError;

/// Anchor element the injection engine targets when a manifest does not
/// declare its own `injectPoint`.
pub const DEFAULT_INJECT_POINT: &str = "#chat-container";

/// Descriptor read from `<themes_root>/<theme>/manifest.json`.
///
/// Fetched fresh on every apply; never cached. Absent optional file lists
/// mean "nothing to do for that kind".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeManifest {
    /// Display name shown in success notices. Falls back to the folder name.
    #[serde(default)]
    pub name: Option<String>,

    /// Declared theme type: "css", "html" or "full". Kept as a raw string so
    /// an unrecognized value is reported as a dispatch failure instead of a
    /// manifest parse failure.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub files: ThemeFiles,

    /// CSS selector of the anchor element HTML fragments are placed against.
    #[serde(default)]
    pub inject_point: Option<String>,

    /// Relative position against the anchor: "before", "after", "prepend"
    /// or "append".
    #[serde(default)]
    pub inject_method: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeFiles {
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub html: Vec<String>,
    #[serde(default)]
    pub js: Option<String>,
}

/// Effective theme type after defaulting. `Html` and `Full` sequence the same
/// sub-steps; the distinction exists for manifest-author clarity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeType {
    Css,
    Html,
    Full,
}

/// Where theme HTML lands relative to the anchor element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectMethod {
    #[default]
    Before,
    After,
    Prepend,
    Append,
}

impl InjectMethod {
    /// Unrecognized method strings fall back to `Before`, matching the
    /// dispatcher's default arm rather than rejecting the manifest.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "after" => InjectMethod::After,
            "prepend" => InjectMethod::Prepend,
            "append" => InjectMethod::Append,
            _ => InjectMethod::Before,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InjectMethod::Before => "before",
            InjectMethod::After => "after",
            InjectMethod::Prepend => "prepend",
            InjectMethod::Append => "append",
        }
    }
}

impl ThemeManifest {
    /// Effective type: absent (or empty) means `full`; anything other than
    /// the three known kinds is an error reported to the user.
    pub fn effective_type(&self) -> Result<ThemeType, ThemeError> {
        match self.kind.as_deref() {
            None | Some("") | Some("full") => Ok(ThemeType::Full),
            Some("css") => Ok(ThemeType::Css),
            Some("html") => Ok(ThemeType::Html),
            Some(other) => Err(ThemeError::UnknownType(other.to_string())),
        }
    }

    pub fn inject_point(&self) -> &str {
        self.inject_point
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_INJECT_POINT)
    }

    pub fn inject_method(&self) -> InjectMethod {
        self.inject_method
            .as_deref()
            .map(InjectMethod::parse)
            .unwrap_or_default()
    }

    /// Name shown to the user: manifest `name` or the theme folder name.
    pub fn display_name<'a>(&'a self, folder: &'a str) -> &'a str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(folder)
    }
}
