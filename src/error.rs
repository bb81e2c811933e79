use thiserror::Error;

/// Errors raised while applying or removing a theme package.
///
/// Configuration errors (`Disabled`, `NoThemeSelected`, `UnknownType`) are
/// reported before any state is touched. Fetch and injection errors abort the
/// apply that raised them. Script errors never abort the surrounding apply or
/// reset; they are logged and surfaced as warnings by the caller.
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("theming is not enabled")]
    Disabled,

    #[error("no theme selected")]
    NoThemeSelected,

    #[error("unknown theme type \"{0}\" in manifest")]
    UnknownType(String),

    #[error("manifest for theme \"{theme}\" could not be read: {reason}")]
    Manifest { theme: String, reason: String },

    #[error("failed to fetch theme asset \"{path}\": {reason}")]
    Fetch { path: String, reason: String },

    #[error("failed to inject theme markup: {0}")]
    Inject(String),

    #[error("theme script error: {0}")]
    Script(String),
}

// For Tauri command return compatibility
impl From<ThemeError> for String {
    fn from(e: ThemeError) -> String {
        e.to_string()
    }
}
