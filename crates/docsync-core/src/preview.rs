//! Which renderer a file goes to.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Markdown,
    Uml,
    Mermaid,
    Text,
}

impl PreviewKind {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("md" | "markdown") => Self::Markdown,
            Some("uml" | "puml") => Self::Uml,
            Some("mmd") => Self::Mermaid,
            _ => Self::Text,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Uml => "uml",
            Self::Mermaid => "mermaid",
            Self::Text => "text",
        }
    }
}

/// Content tagged with the renderer it needs, as served to the preview pane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewDocument {
    #[serde(rename = "type")]
    pub kind: PreviewKind,
    pub content: String,
}

impl PreviewDocument {
    pub fn new(path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        Self {
            kind: PreviewKind::from_path(path),
            content: content.into(),
        }
    }

    /// Plain-text rendition for terminals. Diagram sources are shown as-is.
    pub fn plain_text(&self) -> String {
        match self.kind {
            PreviewKind::Markdown => crate::markdown::plain_text(&self.content),
            PreviewKind::Uml | PreviewKind::Mermaid | PreviewKind::Text => self.content.clone(),
        }
    }
}
