//! Presentation mode policy
//!
//! Selecting an item can switch the main view to the one that suits it.
//! The rule is a pure function so the selection state itself stays free of
//! presentation concerns.

use serde::{Deserialize, Serialize};

use crate::item::ItemKind;

/// The main view showing the binder's content.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Editor,
    #[default]
    Corkboard,
    Outliner,
    MindMap,
    Timeline,
}

impl ViewMode {
    pub fn name(&self) -> &'static str {
        match self {
            ViewMode::Editor => "editor",
            ViewMode::Corkboard => "corkboard",
            ViewMode::Outliner => "outliner",
            ViewMode::MindMap => "mindmap",
            ViewMode::Timeline => "timeline",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Mode to show after a plain click made an item of `kind` the sole selection.
///
/// The outliner is sticky, and anything other than a single selected item
/// leaves the mode alone. Folders only pull the view out of the editor.
pub fn derive_mode(current: ViewMode, kind: ItemKind, selection_size: usize) -> ViewMode {
    if current == ViewMode::Outliner || selection_size != 1 {
        return current;
    }
    match kind {
        ItemKind::MindMap => ViewMode::MindMap,
        ItemKind::Timeline => ViewMode::Timeline,
        ItemKind::Document => ViewMode::Editor,
        ItemKind::Folder if current == ViewMode::Editor => ViewMode::Corkboard,
        ItemKind::Folder | ItemKind::Trash => current,
    }
}
