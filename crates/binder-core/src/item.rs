use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a binder item.
///
/// Opaque and immutable once assigned. Serializes as a bare UUID string so it
/// can key the flat item map of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new random item ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an item ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The all-zero ID, never allocated by the store.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Parse an item ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an item is. Drives view defaults, never tree legality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    Document,
    MindMap,
    Timeline,
    Trash,
}

impl ItemKind {
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Folder => "folder",
            ItemKind::Document => "document",
            ItemKind::MindMap => "mindmap",
            ItemKind::Timeline => "timeline",
            ItemKind::Trash => "trash",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Writing progress of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    ToDo,
    InProgress,
    Done,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::ToDo => write!(f, "To Do"),
            Status::InProgress => write!(f, "In Progress"),
            Status::Done => write!(f, "Done"),
        }
    }
}

/// Manuscript role label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Chapter,
    Scene,
    Character,
    Location,
    Idea,
}

/// Freeform (corkboard / mind map) coordinates in pixels.
///
/// Not authoritative for sibling order until committed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpatialPosition {
    pub x: f64,
    pub y: f64,
}

impl SpatialPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// External folder sync descriptor. Stored and returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSync {
    pub enabled: bool,
    pub path: String,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Value of a custom metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Text(String),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            MetadataValue::Bool(_) => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// A node of the binder: folder, document, or planning artifact.
///
/// `parent_id` and `children` are structural and only change through the
/// tree mutation path; everything else is replaced via [`FieldMutation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub(crate) parent_id: Option<ItemId>,
    pub kind: ItemKind,
    pub title: String,
    /// Opaque rich-text markup, meaningful for documents
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub(crate) children: Vec<ItemId>,

    // Descriptive metadata
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub word_count_target: Option<u32>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub custom_metadata: BTreeMap<String, MetadataValue>,

    // View state
    #[serde(default)]
    pub spatial_position: Option<SpatialPosition>,
    #[serde(default = "default_expanded")]
    pub expanded: bool,

    #[serde(default)]
    pub external_sync: Option<ExternalSync>,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

fn default_expanded() -> bool {
    true
}

impl Item {
    /// Create an unattached item with default metadata.
    pub fn new(id: ItemId, kind: ItemKind, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            parent_id: None,
            kind,
            title: title.into(),
            content: None,
            children: Vec::new(),
            synopsis: None,
            status: Some(Status::ToDo),
            label: None,
            word_count: 0,
            word_count_target: None,
            keywords: Vec::new(),
            icon: None,
            custom_metadata: BTreeMap::new(),
            spatial_position: None,
            expanded: true,
            external_sync: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn parent_id(&self) -> Option<ItemId> {
        self.parent_id
    }

    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Apply a single field replacement. Does not touch `modified_at`.
    pub(crate) fn apply(&mut self, mutation: FieldMutation) {
        match mutation {
            FieldMutation::SetTitle(title) => self.title = title,
            FieldMutation::SetContent(content) => self.content = content,
            FieldMutation::SetSynopsis(synopsis) => self.synopsis = synopsis,
            FieldMutation::SetStatus(status) => self.status = status,
            FieldMutation::SetLabel(label) => self.label = label,
            FieldMutation::SetWordCount(count) => self.word_count = count,
            FieldMutation::SetWordCountTarget(target) => self.word_count_target = target,
            FieldMutation::SetKeywords(keywords) => self.keywords = keywords,
            FieldMutation::SetIcon(icon) => self.icon = icon,
            FieldMutation::SetCustomMetadata(metadata) => self.custom_metadata = metadata,
            FieldMutation::SetSpatialPosition(pos) => self.spatial_position = pos,
            FieldMutation::SetExternalSync(sync) => self.external_sync = sync,
        }
    }
}

/// Whole-field replacement of a non-structural item field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldMutation {
    SetTitle(String),
    SetContent(Option<String>),
    SetSynopsis(Option<String>),
    SetStatus(Option<Status>),
    SetLabel(Option<Label>),
    SetWordCount(u32),
    SetWordCountTarget(Option<u32>),
    SetKeywords(Vec<String>),
    SetIcon(Option<String>),
    SetCustomMetadata(BTreeMap<String, MetadataValue>),
    SetSpatialPosition(Option<SpatialPosition>),
    SetExternalSync(Option<ExternalSync>),
}
