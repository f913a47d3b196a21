//! Persisted binder state
//!
//! A [`BinderSnapshot`] is the serde form of a whole binder: every record,
//! the root list, navigation, view mode, and custom field definitions.
//! Loading is where untrusted data enters, so [`restore`] rebuilds the tree
//! from the roots down and repairs what it can. Only damage that leaves no
//! sensible tree (a missing root, no trash, a root with a parent) rejects
//! the snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::error::SnapshotError;
use crate::fields::{FieldDef, FieldRegistry};
use crate::item::{Item, ItemId, ItemKind};
use crate::mode::ViewMode;
use crate::navigation::NavigationState;
use crate::store::ItemStore;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinderSnapshot {
    pub version: u32,
    pub items: Vec<Item>,
    pub root_ids: Vec<ItemId>,
    #[serde(default)]
    pub navigation: NavigationState,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub field_defs: Vec<FieldDef>,
}

impl BinderSnapshot {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One fix applied while loading a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "repair", rename_all = "snake_case")]
pub enum Repair {
    /// A second record with an id already seen was discarded
    DuplicateRecord { id: ItemId },
    /// A root id listed more than once
    DuplicateRoot { id: ItemId },
    /// A `children` entry pointed at no record
    DanglingChild { parent: ItemId, child: ItemId },
    /// A root was listed as somebody's child
    RootListedAsChild { parent: ItemId, child: ItemId },
    /// A child already listed elsewhere; the first listing was kept
    DuplicateChild { parent: ItemId, child: ItemId },
    /// `parent_id` was rewritten to match the `children` listing
    ParentRewritten {
        id: ItemId,
        recorded: Option<ItemId>,
        actual: ItemId,
    },
    /// An unlisted item was appended back under its recorded parent
    Reattached { id: ItemId, parent: ItemId },
    /// An unlisted item with no reachable parent was moved into the trash
    MovedToTrash { id: ItemId },
    /// Navigation references to missing items were dropped
    NavigationPruned { count: usize },
}

impl std::fmt::Display for Repair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Repair::DuplicateRecord { id } => write!(f, "dropped duplicate record {}", id),
            Repair::DuplicateRoot { id } => write!(f, "dropped duplicate root {}", id),
            Repair::DanglingChild { parent, child } => {
                write!(f, "dropped missing child {} of {}", child, parent)
            }
            Repair::RootListedAsChild { parent, child } => {
                write!(f, "dropped root {} from children of {}", child, parent)
            }
            Repair::DuplicateChild { parent, child } => {
                write!(f, "dropped second listing of {} under {}", child, parent)
            }
            Repair::ParentRewritten {
                id,
                recorded,
                actual,
            } => write!(f, "parent of {} rewritten from {:?} to {}", id, recorded, actual),
            Repair::Reattached { id, parent } => {
                write!(f, "reattached {} under {}", id, parent)
            }
            Repair::MovedToTrash { id } => write!(f, "moved unreachable {} to trash", id),
            Repair::NavigationPruned { count } => {
                write!(f, "pruned {} navigation reference(s)", count)
            }
        }
    }
}

/// Everything fixed while loading a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub repairs: Vec<Repair>,
}

impl LoadReport {
    /// True when the snapshot loaded without any repair.
    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty()
    }

    fn push(&mut self, repair: Repair) {
        warn!(%repair, "repaired snapshot");
        self.repairs.push(repair);
    }
}

/// Parts of a binder rebuilt from a snapshot.
pub(crate) struct Restored {
    pub store: ItemStore,
    pub navigation: NavigationState,
    pub view_mode: ViewMode,
    pub fields: FieldRegistry,
    pub report: LoadReport,
}

/// Capture a store and its surrounding state.
///
/// Items are written roots first, each followed by its subtree in display
/// order, then any unattached items by id.
pub(crate) fn capture(
    store: &ItemStore,
    navigation: &NavigationState,
    view_mode: ViewMode,
    fields: &FieldRegistry,
) -> BinderSnapshot {
    let mut order: Vec<ItemId> = Vec::with_capacity(store.len());
    for &root in store.root_ids() {
        order.push(root);
        order.extend(store.descendants(root));
    }
    let placed: HashSet<ItemId> = order.iter().copied().collect();
    let mut loose: Vec<ItemId> = store
        .iter()
        .map(|item| item.id)
        .filter(|id| !placed.contains(id))
        .collect();
    loose.sort();
    order.extend(loose);

    BinderSnapshot {
        version: SNAPSHOT_VERSION,
        items: order
            .into_iter()
            .filter_map(|id| store.get(id).cloned())
            .collect(),
        root_ids: store.root_ids().to_vec(),
        navigation: navigation.clone(),
        view_mode,
        field_defs: fields.list().to_vec(),
    }
}

/// Rebuild a consistent store from a snapshot.
pub(crate) fn restore(snapshot: BinderSnapshot) -> Result<Restored, SnapshotError> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            expected: SNAPSHOT_VERSION,
            actual: snapshot.version,
        });
    }

    let mut report = LoadReport::default();

    let mut items: HashMap<ItemId, Item> = HashMap::with_capacity(snapshot.items.len());
    for item in snapshot.items {
        if items.contains_key(&item.id) {
            report.push(Repair::DuplicateRecord { id: item.id });
            continue;
        }
        items.insert(item.id, item);
    }

    let mut root_ids: Vec<ItemId> = Vec::with_capacity(snapshot.root_ids.len());
    for id in snapshot.root_ids {
        if root_ids.contains(&id) {
            report.push(Repair::DuplicateRoot { id });
            continue;
        }
        let root = items.get(&id).ok_or(SnapshotError::MissingRoot(id))?;
        if root.parent_id.is_some() {
            return Err(SnapshotError::RootHasParent(id));
        }
        root_ids.push(id);
    }
    let trash_id = root_ids
        .iter()
        .rev()
        .copied()
        .find(|id| items.get(id).is_some_and(|item| item.kind == ItemKind::Trash))
        .ok_or(SnapshotError::MissingTrash)?;

    let recorded: HashMap<ItemId, Option<ItemId>> =
        items.values().map(|item| (item.id, item.parent_id)).collect();
    let roots: HashSet<ItemId> = root_ids.iter().copied().collect();

    // child -> the parent whose listing was kept
    let mut claimed: HashMap<ItemId, ItemId> = HashMap::new();
    for &root in &root_ids {
        claim_subtree(&mut items, root, &roots, &mut claimed, &mut report);
    }

    loop {
        let mut unreachable: Vec<ItemId> = items
            .keys()
            .copied()
            .filter(|id| !roots.contains(id) && !claimed.contains_key(id))
            .collect();
        if unreachable.is_empty() {
            break;
        }
        unreachable.sort();

        let is_reachable = |id: ItemId| roots.contains(&id) || claimed.contains_key(&id);
        let homed = unreachable.iter().copied().find_map(|id| {
            recorded
                .get(&id)
                .copied()
                .flatten()
                .filter(|&parent| is_reachable(parent))
                .map(|parent| (id, parent))
        });

        let (id, parent) = match homed {
            Some((id, parent)) => {
                report.push(Repair::Reattached { id, parent });
                (id, parent)
            }
            None => {
                // Prefer an item no other stray lists, so its subtree comes along.
                let listed: HashSet<ItemId> = unreachable
                    .iter()
                    .filter_map(|id| items.get(id))
                    .flat_map(|item| item.children.iter().copied())
                    .collect();
                let id = unreachable
                    .iter()
                    .copied()
                    .find(|id| !listed.contains(id))
                    .unwrap_or(unreachable[0]);
                report.push(Repair::MovedToTrash { id });
                (id, trash_id)
            }
        };
        if let Some(parent_item) = items.get_mut(&parent) {
            parent_item.children.push(id);
        }
        claimed.insert(id, parent);
        claim_subtree(&mut items, id, &roots, &mut claimed, &mut report);
    }

    let mut ids: Vec<ItemId> = items.keys().copied().collect();
    ids.sort();
    for id in ids {
        let actual = claimed.get(&id).copied();
        let before = recorded.get(&id).copied().flatten();
        if let Some(actual) = actual {
            if before != Some(actual) && !report_has_reattach(&report, id) {
                report.push(Repair::ParentRewritten {
                    id,
                    recorded: before,
                    actual,
                });
            }
        }
        if let Some(item) = items.get_mut(&id) {
            item.parent_id = actual;
        }
    }

    let store = ItemStore::from_parts(items, root_ids, trash_id);

    let mut navigation = snapshot.navigation;
    let pruned = navigation.prune(&store);
    if pruned > 0 {
        report.push(Repair::NavigationPruned { count: pruned });
    }

    info!(
        items = store.len(),
        repairs = report.repairs.len(),
        "loaded binder snapshot"
    );

    Ok(Restored {
        store,
        navigation,
        view_mode: snapshot.view_mode,
        fields: FieldRegistry::from_defs(snapshot.field_defs),
        report,
    })
}

fn report_has_reattach(report: &LoadReport, id: ItemId) -> bool {
    report.repairs.iter().any(|r| {
        matches!(r, Repair::Reattached { id: reattached, .. } | Repair::MovedToTrash { id: reattached } if *reattached == id)
    })
}

/// Walk down from `start`, keeping the first listing of every child and
/// dropping references that are missing, roots, or already claimed.
fn claim_subtree(
    items: &mut HashMap<ItemId, Item>,
    start: ItemId,
    roots: &HashSet<ItemId>,
    claimed: &mut HashMap<ItemId, ItemId>,
    report: &mut LoadReport,
) {
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        let listed = match items.get(&id) {
            Some(item) => item.children.clone(),
            None => continue,
        };

        let mut kept = Vec::with_capacity(listed.len());
        for child in listed {
            if !items.contains_key(&child) {
                report.push(Repair::DanglingChild { parent: id, child });
            } else if roots.contains(&child) {
                report.push(Repair::RootListedAsChild { parent: id, child });
            } else if claimed.contains_key(&child) {
                report.push(Repair::DuplicateChild { parent: id, child });
            } else {
                claimed.insert(child, id);
                kept.push(child);
            }
        }

        stack.extend(kept.iter().rev().copied());
        if let Some(item) = items.get_mut(&id) {
            item.children = kept;
        }
    }
}
