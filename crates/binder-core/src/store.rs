//! Authoritative item map
//!
//! `ItemStore` owns every binder record and the ordered list of protected
//! roots. It is the only place the parent/child relation lives: `children`
//! sequences give sibling order and each child's `parent_id` is kept in step
//! with them by the crate-private `attach`/`detach` pair, the single write
//! path used by the tree mutator.

use chrono::Utc;
use std::collections::{HashMap, HashSet};

use crate::error::{BinderError, Result};
use crate::item::{FieldMutation, Item, ItemId, ItemKind};

/// In-memory store of binder items.
#[derive(Debug, Clone)]
pub struct ItemStore {
    items: HashMap<ItemId, Item>,
    root_ids: Vec<ItemId>,
    trash_id: ItemId,
}

/// A broken tree invariant, reported by [`ItemStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A root id has no record
    MissingRoot(ItemId),
    /// A root claims a parent or is listed as someone's child
    RootNotFree(ItemId),
    /// `children` references an id with no record
    DanglingChild { parent: ItemId, child: ItemId },
    /// An id is listed more than once across all `children` sequences
    DuplicateChild { parent: ItemId, child: ItemId },
    /// `parent_id` disagrees with the `children` listing
    ParentMismatch {
        child: ItemId,
        recorded: Option<ItemId>,
        listed_under: Option<ItemId>,
    },
    /// An item is its own transitive ancestor
    Cycle(ItemId),
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantViolation::MissingRoot(id) => write!(f, "root {} has no record", id),
            InvariantViolation::RootNotFree(id) => write!(f, "root {} is attached to a parent", id),
            InvariantViolation::DanglingChild { parent, child } => {
                write!(f, "{} lists missing child {}", parent, child)
            }
            InvariantViolation::DuplicateChild { parent, child } => {
                write!(f, "{} lists {} which is already listed elsewhere", parent, child)
            }
            InvariantViolation::ParentMismatch {
                child,
                recorded,
                listed_under,
            } => write!(
                f,
                "{} records parent {:?} but is listed under {:?}",
                child, recorded, listed_under
            ),
            InvariantViolation::Cycle(id) => write!(f, "{} is its own ancestor", id),
        }
    }
}

impl ItemStore {
    /// Create a store holding only the given roots. The last title becomes the
    /// trash root; the others are folders.
    pub fn with_roots(titles: &[String]) -> Self {
        let mut items = HashMap::new();
        let mut root_ids = Vec::with_capacity(titles.len().max(1));

        for (i, title) in titles.iter().enumerate() {
            let kind = if i + 1 == titles.len() {
                ItemKind::Trash
            } else {
                ItemKind::Folder
            };
            let mut root = Item::new(ItemId::new(), kind, title.clone());
            root.status = None;
            root.expanded = kind != ItemKind::Trash;
            root_ids.push(root.id);
            items.insert(root.id, root);
        }

        // A store always has somewhere to put deleted items.
        if root_ids.is_empty() {
            let mut trash = Item::new(ItemId::new(), ItemKind::Trash, "Trash");
            trash.status = None;
            trash.expanded = false;
            root_ids.push(trash.id);
            items.insert(trash.id, trash);
        }

        let trash_id = root_ids[root_ids.len() - 1];
        Self {
            items,
            root_ids,
            trash_id,
        }
    }

    /// Rebuild a store from already-repaired parts.
    pub(crate) fn from_parts(
        items: HashMap<ItemId, Item>,
        root_ids: Vec<ItemId>,
        trash_id: ItemId,
    ) -> Self {
        Self {
            items,
            root_ids,
            trash_id,
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Get an item or fail with `NotFound`.
    pub fn require(&self, id: ItemId) -> Result<&Item> {
        self.items.get(&id).ok_or(BinderError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Ordered children of an item.
    pub fn children_of(&self, id: ItemId) -> Result<&[ItemId]> {
        Ok(self.require(id)?.children())
    }

    pub fn parent_of(&self, id: ItemId) -> Option<ItemId> {
        self.items.get(&id).and_then(|item| item.parent_id)
    }

    pub fn root_ids(&self) -> &[ItemId] {
        &self.root_ids
    }

    pub fn is_root(&self, id: ItemId) -> bool {
        self.root_ids.contains(&id)
    }

    pub fn trash_id(&self) -> ItemId {
        self.trash_id
    }

    /// Ancestors from the outermost root down to the direct parent.
    pub fn ancestors(&self, id: ItemId) -> Vec<ItemId> {
        let mut result = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            // Guards against a corrupted chain looping forever.
            if result.contains(&parent) || parent == id {
                break;
            }
            result.push(parent);
            current = self.parent_of(parent);
        }
        result.reverse();
        result
    }

    /// All descendants in pre-order (display order).
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        let mut result = Vec::new();
        self.collect_descendants(id, &mut result);
        result
    }

    fn collect_descendants(&self, id: ItemId, result: &mut Vec<ItemId>) {
        if let Some(item) = self.items.get(&id) {
            for &child in &item.children {
                result.push(child);
                self.collect_descendants(child, result);
            }
        }
    }

    /// Whether `candidate` sits somewhere below `ancestor`. O(depth).
    pub fn is_descendant(&self, candidate: ItemId, ancestor: ItemId) -> bool {
        let mut current = self.parent_of(candidate);
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.items.len() {
                return false;
            }
            current = self.parent_of(parent);
        }
        false
    }

    // ------------------------------------------------------------------
    // Field writes
    // ------------------------------------------------------------------

    /// Create an empty item appended to `parent`'s children.
    ///
    /// With `parent = None` the item is orphaned until the caller moves it
    /// into the tree.
    pub fn create(
        &mut self,
        parent: Option<ItemId>,
        kind: ItemKind,
        title: impl Into<String>,
    ) -> Result<ItemId> {
        let item = Item::new(ItemId::new(), kind, title);
        let id = item.id;
        if let Some(parent_id) = parent {
            if !self.items.contains_key(&parent_id) {
                return Err(BinderError::InvalidParent {
                    item: id,
                    parent: parent_id,
                });
            }
        }
        self.items.insert(id, item);
        if let Some(parent_id) = parent {
            self.attach(id, parent_id, None);
        }
        Ok(id)
    }

    /// Replace non-structural fields and refresh `modified_at`.
    pub fn update(&mut self, id: ItemId, mutations: Vec<FieldMutation>) -> Result<&Item> {
        let item = self.items.get_mut(&id).ok_or(BinderError::NotFound(id))?;
        for mutation in mutations {
            item.apply(mutation);
        }
        item.modified_at = Utc::now();
        Ok(item)
    }

    /// Set the binder disclosure state. Navigation only; `modified_at` is kept.
    pub fn set_expanded(&mut self, id: ItemId, expanded: bool) -> Result<()> {
        let item = self.items.get_mut(&id).ok_or(BinderError::NotFound(id))?;
        item.expanded = expanded;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural writes (crate-private)
    // ------------------------------------------------------------------

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Insert a fully built, unattached record.
    pub(crate) fn insert_detached(&mut self, mut item: Item) -> ItemId {
        item.parent_id = None;
        item.children.clear();
        let id = item.id;
        self.items.insert(id, item);
        id
    }

    /// Remove `id` from its parent's children. Returns the old parent and index.
    pub(crate) fn detach(&mut self, id: ItemId) -> Option<(ItemId, usize)> {
        let parent_id = self.items.get_mut(&id)?.parent_id.take()?;
        let parent = self.items.get_mut(&parent_id)?;
        let index = parent.children.iter().position(|&c| c == id)?;
        parent.children.remove(index);
        Some((parent_id, index))
    }

    /// Insert `id` into `parent`'s children at `index` (append when `None`
    /// or past the end). `id` must already be detached.
    pub(crate) fn attach(&mut self, id: ItemId, parent_id: ItemId, index: Option<usize>) {
        if let Some(parent) = self.items.get_mut(&parent_id) {
            let at = index
                .filter(|&i| i <= parent.children.len())
                .unwrap_or(parent.children.len());
            parent.children.insert(at, id);
        }
        if let Some(item) = self.items.get_mut(&id) {
            item.parent_id = Some(parent_id);
        }
    }

    /// Replace a parent's child order with a permutation of itself.
    pub(crate) fn reorder_children(&mut self, parent_id: ItemId, order: Vec<ItemId>) {
        if let Some(parent) = self.items.get_mut(&parent_id) {
            debug_assert_eq!(parent.children.len(), order.len());
            parent.children = order;
        }
    }

    /// Purge a record and unlink it from its parent.
    ///
    /// The caller re-homes any children first; the mutator only removes
    /// childless records through this path.
    pub(crate) fn remove(&mut self, id: ItemId) -> Result<Item> {
        if self.is_root(id) {
            return Err(BinderError::IllegalRootOperation(id));
        }
        if !self.items.contains_key(&id) {
            return Err(BinderError::NotFound(id));
        }
        self.detach(id);
        self.items.remove(&id).ok_or(BinderError::NotFound(id))
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Check every tree invariant, collecting all violations.
    pub fn validate(&self) -> std::result::Result<(), Vec<InvariantViolation>> {
        let mut errors = Vec::new();
        let mut listed_under: HashMap<ItemId, ItemId> = HashMap::new();

        for &root in &self.root_ids {
            match self.items.get(&root) {
                None => errors.push(InvariantViolation::MissingRoot(root)),
                Some(item) if item.parent_id.is_some() => {
                    errors.push(InvariantViolation::RootNotFree(root))
                }
                Some(_) => {}
            }
        }

        for item in self.items.values() {
            for &child in &item.children {
                if !self.items.contains_key(&child) {
                    errors.push(InvariantViolation::DanglingChild {
                        parent: item.id,
                        child,
                    });
                    continue;
                }
                if self.is_root(child) {
                    errors.push(InvariantViolation::RootNotFree(child));
                }
                if listed_under.insert(child, item.id).is_some() {
                    errors.push(InvariantViolation::DuplicateChild {
                        parent: item.id,
                        child,
                    });
                }
            }
        }

        for item in self.items.values() {
            let listed = listed_under.get(&item.id).copied();
            if item.parent_id != listed {
                errors.push(InvariantViolation::ParentMismatch {
                    child: item.id,
                    recorded: item.parent_id,
                    listed_under: listed,
                });
            }
        }

        for &id in self.items.keys() {
            let mut seen = HashSet::new();
            let mut current = Some(id);
            while let Some(node) = current {
                if !seen.insert(node) {
                    errors.push(InvariantViolation::Cycle(id));
                    break;
                }
                current = self.parent_of(node);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::with_roots(&["Draft".into(), "Research".into(), "Trash".into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Status;

    fn draft(store: &ItemStore) -> ItemId {
        store.root_ids()[0]
    }

    #[test]
    fn default_roots() {
        let store = ItemStore::default();
        assert_eq!(store.root_ids().len(), 3);
        let trash = store.get(store.trash_id()).unwrap();
        assert_eq!(trash.kind, ItemKind::Trash);
        assert_eq!(trash.title, "Trash");
        assert!(store.validate().is_ok());
    }

    #[test]
    fn empty_root_list_still_has_trash() {
        let store = ItemStore::with_roots(&[]);
        assert_eq!(store.root_ids(), &[store.trash_id()]);
    }

    #[test]
    fn create_appends_to_parent() {
        let mut store = ItemStore::default();
        let root = draft(&store);
        let a = store.create(Some(root), ItemKind::Document, "A").unwrap();
        let b = store.create(Some(root), ItemKind::Document, "B").unwrap();
        assert_eq!(store.children_of(root).unwrap(), &[a, b]);
        assert_eq!(store.parent_of(b), Some(root));
        assert!(store.validate().is_ok());
    }

    #[test]
    fn create_with_unknown_parent_fails() {
        let mut store = ItemStore::default();
        let before = store.len();
        let err = store
            .create(Some(ItemId::new()), ItemKind::Document, "A")
            .unwrap_err();
        assert!(matches!(err, BinderError::InvalidParent { .. }));
        assert_eq!(store.len(), before);
    }

    #[test]
    fn create_orphan() {
        let mut store = ItemStore::default();
        let id = store.create(None, ItemKind::Document, "Loose").unwrap();
        assert_eq!(store.parent_of(id), None);
        assert!(!store.is_root(id));
        assert!(store.validate().is_ok());
    }

    #[test]
    fn update_replaces_fields_and_touches() {
        let mut store = ItemStore::default();
        let id = store
            .create(Some(draft(&store)), ItemKind::Document, "A")
            .unwrap();
        let before = store.get(id).unwrap().modified_at;
        let item = store
            .update(
                id,
                vec![
                    FieldMutation::SetTitle("Renamed".into()),
                    FieldMutation::SetStatus(Some(Status::Done)),
                ],
            )
            .unwrap();
        assert_eq!(item.title, "Renamed");
        assert_eq!(item.status, Some(Status::Done));
        assert!(item.modified_at >= before);
    }

    #[test]
    fn update_unknown_fails() {
        let mut store = ItemStore::default();
        let id = ItemId::new();
        assert_eq!(
            store.update(id, vec![]).unwrap_err(),
            BinderError::NotFound(id)
        );
    }

    #[test]
    fn set_expanded_keeps_modified() {
        let mut store = ItemStore::default();
        let id = store
            .create(Some(draft(&store)), ItemKind::Folder, "Ch")
            .unwrap();
        let before = store.get(id).unwrap().modified_at;
        store.set_expanded(id, false).unwrap();
        let item = store.get(id).unwrap();
        assert!(!item.expanded);
        assert_eq!(item.modified_at, before);
    }

    #[test]
    fn ancestors_and_descendants() {
        let mut store = ItemStore::default();
        let root = draft(&store);
        let ch = store.create(Some(root), ItemKind::Folder, "Ch").unwrap();
        let s1 = store.create(Some(ch), ItemKind::Document, "S1").unwrap();
        let s2 = store.create(Some(ch), ItemKind::Document, "S2").unwrap();

        assert_eq!(store.ancestors(s1), vec![root, ch]);
        assert_eq!(store.descendants(root), vec![ch, s1, s2]);
        assert!(store.is_descendant(s2, root));
        assert!(!store.is_descendant(root, s2));
    }

    #[test]
    fn remove_unlinks_from_parent() {
        let mut store = ItemStore::default();
        let root = draft(&store);
        let a = store.create(Some(root), ItemKind::Document, "A").unwrap();
        let removed = store.remove(a).unwrap();
        assert_eq!(removed.id, a);
        assert!(store.children_of(root).unwrap().is_empty());
        assert!(store.get(a).is_none());
        assert!(store.validate().is_ok());
    }

    #[test]
    fn remove_root_is_illegal() {
        let mut store = ItemStore::default();
        let root = draft(&store);
        assert_eq!(
            store.remove(root).unwrap_err(),
            BinderError::IllegalRootOperation(root)
        );
    }

    #[test]
    fn validate_reports_mismatch() {
        let mut store = ItemStore::default();
        let root = draft(&store);
        let a = store.create(Some(root), ItemKind::Document, "A").unwrap();
        store.get_mut(a).unwrap().parent_id = None;
        let errors = store.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, InvariantViolation::ParentMismatch { child, .. } if *child == a)));
    }

    #[test]
    fn validate_reports_dangling_child() {
        let mut store = ItemStore::default();
        let root = draft(&store);
        let ghost = ItemId::new();
        store.get_mut(root).unwrap().children.push(ghost);
        let errors = store.validate().unwrap_err();
        assert!(errors.contains(&InvariantViolation::DanglingChild {
            parent: root,
            child: ghost
        }));
    }
}
