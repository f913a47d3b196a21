//! Navigation state
//!
//! Selection, view root, hoist, bookmarks, and the binder search term. None
//! of it is structural: the visible forest is derived on every read from
//! the store plus this state, never cached.

use serde::{Deserialize, Serialize};

use crate::item::ItemId;
use crate::store::ItemStore;

/// How a click combines with the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectGesture {
    /// Plain click: the item becomes the only selection
    Replace,
    /// Modifier click: toggle membership, never emptying the selection
    Toggle,
    /// Range click: add without removing
    Extend,
}

/// One line of the flattened binder, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinderRow {
    pub id: ItemId,
    pub depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    selection: Vec<ItemId>,
    focused: Option<ItemId>,
    view_root: Option<ItemId>,
    hoisted: Option<ItemId>,
    bookmarks: Vec<ItemId>,
    search_term: String,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `id` selected and shown, as a freshly opened project does.
    pub fn focused_on(id: ItemId) -> Self {
        Self {
            selection: vec![id],
            focused: Some(id),
            view_root: Some(id),
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Apply a click. Returns true when `id` is now the sole selection
    /// because of a plain click.
    pub fn select(&mut self, id: ItemId, gesture: SelectGesture) -> bool {
        match gesture {
            SelectGesture::Replace => {
                self.selection = vec![id];
            }
            SelectGesture::Toggle => {
                if let Some(pos) = self.selection.iter().position(|&s| s == id) {
                    if self.selection.len() > 1 {
                        self.selection.remove(pos);
                    }
                } else {
                    self.selection.push(id);
                }
            }
            SelectGesture::Extend => {
                if !self.selection.contains(&id) {
                    self.selection.push(id);
                }
            }
        }
        self.focused = Some(id);
        gesture == SelectGesture::Replace
    }

    /// Make `id` the only selected item.
    pub fn select_only(&mut self, id: ItemId) {
        self.select(id, SelectGesture::Replace);
    }

    /// Selected ids in click order.
    pub fn selection(&self) -> &[ItemId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selection.contains(&id)
    }

    /// The last clicked item (the inspector target).
    pub fn focused(&self) -> Option<ItemId> {
        self.focused
    }

    // ------------------------------------------------------------------
    // View root and hoist
    // ------------------------------------------------------------------

    pub fn view_root(&self) -> Option<ItemId> {
        self.view_root
    }

    pub fn set_view_root(&mut self, id: Option<ItemId>) {
        self.view_root = id;
    }

    pub fn hoisted(&self) -> Option<ItemId> {
        self.hoisted
    }

    pub fn set_hoist(&mut self, id: Option<ItemId>) {
        self.hoisted = id;
    }

    // ------------------------------------------------------------------
    // Bookmarks
    // ------------------------------------------------------------------

    pub fn bookmarks(&self) -> &[ItemId] {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, id: ItemId) -> bool {
        self.bookmarks.contains(&id)
    }

    /// Add or remove a bookmark. Returns whether `id` is now bookmarked.
    pub fn toggle_bookmark(&mut self, id: ItemId) -> bool {
        if let Some(pos) = self.bookmarks.iter().position(|&b| b == id) {
            self.bookmarks.remove(pos);
            false
        } else {
            self.bookmarks.push(id);
            true
        }
    }

    // ------------------------------------------------------------------
    // Search and visible forest
    // ------------------------------------------------------------------

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn is_searching(&self) -> bool {
        !self.search_term.is_empty()
    }

    /// Roots the binder shows: the hoisted item alone, otherwise the roots
    /// whose subtree matches the search (all of them when not searching).
    pub fn visible_roots(&self, store: &ItemStore) -> Vec<ItemId> {
        if let Some(hoisted) = self.hoisted {
            return vec![hoisted];
        }
        if !self.is_searching() {
            return store.root_ids().to_vec();
        }
        let needle = self.search_term.to_lowercase();
        store
            .root_ids()
            .iter()
            .copied()
            .filter(|&id| tree_contains_match(store, id, &needle))
            .collect()
    }

    /// Children of `id` the binder shows under the current search.
    pub fn visible_children(&self, store: &ItemStore, id: ItemId) -> Vec<ItemId> {
        let Ok(children) = store.children_of(id) else {
            return Vec::new();
        };
        if !self.is_searching() {
            return children.to_vec();
        }
        let needle = self.search_term.to_lowercase();
        children
            .iter()
            .copied()
            .filter(|&child| tree_contains_match(store, child, &needle))
            .collect()
    }

    /// Whether `id` or anything below it matches the current search term.
    pub fn matches(&self, store: &ItemStore, id: ItemId) -> bool {
        !self.is_searching() || tree_contains_match(store, id, &self.search_term.to_lowercase())
    }

    /// Flatten the visible forest into display rows.
    ///
    /// Children are listed when their parent is expanded, or always while a
    /// search is active so matches are never hidden by a collapsed folder.
    pub fn binder_rows(&self, store: &ItemStore) -> Vec<BinderRow> {
        let mut rows = Vec::new();
        for root in self.visible_roots(store) {
            self.collect_rows(store, root, 0, &mut rows);
        }
        rows
    }

    fn collect_rows(&self, store: &ItemStore, id: ItemId, depth: usize, rows: &mut Vec<BinderRow>) {
        let Some(item) = store.get(id) else {
            return;
        };
        rows.push(BinderRow { id, depth });
        if item.expanded || self.is_searching() {
            for child in self.visible_children(store, id) {
                self.collect_rows(store, child, depth + 1, rows);
            }
        }
    }

    // ------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------

    /// Drop every reference to ids the store no longer holds. Returns the
    /// number of references removed.
    pub fn prune(&mut self, store: &ItemStore) -> usize {
        let before = self.reference_count();

        self.selection.retain(|&id| store.contains(id));
        self.bookmarks.retain(|&id| store.contains(id));
        if self.focused.is_some_and(|id| !store.contains(id)) {
            self.focused = None;
        }
        if self.view_root.is_some_and(|id| !store.contains(id)) {
            self.view_root = None;
        }
        if self.hoisted.is_some_and(|id| !store.contains(id)) {
            self.hoisted = None;
        }

        before - self.reference_count()
    }

    fn reference_count(&self) -> usize {
        self.selection.len()
            + self.bookmarks.len()
            + usize::from(self.focused.is_some())
            + usize::from(self.view_root.is_some())
            + usize::from(self.hoisted.is_some())
    }
}

/// Title match (case-insensitive) on the item or any descendant.
/// `needle` must already be lowercase.
fn tree_contains_match(store: &ItemStore, id: ItemId, needle: &str) -> bool {
    let Some(item) = store.get(id) else {
        return false;
    };
    if item.title.to_lowercase().contains(needle) {
        return true;
    }
    item.children()
        .iter()
        .any(|&child| tree_contains_match(store, child, needle))
}
