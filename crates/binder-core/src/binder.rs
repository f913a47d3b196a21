//! The binder facade
//!
//! [`Binder`] ties the store, the tree mutator, navigation state, view mode,
//! custom fields, and change notifications into the single API the views
//! talk to. Every write goes through here so events and navigation stay in
//! step with the tree.

use std::sync::mpsc::Receiver;
use tracing::debug;

use crate::config::BinderConfig;
use crate::error::{BinderError, Result};
use crate::event::{BinderEvent, EventBus};
use crate::fields::{FieldDef, FieldRegistry};
use crate::item::{FieldMutation, Item, ItemId, ItemKind, SpatialPosition};
use crate::mode::{derive_mode, ViewMode};
use crate::navigation::{BinderRow, NavigationState, SelectGesture};
use crate::snapshot::{self, BinderSnapshot, LoadReport};
use crate::spatial;
use crate::store::{InvariantViolation, ItemStore};
use crate::tree::{DropPosition, MergeOutcome, MoveOutcome, TreeMutator};

/// A project's binder: the document tree plus how it is being viewed.
#[derive(Debug)]
pub struct Binder {
    store: ItemStore,
    navigation: NavigationState,
    view_mode: ViewMode,
    fields: FieldRegistry,
    config: BinderConfig,
    events: EventBus,
}

impl Binder {
    /// Create an empty binder with the configured roots. The first root
    /// starts selected and shown.
    pub fn new(config: BinderConfig) -> Result<Self> {
        config.validate()?;
        let store = ItemStore::with_roots(&config.roots);
        let navigation = NavigationState::focused_on(store.root_ids()[0]);
        Ok(Self {
            store,
            navigation,
            view_mode: ViewMode::default(),
            fields: FieldRegistry::new(),
            config,
            events: EventBus::new(),
        })
    }

    /// Rebuild a binder from a snapshot, repairing what can be repaired.
    pub fn from_snapshot(
        snapshot: BinderSnapshot,
        config: BinderConfig,
    ) -> Result<(Self, LoadReport)> {
        config.validate()?;
        let restored = snapshot::restore(snapshot)?;
        let binder = Self {
            store: restored.store,
            navigation: restored.navigation,
            view_mode: restored.view_mode,
            fields: restored.fields,
            config,
            events: EventBus::new(),
        };
        Ok((binder, restored.report))
    }

    pub fn to_snapshot(&self) -> BinderSnapshot {
        snapshot::capture(&self.store, &self.navigation, self.view_mode, &self.fields)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.store.get(id)
    }

    pub fn children_of(&self, id: ItemId) -> Result<&[ItemId]> {
        self.store.children_of(id)
    }

    pub fn root_ids(&self) -> &[ItemId] {
        self.store.root_ids()
    }

    pub fn trash_id(&self) -> ItemId {
        self.store.trash_id()
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Roots the binder shows under the current hoist and search.
    pub fn visible_roots(&self) -> Vec<ItemId> {
        self.navigation.visible_roots(&self.store)
    }

    /// Visible forest flattened into display rows.
    pub fn binder_rows(&self) -> Vec<BinderRow> {
        self.navigation.binder_rows(&self.store)
    }

    pub fn selection(&self) -> &[ItemId] {
        self.navigation.selection()
    }

    pub fn focused(&self) -> Option<ItemId> {
        self.navigation.focused()
    }

    pub fn view_root(&self) -> Option<ItemId> {
        self.navigation.view_root()
    }

    pub fn hoisted(&self) -> Option<ItemId> {
        self.navigation.hoisted()
    }

    pub fn bookmarks(&self) -> &[ItemId] {
        self.navigation.bookmarks()
    }

    pub fn is_bookmarked(&self, id: ItemId) -> bool {
        self.navigation.is_bookmarked(id)
    }

    pub fn search_term(&self) -> &str {
        self.navigation.search_term()
    }

    /// Selected items in selection order, for the concatenated editor.
    pub fn scrivenings(&self) -> Vec<&Item> {
        self.navigation
            .selection()
            .iter()
            .filter_map(|&id| self.store.get(id))
            .collect()
    }

    /// Ancestors from the outermost root down to the direct parent.
    pub fn ancestors(&self, id: ItemId) -> Result<Vec<ItemId>> {
        self.store.require(id)?;
        Ok(self.store.ancestors(id))
    }

    /// Every item below `id`, in display order.
    pub fn descendants(&self, id: ItemId) -> Result<Vec<ItemId>> {
        self.store.require(id)?;
        Ok(self.store.descendants(id))
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<InvariantViolation>> {
        self.store.validate()
    }

    /// Receive every change from now on. Drop the receiver to unsubscribe.
    pub fn subscribe(&mut self) -> Receiver<BinderEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Item writes
    // ------------------------------------------------------------------

    /// Create an empty item appended under `parent`, or unattached when
    /// `parent` is `None`.
    pub fn create(
        &mut self,
        parent: Option<ItemId>,
        kind: ItemKind,
        title: impl Into<String>,
    ) -> Result<ItemId> {
        let id = self.store.create(parent, kind, title)?;
        debug!(id = %id, kind = %kind, "created item");
        self.events.emit(BinderEvent::Created { id, parent });
        Ok(id)
    }

    /// Replace descriptive fields. Custom metadata is checked against the
    /// registered field definitions before anything is written.
    pub fn update(&mut self, id: ItemId, mutations: Vec<FieldMutation>) -> Result<&Item> {
        self.store.require(id)?;
        for mutation in &mutations {
            if let FieldMutation::SetCustomMetadata(metadata) = mutation {
                self.fields.validate(metadata)?;
            }
        }

        self.store.update(id, mutations.clone())?;
        self.events.emit(BinderEvent::Updated { id, mutations });
        self.store.require(id)
    }

    pub fn set_spatial_position(
        &mut self,
        id: ItemId,
        position: Option<SpatialPosition>,
    ) -> Result<()> {
        self.update(id, vec![FieldMutation::SetSpatialPosition(position)])?;
        Ok(())
    }

    /// Open or collapse an item in the binder. Does not count as an edit.
    pub fn set_expanded(&mut self, id: ItemId, expanded: bool) -> Result<()> {
        self.store.set_expanded(id, expanded)?;
        self.events.emit(BinderEvent::NavigationChanged);
        Ok(())
    }

    pub fn register_field(&mut self, field: FieldDef) -> Result<()> {
        self.fields.register(field)
    }

    // ------------------------------------------------------------------
    // Structural writes
    // ------------------------------------------------------------------

    fn mutator(&mut self) -> TreeMutator<'_> {
        TreeMutator::new(&mut self.store, &self.config.tree)
    }

    pub fn move_item(
        &mut self,
        dragged: ItemId,
        target: ItemId,
        position: DropPosition,
    ) -> Result<MoveOutcome> {
        let outcome = self.mutator().move_item(dragged, target, position)?;
        self.events.emit(BinderEvent::Moved {
            id: dragged,
            from: outcome.from,
            to: outcome.to,
        });
        Ok(outcome)
    }

    /// Soft delete: move the item to the end of the trash.
    pub fn delete(&mut self, id: ItemId) -> Result<MoveOutcome> {
        let trash = self.store.trash_id();
        let outcome = self
            .mutator()
            .move_item(id, trash, DropPosition::Inside)?;
        self.events.emit(BinderEvent::Deleted {
            id,
            from: outcome.from,
        });
        Ok(outcome)
    }

    /// Split a document at the caret. The new sibling becomes the sole
    /// selection.
    pub fn split(
        &mut self,
        id: ItemId,
        content_before: &str,
        content_after: &str,
        new_title: &str,
    ) -> Result<ItemId> {
        let created = self
            .mutator()
            .split(id, content_before, content_after, new_title)?;
        self.navigation.select_only(created);
        self.events.emit(BinderEvent::Split {
            original: id,
            created,
        });
        self.events.emit(BinderEvent::NavigationChanged);
        Ok(created)
    }

    /// Merge `sources` into `target`. The target becomes the sole selection.
    pub fn merge(&mut self, target: ItemId, sources: &[ItemId]) -> Result<MergeOutcome> {
        let outcome = self.mutator().merge(target, sources)?;
        self.navigation.prune(&self.store);
        self.navigation.select_only(target);
        self.events.emit(BinderEvent::Merged {
            target,
            removed: outcome.removed.clone(),
        });
        self.events.emit(BinderEvent::NavigationChanged);
        Ok(outcome)
    }

    /// Paste a manuscript and break it into one document per section.
    pub fn import_and_split(
        &mut self,
        parent: ItemId,
        raw_text: &str,
        separator: &str,
    ) -> Result<Vec<ItemId>> {
        let created = self.mutator().import_and_split(parent, raw_text, separator)?;
        self.events.emit(BinderEvent::Imported {
            parent,
            created: created.clone(),
        });
        Ok(created)
    }

    /// Turn `parent`'s freeform card layout into its child order.
    pub fn commit_freeform_order(&mut self, parent: ItemId) -> Result<bool> {
        let changed = spatial::commit_freeform_order(&mut self.store, parent, &self.config.freeform)?;
        if changed {
            self.events.emit(BinderEvent::Reordered(parent));
        }
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Click an item. With `auto_switch`, a plain click picks the view mode
    /// suited to the item. Returns the view mode afterwards.
    pub fn select(
        &mut self,
        id: ItemId,
        gesture: SelectGesture,
        auto_switch: bool,
    ) -> Result<ViewMode> {
        let kind = self.store.require(id)?.kind;
        let sole = self.navigation.select(id, gesture);
        if auto_switch && sole {
            self.view_mode =
                derive_mode(self.view_mode, kind, self.navigation.selection().len());
        }
        self.events.emit(BinderEvent::NavigationChanged);
        Ok(self.view_mode)
    }

    pub fn set_view_root(&mut self, id: Option<ItemId>) -> Result<()> {
        self.require_optional(id)?;
        self.navigation.set_view_root(id);
        self.events.emit(BinderEvent::NavigationChanged);
        Ok(())
    }

    /// Restrict the binder to one subtree, or pass `None` to unhoist.
    pub fn set_hoist(&mut self, id: Option<ItemId>) -> Result<()> {
        self.require_optional(id)?;
        self.navigation.set_hoist(id);
        self.events.emit(BinderEvent::NavigationChanged);
        Ok(())
    }

    /// Returns whether the item is bookmarked afterwards.
    pub fn toggle_bookmark(&mut self, id: ItemId) -> Result<bool> {
        self.store.require(id)?;
        let marked = self.navigation.toggle_bookmark(id);
        self.events.emit(BinderEvent::NavigationChanged);
        Ok(marked)
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.navigation.set_search_term(term);
        self.events.emit(BinderEvent::NavigationChanged);
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.events.emit(BinderEvent::NavigationChanged);
    }

    fn require_optional(&self, id: Option<ItemId>) -> Result<()> {
        match id {
            Some(id) if !self.store.contains(id) => Err(BinderError::NotFound(id)),
            _ => Ok(()),
        }
    }
}

impl Default for Binder {
    fn default() -> Self {
        let config = BinderConfig::default();
        let store = ItemStore::with_roots(&config.roots);
        let navigation = NavigationState::focused_on(store.root_ids()[0]);
        Self {
            store,
            navigation,
            view_mode: ViewMode::default(),
            fields: FieldRegistry::new(),
            config,
            events: EventBus::new(),
        }
    }
}
