//! Structural tree operations
//!
//! `TreeMutator` is the only code that restructures the binder: move,
//! split, merge, and import-and-split. Every operation checks all of its
//! preconditions against the store before the first write, so a rejected
//! operation leaves the tree untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TreeConfig;
use crate::error::{BinderError, Result};
use crate::item::{Item, ItemId, ItemKind};
use crate::store::ItemStore;
use crate::text::{truncate_title, word_count, wrap_paragraphs};

/// Where a dragged item lands relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    Inside,
    After,
}

/// Result of a successful move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: Option<ItemId>,
    pub to: ItemId,
    pub index: usize,
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Sources deleted from the store, in merge order
    pub removed: Vec<ItemId>,
    /// Children of the removed sources re-homed under the target
    pub adopted: Vec<ItemId>,
}

/// Structural editor over an [`ItemStore`].
pub struct TreeMutator<'a> {
    store: &'a mut ItemStore,
    config: &'a TreeConfig,
}

fn rejected(op: &'static str, err: BinderError) -> BinderError {
    warn!(op, error = %err, "rejected tree mutation");
    err
}

impl<'a> TreeMutator<'a> {
    pub fn new(store: &'a mut ItemStore, config: &'a TreeConfig) -> Self {
        Self { store, config }
    }

    /// Move `dragged` before, inside, or after `target`.
    pub fn move_item(
        &mut self,
        dragged: ItemId,
        target: ItemId,
        position: DropPosition,
    ) -> Result<MoveOutcome> {
        let new_parent = self
            .check_move(dragged, target, position)
            .map_err(|e| rejected("move", e))?;

        let from = self.store.detach(dragged).map(|(parent, _)| parent);

        let index = match position {
            DropPosition::Inside => {
                self.store.attach(dragged, target, None);
                if let Some(parent) = self.store.get_mut(target) {
                    parent.expanded = true;
                }
                self.store.children_of(target)?.len() - 1
            }
            DropPosition::Before | DropPosition::After => {
                // Look the target up after the detach so a same-parent move
                // lands next to it rather than one slot off.
                let siblings = self.store.children_of(new_parent)?;
                let target_index = siblings
                    .iter()
                    .position(|&c| c == target)
                    .unwrap_or(siblings.len());
                let at = match position {
                    DropPosition::Before => target_index,
                    _ => target_index + 1,
                };
                self.store.attach(dragged, new_parent, Some(at));
                at
            }
        };

        debug!(id = %dragged, parent = %new_parent, index, "moved item");
        Ok(MoveOutcome {
            from,
            to: new_parent,
            index,
        })
    }

    /// Validate a move and resolve the parent the item will land under.
    fn check_move(&self, dragged: ItemId, target: ItemId, position: DropPosition) -> Result<ItemId> {
        self.store.require(dragged)?;
        self.store.require(target)?;

        if self.store.is_root(dragged) {
            return Err(BinderError::IllegalRootOperation(dragged));
        }
        if dragged == target {
            return Err(BinderError::InvalidParent {
                item: dragged,
                parent: target,
            });
        }

        let new_parent = match position {
            DropPosition::Inside => target,
            DropPosition::Before | DropPosition::After => {
                if self.store.is_root(target) {
                    return Err(BinderError::InvalidParent {
                        item: dragged,
                        parent: target,
                    });
                }
                let parent = self
                    .store
                    .parent_of(target)
                    .ok_or(BinderError::Detached(target))?;
                if !self.store.children_of(parent)?.contains(&target) {
                    return Err(BinderError::Detached(target));
                }
                parent
            }
        };

        if new_parent == dragged || self.store.is_descendant(new_parent, dragged) {
            return Err(BinderError::InvalidParent {
                item: dragged,
                parent: new_parent,
            });
        }

        Ok(new_parent)
    }

    /// Split a document in two. The original keeps `before`; a new sibling
    /// holding `after` is inserted right after it. Returns the new item's id.
    pub fn split(&mut self, id: ItemId, before: &str, after: &str, new_title: &str) -> Result<ItemId> {
        let parent = self.check_split(id).map_err(|e| rejected("split", e))?;

        let index = self
            .store
            .children_of(parent)?
            .iter()
            .position(|&c| c == id)
            .ok_or(BinderError::Detached(id))
            .map_err(|e| rejected("split", e))?;

        let now = Utc::now();
        let original = self.store.get_mut(id).ok_or(BinderError::NotFound(id))?;
        original.content = Some(before.to_string());
        original.word_count = word_count(before);
        original.modified_at = now;

        let mut sibling: Item = original.clone();
        sibling.id = ItemId::new();
        sibling.title = new_title.to_string();
        sibling.content = Some(after.to_string());
        sibling.word_count = word_count(after);
        sibling.created_at = now;
        sibling.modified_at = now;

        let new_id = self.store.insert_detached(sibling);
        self.store.attach(new_id, parent, Some(index + 1));

        debug!(id = %id, new_id = %new_id, parent = %parent, "split item");
        Ok(new_id)
    }

    fn check_split(&self, id: ItemId) -> Result<ItemId> {
        self.store.require(id)?;
        if self.store.is_root(id) {
            return Err(BinderError::IllegalRootOperation(id));
        }
        self.store.parent_of(id).ok_or(BinderError::Detached(id))
    }

    /// Fold `sources` into `target`, in order, then delete them.
    ///
    /// Each source's content is appended after the configured separator and
    /// its word count added to the target's. Children of a source are
    /// re-homed at the end of the target's children.
    pub fn merge(&mut self, target: ItemId, sources: &[ItemId]) -> Result<MergeOutcome> {
        let sources = self
            .check_merge(target, sources)
            .map_err(|e| rejected("merge", e))?;

        let mut content = self.store.get(target).and_then(|t| t.content.clone());
        let mut total_words = self.store.get(target).map(|t| t.word_count).unwrap_or(0);
        let mut outcome = MergeOutcome {
            removed: Vec::with_capacity(sources.len()),
            adopted: Vec::new(),
        };

        for source_id in sources {
            let children = self.store.children_of(source_id)?.to_vec();
            for child in children {
                self.store.detach(child);
                self.store.attach(child, target, None);
                outcome.adopted.push(child);
            }

            let source = self.store.remove(source_id)?;
            if let Some(source_content) = source.content.as_deref().filter(|c| !c.is_empty()) {
                let merged = content.get_or_insert_with(String::new);
                merged.push_str(&self.config.merge_separator);
                merged.push_str(source_content);
            }
            total_words += source.word_count;
            outcome.removed.push(source_id);
        }

        if let Some(item) = self.store.get_mut(target) {
            item.content = content;
            item.word_count = total_words;
            item.modified_at = Utc::now();
        }

        debug!(target = %target, removed = outcome.removed.len(), "merged items");
        Ok(outcome)
    }

    /// Resolve the effective, de-duplicated source list.
    fn check_merge(&self, target: ItemId, sources: &[ItemId]) -> Result<Vec<ItemId>> {
        self.store.require(target)?;
        let mut resolved: Vec<ItemId> = Vec::with_capacity(sources.len());
        for &source in sources {
            if source == target || resolved.contains(&source) {
                continue;
            }
            self.store.require(source)?;
            if self.store.is_root(source) {
                return Err(BinderError::IllegalRootOperation(source));
            }
            if self.store.is_descendant(target, source) {
                return Err(BinderError::InvalidParent {
                    item: source,
                    parent: target,
                });
            }
            resolved.push(source);
        }
        Ok(resolved)
    }

    /// Split pasted text on `separator` and append one document per
    /// non-blank segment to `parent`.
    ///
    /// A segment's first line becomes the title, the remaining lines become
    /// paragraphs. An empty separator imports the text as one segment.
    pub fn import_and_split(&mut self, parent: ItemId, raw: &str, separator: &str) -> Result<Vec<ItemId>> {
        self.store
            .require(parent)
            .map_err(|e| rejected("import", e))?;

        let segments: Vec<&str> = if separator.is_empty() {
            vec![raw]
        } else {
            raw.split(separator).collect()
        };

        let mut created = Vec::new();
        for segment in segments {
            let trimmed = segment.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut lines = trimmed.lines();
            let first = lines.next().unwrap_or_default().trim();
            let body: Vec<&str> = lines.collect();

            let mut item = Item::new(
                ItemId::new(),
                ItemKind::Document,
                truncate_title(
                    first,
                    self.config.import_title_max_chars,
                    &self.config.title_ellipsis,
                ),
            );
            if !body.is_empty() {
                item.content = Some(wrap_paragraphs(body.iter().copied()));
            }
            item.word_count = item.content.as_deref().map(word_count).unwrap_or(0);

            let id = self.store.insert_detached(item);
            self.store.attach(id, parent, None);
            created.push(id);
        }

        if let Some(item) = self.store.get_mut(parent) {
            item.expanded = true;
        }

        debug!(parent = %parent, count = created.len(), "imported sections");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinderConfig;

    struct Fixture {
        store: ItemStore,
        config: BinderConfig,
        draft: ItemId,
        research: ItemId,
    }

    impl Fixture {
        fn new() -> Self {
            let store = ItemStore::default();
            let draft = store.root_ids()[0];
            let research = store.root_ids()[1];
            Self {
                store,
                config: BinderConfig::default(),
                draft,
                research,
            }
        }

        fn mutator(&mut self) -> TreeMutator<'_> {
            TreeMutator::new(&mut self.store, &self.config.tree)
        }

        fn doc(&mut self, parent: ItemId, title: &str) -> ItemId {
            self.store
                .create(Some(parent), ItemKind::Document, title)
                .unwrap()
        }

        fn children(&self, id: ItemId) -> Vec<ItemId> {
            self.store.children_of(id).unwrap().to_vec()
        }
    }

    #[test]
    fn move_inside_appends_and_expands() {
        let mut fx = Fixture::new();
        let folder = fx.doc(fx.draft, "Folder");
        let a = fx.doc(fx.research, "A");
        fx.store.set_expanded(folder, false).unwrap();

        let outcome = fx.mutator().move_item(a, folder, DropPosition::Inside).unwrap();
        assert_eq!(outcome.from, Some(fx.research));
        assert_eq!(outcome.to, folder);
        assert_eq!(fx.children(folder), vec![a]);
        assert!(fx.children(fx.research).is_empty());
        assert!(fx.store.get(folder).unwrap().expanded);
        assert!(fx.store.validate().is_ok());
    }

    #[test]
    fn move_before_and_after_within_same_parent() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        let b = fx.doc(fx.draft, "B");
        let c = fx.doc(fx.draft, "C");

        fx.mutator().move_item(a, c, DropPosition::After).unwrap();
        assert_eq!(fx.children(fx.draft), vec![b, c, a]);

        fx.mutator().move_item(a, b, DropPosition::Before).unwrap();
        assert_eq!(fx.children(fx.draft), vec![a, b, c]);
    }

    #[test]
    fn move_after_is_idempotent() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        let b = fx.doc(fx.draft, "B");
        let c = fx.doc(fx.draft, "C");

        fx.mutator().move_item(a, b, DropPosition::After).unwrap();
        let once = fx.children(fx.draft);
        fx.mutator().move_item(a, b, DropPosition::After).unwrap();
        assert_eq!(fx.children(fx.draft), once);
        assert_eq!(once, vec![b, a, c]);
    }

    #[test]
    fn move_into_descendant_is_rejected() {
        let mut fx = Fixture::new();
        let parent = fx.doc(fx.draft, "Parent");
        let child = fx.doc(parent, "Child");
        let grandchild = fx.doc(child, "Grandchild");

        for (target, position) in [
            (grandchild, DropPosition::Inside),
            (grandchild, DropPosition::Before),
            (child, DropPosition::After),
        ] {
            let err = fx.mutator().move_item(parent, target, position).unwrap_err();
            assert!(matches!(err, BinderError::InvalidParent { .. }));
        }
        assert_eq!(fx.children(fx.draft), vec![parent]);
        assert_eq!(fx.children(child), vec![grandchild]);
        assert!(fx.store.validate().is_ok());
    }

    #[test]
    fn move_onto_self_is_rejected() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        assert!(fx.mutator().move_item(a, a, DropPosition::Inside).is_err());
        assert_eq!(fx.store.parent_of(a), Some(fx.draft));
    }

    #[test]
    fn roots_cannot_be_moved() {
        let mut fx = Fixture::new();
        let (draft, research) = (fx.draft, fx.research);
        let err = fx
            .mutator()
            .move_item(draft, research, DropPosition::Inside)
            .unwrap_err();
        assert_eq!(err, BinderError::IllegalRootOperation(draft));
    }

    #[test]
    fn sibling_drop_next_to_root_is_rejected() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        let research = fx.research;
        let err = fx
            .mutator()
            .move_item(a, research, DropPosition::Before)
            .unwrap_err();
        assert!(matches!(err, BinderError::InvalidParent { .. }));
        assert_eq!(fx.store.parent_of(a), Some(fx.draft));
    }

    #[test]
    fn orphan_can_be_attached() {
        let mut fx = Fixture::new();
        let orphan = fx.store.create(None, ItemKind::Document, "Loose").unwrap();
        let draft = fx.draft;
        let outcome = fx
            .mutator()
            .move_item(orphan, draft, DropPosition::Inside)
            .unwrap();
        assert_eq!(outcome.from, None);
        assert_eq!(fx.store.parent_of(orphan), Some(draft));
    }

    #[test]
    fn split_inserts_sibling_after_original() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        let z = fx.doc(fx.draft, "Z");

        let new_id = fx
            .mutator()
            .split(a, "<p>one two</p>", "<p>three</p>", "Part Two")
            .unwrap();

        assert_eq!(fx.children(fx.draft), vec![a, new_id, z]);
        let original = fx.store.get(a).unwrap();
        assert_eq!(original.content.as_deref(), Some("<p>one two</p>"));
        assert_eq!(original.word_count, 2);
        let created = fx.store.get(new_id).unwrap();
        assert_eq!(created.title, "Part Two");
        assert_eq!(created.word_count, 1);
        assert!(created.children().is_empty());
        assert!(fx.store.validate().is_ok());
    }

    #[test]
    fn split_root_or_orphan_is_rejected() {
        let mut fx = Fixture::new();
        let draft = fx.draft;
        assert_eq!(
            fx.mutator().split(draft, "a", "b", "x").unwrap_err(),
            BinderError::IllegalRootOperation(draft)
        );
        let orphan = fx.store.create(None, ItemKind::Document, "Loose").unwrap();
        assert_eq!(
            fx.mutator().split(orphan, "a", "b", "x").unwrap_err(),
            BinderError::Detached(orphan)
        );
    }

    #[test]
    fn merge_concatenates_and_deletes() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        let b = fx.doc(fx.draft, "B");
        let c = fx.doc(fx.research, "C");
        let sep = fx.config.tree.merge_separator.clone();
        for (id, text) in [(a, "alpha"), (b, "beta gamma"), (c, "delta")] {
            let item = fx.store.get_mut(id).unwrap();
            item.content = Some(text.into());
            item.word_count = word_count(text);
        }

        let outcome = fx.mutator().merge(a, &[a, b, c]).unwrap();
        assert_eq!(outcome.removed, vec![b, c]);

        let merged = fx.store.get(a).unwrap();
        assert_eq!(
            merged.content.as_deref(),
            Some(format!("alpha{sep}beta gamma{sep}delta").as_str())
        );
        assert_eq!(merged.word_count, 4);
        assert!(fx.store.get(b).is_none());
        assert_eq!(fx.children(fx.draft), vec![a]);
        assert!(fx.children(fx.research).is_empty());
        assert!(fx.store.validate().is_ok());
    }

    #[test]
    fn merge_rehomes_source_children() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        let b = fx.doc(fx.draft, "B");
        let b1 = fx.doc(b, "B1");

        let outcome = fx.mutator().merge(a, &[b]).unwrap();
        assert_eq!(outcome.adopted, vec![b1]);
        assert_eq!(fx.children(a), vec![b1]);
        assert_eq!(fx.store.parent_of(b1), Some(a));
        assert!(fx.store.validate().is_ok());
    }

    #[test]
    fn merge_orphan_source() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        let orphan = fx.store.create(None, ItemKind::Document, "Loose").unwrap();
        fx.mutator().merge(a, &[orphan]).unwrap();
        assert!(fx.store.get(orphan).is_none());
    }

    #[test]
    fn merge_rejects_ancestor_unknown_and_root_sources() {
        let mut fx = Fixture::new();
        let parent = fx.doc(fx.draft, "Parent");
        let child = fx.doc(parent, "Child");
        let draft = fx.draft;
        let ghost = ItemId::new();

        assert!(matches!(
            fx.mutator().merge(child, &[parent]).unwrap_err(),
            BinderError::InvalidParent { .. }
        ));
        assert_eq!(
            fx.mutator().merge(child, &[draft]).unwrap_err(),
            BinderError::IllegalRootOperation(draft)
        );
        assert_eq!(
            fx.mutator().merge(parent, &[child, ghost]).unwrap_err(),
            BinderError::NotFound(ghost)
        );
        // Nothing was removed by the failed merges.
        assert!(fx.store.get(child).is_some());
        assert!(fx.store.validate().is_ok());
    }

    #[test]
    fn import_splits_on_separator() {
        let mut fx = Fixture::new();
        let draft = fx.draft;
        let ids = fx
            .mutator()
            .import_and_split(draft, "# Ch1\nHello world\n# Ch2\nBye", "#")
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(fx.children(draft), ids);
        let first = fx.store.get(ids[0]).unwrap();
        assert_eq!(first.title, "Ch1");
        assert_eq!(first.kind, ItemKind::Document);
        assert_eq!(first.word_count, 2);
        assert_eq!(first.content.as_deref(), Some("<p>Hello world</p>"));
        let second = fx.store.get(ids[1]).unwrap();
        assert_eq!(second.title, "Ch2");
        assert_eq!(second.word_count, 1);
    }

    #[test]
    fn import_skips_blank_segments_and_truncates_titles() {
        let mut fx = Fixture::new();
        let draft = fx.draft;
        let long_title = "T".repeat(80);
        let raw = format!("---\n   \n---{}\nbody\n---\n", long_title);
        let ids = fx.mutator().import_and_split(draft, &raw, "---").unwrap();

        assert_eq!(ids.len(), 1);
        let item = fx.store.get(ids[0]).unwrap();
        assert_eq!(item.title, format!("{}...", "T".repeat(50)));
    }

    #[test]
    fn import_title_only_segment_has_no_content() {
        let mut fx = Fixture::new();
        let draft = fx.draft;
        let ids = fx.mutator().import_and_split(draft, "Lonely", "").unwrap();
        let item = fx.store.get(ids[0]).unwrap();
        assert_eq!(item.title, "Lonely");
        assert_eq!(item.content, None);
        assert_eq!(item.word_count, 0);
    }

    #[test]
    fn import_counts_words_around_angle_brackets() {
        let mut fx = Fixture::new();
        let draft = fx.draft;
        let ids = fx
            .mutator()
            .import_and_split(draft, "# Maths\nif x < y and z > w then stop", "#")
            .unwrap();
        let item = fx.store.get(ids[0]).unwrap();
        assert_eq!(
            item.content.as_deref(),
            Some("<p>if x &lt; y and z &gt; w then stop</p>")
        );
        assert_eq!(item.word_count, 10);
        assert_eq!(item.word_count, word_count(item.content.as_deref().unwrap()));
    }

    #[test]
    fn merge_of_empty_documents_leaves_content_unset() {
        let mut fx = Fixture::new();
        let a = fx.doc(fx.draft, "A");
        let b = fx.doc(fx.draft, "B");

        fx.mutator().merge(a, &[b]).unwrap();
        assert_eq!(fx.store.get(a).unwrap().content, None);

        let c = fx.doc(fx.draft, "C");
        fx.store.get_mut(c).unwrap().content = Some("gamma".into());
        fx.mutator().merge(a, &[c]).unwrap();
        let sep = fx.config.tree.merge_separator.clone();
        assert_eq!(
            fx.store.get(a).unwrap().content.as_deref(),
            Some(format!("{sep}gamma").as_str())
        );
    }

    #[test]
    fn import_into_unknown_parent_fails() {
        let mut fx = Fixture::new();
        let ghost = ItemId::new();
        let before = fx.store.len();
        assert_eq!(
            fx.mutator().import_and_split(ghost, "# a", "#").unwrap_err(),
            BinderError::NotFound(ghost)
        );
        assert_eq!(fx.store.len(), before);
    }
}
