//! Queued binder writes
//!
//! Views that cannot hold `&mut Binder` (drag handlers, background imports)
//! enqueue a [`BinderCommand`] instead. [`CommandQueue::drain`] applies them
//! one at a time in the order they were queued; a failing command does not
//! stop the ones behind it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::binder::Binder;
use crate::error::Result;
use crate::fields::FieldDef;
use crate::item::{FieldMutation, ItemId, ItemKind, SpatialPosition};
use crate::mode::ViewMode;
use crate::navigation::SelectGesture;
use crate::tree::{DropPosition, MergeOutcome, MoveOutcome};

/// A write operation on the binder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BinderCommand {
    Create {
        parent: Option<ItemId>,
        kind: ItemKind,
        title: String,
    },
    Update {
        id: ItemId,
        mutations: Vec<FieldMutation>,
    },
    Move {
        dragged: ItemId,
        target: ItemId,
        position: DropPosition,
    },
    Split {
        id: ItemId,
        content_before: String,
        content_after: String,
        new_title: String,
    },
    Merge {
        target: ItemId,
        sources: Vec<ItemId>,
    },
    ImportAndSplit {
        parent: ItemId,
        raw_text: String,
        separator: String,
    },
    Delete { id: ItemId },
    Select {
        id: ItemId,
        gesture: SelectGesture,
        auto_switch: bool,
    },
    SetViewRoot { id: Option<ItemId> },
    SetHoist { id: Option<ItemId> },
    ToggleBookmark { id: ItemId },
    SetSpatialPosition {
        id: ItemId,
        position: Option<SpatialPosition>,
    },
    CommitFreeformOrder { parent: ItemId },
    SetSearchTerm { term: String },
    SetExpanded { id: ItemId, expanded: bool },
    SetViewMode { mode: ViewMode },
    RegisterField { field: FieldDef },
}

/// What a successfully applied command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Created(ItemId),
    Moved(MoveOutcome),
    Split(ItemId),
    Merged(MergeOutcome),
    Imported(Vec<ItemId>),
    Selected(ViewMode),
    Bookmarked(bool),
    /// Whether the freeform commit changed the order
    Reordered(bool),
    Done,
}

impl BinderCommand {
    /// Apply the command to the binder
    pub fn execute(self, binder: &mut Binder) -> Result<CommandOutcome> {
        match self {
            BinderCommand::Create {
                parent,
                kind,
                title,
            } => binder.create(parent, kind, title).map(CommandOutcome::Created),

            BinderCommand::Update { id, mutations } => {
                binder.update(id, mutations)?;
                Ok(CommandOutcome::Done)
            }

            BinderCommand::Move {
                dragged,
                target,
                position,
            } => binder
                .move_item(dragged, target, position)
                .map(CommandOutcome::Moved),

            BinderCommand::Split {
                id,
                content_before,
                content_after,
                new_title,
            } => binder
                .split(id, &content_before, &content_after, &new_title)
                .map(CommandOutcome::Split),

            BinderCommand::Merge { target, sources } => {
                binder.merge(target, &sources).map(CommandOutcome::Merged)
            }

            BinderCommand::ImportAndSplit {
                parent,
                raw_text,
                separator,
            } => binder
                .import_and_split(parent, &raw_text, &separator)
                .map(CommandOutcome::Imported),

            BinderCommand::Delete { id } => binder.delete(id).map(CommandOutcome::Moved),

            BinderCommand::Select {
                id,
                gesture,
                auto_switch,
            } => binder
                .select(id, gesture, auto_switch)
                .map(CommandOutcome::Selected),

            BinderCommand::SetViewRoot { id } => {
                binder.set_view_root(id)?;
                Ok(CommandOutcome::Done)
            }

            BinderCommand::SetHoist { id } => {
                binder.set_hoist(id)?;
                Ok(CommandOutcome::Done)
            }

            BinderCommand::ToggleBookmark { id } => {
                binder.toggle_bookmark(id).map(CommandOutcome::Bookmarked)
            }

            BinderCommand::SetSpatialPosition { id, position } => {
                binder.set_spatial_position(id, position)?;
                Ok(CommandOutcome::Done)
            }

            BinderCommand::CommitFreeformOrder { parent } => binder
                .commit_freeform_order(parent)
                .map(CommandOutcome::Reordered),

            BinderCommand::SetSearchTerm { term } => {
                binder.set_search_term(term);
                Ok(CommandOutcome::Done)
            }

            BinderCommand::SetExpanded { id, expanded } => {
                binder.set_expanded(id, expanded)?;
                Ok(CommandOutcome::Done)
            }

            BinderCommand::SetViewMode { mode } => {
                binder.set_view_mode(mode);
                Ok(CommandOutcome::Done)
            }

            BinderCommand::RegisterField { field } => {
                binder.register_field(field)?;
                Ok(CommandOutcome::Done)
            }
        }
    }
}

/// FIFO buffer of pending commands.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<BinderCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, command: BinderCommand) {
        self.pending.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply every queued command in order, one result per command.
    pub fn drain(&mut self, binder: &mut Binder) -> Vec<Result<CommandOutcome>> {
        let mut results = Vec::with_capacity(self.pending.len());
        while let Some(command) = self.pending.pop_front() {
            results.push(command.execute(binder));
        }
        results
    }
}
