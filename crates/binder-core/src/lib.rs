//! binder-core: document tree model and mutation engine
//!
//! Holds every binder item of a manuscript project in an [`ItemStore`],
//! restructures it through [`TreeMutator`] (move, split, merge, import),
//! and derives what the binder shows from [`NavigationState`]. [`Binder`]
//! is the facade the views use.

pub mod binder;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod fields;
pub mod item;
pub mod mode;
pub mod navigation;
pub mod snapshot;
pub mod spatial;
pub mod store;
pub mod text;
pub mod tree;

pub use binder::Binder;
pub use command::{BinderCommand, CommandOutcome, CommandQueue};
pub use config::{BinderConfig, ConfigError, FreeformConfig, TreeConfig};
pub use error::{BinderError, Result, SnapshotError};
pub use event::{BinderEvent, EventBus};
pub use fields::{FieldDef, FieldKind, FieldRegistry};
pub use item::{
    ExternalSync, FieldMutation, Item, ItemId, ItemKind, Label, MetadataValue, SpatialPosition,
    Status,
};
pub use mode::{derive_mode, ViewMode};
pub use navigation::{BinderRow, NavigationState, SelectGesture};
pub use snapshot::{BinderSnapshot, LoadReport, Repair, SNAPSHOT_VERSION};
pub use spatial::freeform_order;
pub use store::{InvariantViolation, ItemStore};
pub use tree::{DropPosition, MergeOutcome, MoveOutcome, TreeMutator};
