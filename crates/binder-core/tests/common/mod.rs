//! Shared setup for binder integration tests

use binder_core::{Binder, ItemId, ItemKind};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness. Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A small manuscript:
///
/// ```text
/// Draft
///   Chapter 1 (folder)
///     Opening
///     The Incident
///   Chapter 2 (folder)
///     Aftermath
/// Research
/// Trash
/// ```
#[allow(dead_code)]
pub struct Manuscript {
    pub binder: Binder,
    pub draft: ItemId,
    pub research: ItemId,
    pub chapter1: ItemId,
    pub chapter2: ItemId,
    pub opening: ItemId,
    pub incident: ItemId,
    pub aftermath: ItemId,
}

impl Manuscript {
    pub fn new() -> Self {
        init_tracing();
        let mut binder = Binder::default();
        let draft = binder.root_ids()[0];
        let research = binder.root_ids()[1];

        let chapter1 = binder
            .create(Some(draft), ItemKind::Folder, "Chapter 1")
            .unwrap();
        let opening = binder
            .create(Some(chapter1), ItemKind::Document, "Opening")
            .unwrap();
        let incident = binder
            .create(Some(chapter1), ItemKind::Document, "The Incident")
            .unwrap();
        let chapter2 = binder
            .create(Some(draft), ItemKind::Folder, "Chapter 2")
            .unwrap();
        let aftermath = binder
            .create(Some(chapter2), ItemKind::Document, "Aftermath")
            .unwrap();

        Self {
            binder,
            draft,
            research,
            chapter1,
            chapter2,
            opening,
            incident,
            aftermath,
        }
    }

    #[allow(dead_code)]
    pub fn children(&self, id: ItemId) -> Vec<ItemId> {
        self.binder.children_of(id).unwrap().to_vec()
    }

    #[allow(dead_code)]
    pub fn titles(&self, id: ItemId) -> Vec<String> {
        self.children(id)
            .into_iter()
            .map(|child| self.binder.get(child).unwrap().title.clone())
            .collect()
    }
}
