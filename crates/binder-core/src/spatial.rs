//! Freeform order commit
//!
//! Corkboard and mind-map cards can be dragged anywhere; their coordinates
//! only become sibling order when the layout is committed. Cards are read
//! in rows, top to bottom, and each row left to right. A row starts at its
//! topmost card and takes in every card within `row_tolerance_px` below it,
//! so slightly misaligned cards do not jitter between rows.

use tracing::debug;

use crate::config::FreeformConfig;
use crate::error::Result;
use crate::item::{ItemId, SpatialPosition};
use crate::store::ItemStore;

/// Canonical reading order for a set of positioned cards.
///
/// Stable: cards at identical coordinates keep their input order.
pub fn freeform_order(cards: &[(ItemId, SpatialPosition)], row_tolerance_px: f64) -> Vec<ItemId> {
    let mut by_y: Vec<&(ItemId, SpatialPosition)> = cards.iter().collect();
    by_y.sort_by(|a, b| a.1.y.total_cmp(&b.1.y));

    let mut ordered = Vec::with_capacity(cards.len());
    let mut row: Vec<&(ItemId, SpatialPosition)> = Vec::new();
    let mut row_top = f64::NEG_INFINITY;

    for card in by_y {
        if !row.is_empty() && card.1.y - row_top > row_tolerance_px {
            flush_row(&mut row, &mut ordered);
        }
        if row.is_empty() {
            row_top = card.1.y;
        }
        row.push(card);
    }
    flush_row(&mut row, &mut ordered);
    ordered
}

fn flush_row(row: &mut Vec<&(ItemId, SpatialPosition)>, ordered: &mut Vec<ItemId>) {
    row.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));
    ordered.extend(row.drain(..).map(|(id, _)| *id));
}

/// Rewrite `parent`'s children in freeform reading order.
///
/// Children without a position are read as sitting at the origin. Returns
/// whether the order changed.
pub fn commit_freeform_order(
    store: &mut ItemStore,
    parent: ItemId,
    config: &FreeformConfig,
) -> Result<bool> {
    let children = store.children_of(parent)?;
    let cards: Vec<(ItemId, SpatialPosition)> = children
        .iter()
        .map(|&id| {
            let pos = store
                .get(id)
                .and_then(|item| item.spatial_position)
                .unwrap_or_default();
            (id, pos)
        })
        .collect();

    let order = freeform_order(&cards, config.row_tolerance_px);
    let changed = order.as_slice() != children;
    if changed {
        store.reorder_children(parent, order);
        debug!(parent = %parent, "committed freeform order");
    }
    Ok(changed)
}
