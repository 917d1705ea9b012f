//! Evaluating one filter over a batch of items.

use crate::fields::FieldError;
use crate::filter::Filter;
use crate::item::ItemAccessor;
use thiserror::Error;
use tracing::warn;

/// An item that could not be evaluated.
#[derive(Debug, Error)]
#[error("Item #{index}: {source}")]
pub struct ItemFailure {
    pub index: usize,
    #[source]
    pub source: FieldError,
}

/// Outcome of a lenient selection.
#[derive(Debug, Default)]
pub struct Selection {
    /// Indices of matching items, in input order.
    pub matched: Vec<usize>,
    /// Items skipped because a field could not be read.
    pub errors: Vec<ItemFailure>,
}

impl Selection {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Match every item, skipping (and recording) the ones whose fields fail.
pub fn select<I: ItemAccessor>(filter: &Filter, items: &[I]) -> Selection {
    let mut selection = Selection::default();
    for (index, item) in items.iter().enumerate() {
        match filter.matches(item) {
            Ok(true) => selection.matched.push(index),
            Ok(false) => {}
            Err(source) => {
                warn!(index, error = %source, "skipping item");
                selection.errors.push(ItemFailure { index, source });
            }
        }
    }
    selection
}

/// Match every item, stopping at the first field error.
pub fn select_strict<I: ItemAccessor>(
    filter: &Filter,
    items: &[I],
) -> Result<Vec<usize>, ItemFailure> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match filter.matches(item) {
            Ok(matched) => matched.then_some(Ok(index)),
            Err(source) => Some(Err(ItemFailure { index, source })),
        })
        .collect()
}

/// Select with either policy; lenient errors are returned alongside the matches.
pub fn select_with<I: ItemAccessor>(
    filter: &Filter,
    items: &[I],
    strict: bool,
) -> Result<Selection, ItemFailure> {
    if strict {
        Ok(Selection {
            matched: select_strict(filter, items)?,
            errors: Vec::new(),
        })
    } else {
        Ok(select(filter, items))
    }
}
