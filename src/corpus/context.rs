// src/corpus/context.rs

use std::cmp::Ordering;
use log::trace;

use crate::types::{Context, OriginalUtterance, Utterance};

/// Fills `context.prev` / `context.next` from the neighbouring records of an
/// already sorted slice. Neighbours for which `same_group` is false leave the
/// field empty.
pub fn annotate_sorted<T, F>(items: &mut [T], same_group: F)
where
    T: Utterance,
    F: Fn(&T, &T) -> bool,
{
    let contexts: Vec<Context> = (0..items.len())
        .map(|i| {
            let prev = if i > 0 && same_group(&items[i - 1], &items[i]) {
                items[i - 1].text().to_string()
            } else {
                String::new()
            };
            let next = if i + 1 < items.len() && same_group(&items[i], &items[i + 1]) {
                items[i + 1].text().to_string()
            } else {
                String::new()
            };
            Context { prev, next }
        })
        .collect();

    for (item, context) in items.iter_mut().zip(contexts) {
        *item.context_mut() = context;
    }
    trace!("Annotated context for {} records", items.len());
}

/// Sorts with `compare`, then annotates. The context is a derived view and
/// has to be recomputed whenever the sequence is resorted.
pub fn sort_and_annotate<T, C, F>(items: &mut Vec<T>, compare: C, same_group: F)
where
    T: Utterance,
    C: FnMut(&T, &T) -> Ordering,
    F: Fn(&T, &T) -> bool,
{
    items.sort_by(compare);
    annotate_sorted(items, same_group);
}

/// Every record is adjacent to its sorted neighbours.
pub fn ungrouped<T>(_: &T, _: &T) -> bool {
    true
}

/// Legacy voice lines are only adjacent inside the same scene. Lines without
/// a parsed scene are adjacent to nothing.
pub fn same_scene(a: &OriginalUtterance, b: &OriginalUtterance) -> bool {
    match (&a.scene, &b.scene) {
        (Some(x), Some(y)) => x.scene_id == y.scene_id,
        _ => false,
    }
}
