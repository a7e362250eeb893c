//! Replaying change notifications onto a local copy of a collection.
//!
//! A consumer keeps its own structure in step with a collection by
//! replaying the changes it is sent. Content for inserted or updated
//! positions is read from the snapshot that accompanies the change.

use std::collections::BTreeMap;

use sectioned_types::{Change, ChangeKind, Collection, Location, Section};

use crate::edit_script::reassemble;
use crate::error::{DiffError, DiffResult};

/// Apply one change with sequential semantics: every index is valid against
/// `local` as left by the previous change.
///
/// Batch markers are accepted and ignored.
pub fn apply_change<M: Clone, T: Clone>(
    local: &mut Collection<M, T>,
    change: &Change,
    source: &Collection<M, T>,
) -> DiffResult<()> {
    match change {
        Change::Reset => *local = source.clone(),
        Change::InsertItems(locations) => {
            let mut sorted = locations.clone();
            sorted.sort_unstable();
            for loc in sorted {
                let item = source.item(loc)?.clone();
                local.insert_items(loc, vec![item])?;
            }
        }
        Change::DeleteItems(locations) => {
            local.remove_items(locations)?;
        }
        Change::UpdateItems(locations) => {
            for &loc in locations {
                local.replace_item(loc, source.item(loc)?.clone())?;
            }
        }
        Change::MoveItem { from, to } => local.move_item(*from, *to)?,
        Change::InsertSections(indices) => {
            let mut sorted = indices.clone();
            sorted.sort_unstable();
            for index in sorted {
                let section = source.section(index)?.clone();
                local.insert_sections(index, vec![section])?;
            }
        }
        Change::DeleteSections(indices) => {
            let mut sorted = indices.clone();
            sorted.sort_unstable();
            for pair in sorted.windows(2) {
                if pair[0] == pair[1] {
                    return Err(DiffError::DuplicateIndex(pair[0]));
                }
            }
            for &index in &sorted {
                local.check_section(index)?;
            }
            for index in sorted.into_iter().rev() {
                local.remove_section(index)?;
            }
        }
        Change::UpdateSections(indices) => {
            for &index in indices {
                local.replace_section(index, source.section(index)?.clone())?;
            }
        }
        Change::MoveSection { from, to } => local.move_section(*from, *to)?,
        Change::BeginBatch | Change::EndBatch => {}
    }
    Ok(())
}

/// Where a section of the rebuilt collection comes from.
#[derive(Clone, Copy, Debug)]
enum SectionSource {
    Old(usize),
    Inserted(usize),
}

/// Apply one diff batch with grouped semantics and return the new
/// collection.
///
/// `changes` may include its `BeginBatch` / `EndBatch` pair. Deletes address
/// `local`, inserts address the result, section moves go from old to new
/// index, and item moves are addressed at the section's new index.
pub fn apply_batch<M: Clone, T: Clone>(
    local: &Collection<M, T>,
    changes: &[Change],
    source: &Collection<M, T>,
) -> DiffResult<Collection<M, T>> {
    let body = strip_markers(changes)?;

    let mut section_deletes = Vec::new();
    let mut section_inserts = Vec::new();
    let mut section_moves = Vec::new();
    let mut section_updates = Vec::new();
    let mut item_deletes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut item_inserts: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut item_moves: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
    let mut item_updates = Vec::new();

    for change in body {
        match change {
            Change::Reset => return Ok(source.clone()),
            Change::DeleteSections(indices) => section_deletes.extend(indices),
            Change::InsertSections(indices) => section_inserts.extend(indices),
            Change::UpdateSections(indices) => section_updates.extend(indices),
            Change::MoveSection { from, to } => section_moves.push((*from, *to)),
            Change::DeleteItems(locations) => {
                for loc in locations {
                    item_deletes.entry(loc.section).or_default().push(loc.item);
                }
            }
            Change::InsertItems(locations) => {
                for loc in locations {
                    item_inserts.entry(loc.section).or_default().push(loc.item);
                }
            }
            Change::UpdateItems(locations) => item_updates.extend(locations),
            Change::MoveItem { from, to } => {
                if from.section != to.section {
                    return Err(DiffError::UnexpectedChange(ChangeKind::MoveItem));
                }
                item_moves
                    .entry(to.section)
                    .or_default()
                    .push((from.item, to.item));
            }
            Change::BeginBatch | Change::EndBatch => return Err(DiffError::UnbalancedBatch),
        }
    }

    let old_sources = (0..local.section_count()).map(SectionSource::Old).collect();
    let inserted_sources = section_inserts
        .iter()
        .map(|&i| (i, SectionSource::Inserted(i)))
        .collect();
    let layout = reassemble(old_sources, &section_deletes, inserted_sources, &section_moves)?;

    let mut sections = Vec::with_capacity(layout.len());
    for (new_index, origin) in layout.into_iter().enumerate() {
        let section = match origin {
            SectionSource::Inserted(index) => source.section(index)?.clone(),
            SectionSource::Old(old_index) => {
                let old = local.section(old_index)?;
                let deleted = item_deletes.remove(&old_index).unwrap_or_default();
                let moved = item_moves.remove(&new_index).unwrap_or_default();
                let mut inserted = Vec::new();
                for item in item_inserts.remove(&new_index).unwrap_or_default() {
                    let element = source.item(Location::new(new_index, item))?.clone();
                    inserted.push((item, element));
                }
                Section {
                    metadata: old.metadata.clone(),
                    items: reassemble(old.items.clone(), &deleted, inserted, &moved)?,
                }
            }
        };
        sections.push(section);
    }

    // Anything left refers to a deleted, inserted, or nonexistent section.
    if let Some(&index) = item_deletes
        .keys()
        .chain(item_inserts.keys())
        .chain(item_moves.keys())
        .next()
    {
        return Err(DiffError::UnknownSection(index));
    }

    let mut result = Collection::from_sections(sections);
    for index in section_updates {
        result.replace_section(index, source.section(index)?.clone())?;
    }
    for loc in item_updates {
        result.replace_item(loc, source.item(loc)?.clone())?;
    }
    Ok(result)
}

/// Drop a single enclosing `BeginBatch` / `EndBatch` pair, rejecting any
/// other placement of markers.
fn strip_markers(changes: &[Change]) -> DiffResult<&[Change]> {
    let body = match changes {
        [Change::BeginBatch, body @ .., Change::EndBatch] => body,
        [Change::BeginBatch, ..] | [.., Change::EndBatch] => return Err(DiffError::UnbalancedBatch),
        body => body,
    };
    if body.iter().any(Change::is_batch_marker) {
        return Err(DiffError::UnbalancedBatch);
    }
    Ok(body)
}
