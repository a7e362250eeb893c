//! The two-level collection and its bounds-checked edits.

use serde::{Deserialize, Serialize};

use crate::error::{CollectionError, CollectionResult};
use crate::location::Location;
use crate::section::Section;

/// An ordered list of sections.
///
/// Section order and item order are significant: together they define the
/// [`Location`] of every item. Every edit validates its arguments first and
/// returns an error without modifying anything when they are out of range.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<M, T> {
    sections: Vec<Section<M, T>>,
}

impl<M, T> Collection<M, T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    pub fn from_sections(sections: impl IntoIterator<Item = Section<M, T>>) -> Self {
        Self {
            sections: sections.into_iter().collect(),
        }
    }

    pub fn sections(&self) -> &[Section<M, T>] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total number of items across all sections.
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }

    /// Item count of every section, in order.
    pub fn shape(&self) -> Vec<usize> {
        self.sections.iter().map(Section::len).collect()
    }

    /// Every item location, in reading order.
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(s, section)| (0..section.len()).map(move |i| Location::new(s, i)))
    }

    pub fn section(&self, index: usize) -> CollectionResult<&Section<M, T>> {
        self.check_section(index)?;
        Ok(&self.sections[index])
    }

    pub fn item(&self, location: Location) -> CollectionResult<&T> {
        self.check_location(location)?;
        Ok(&self.sections[location.section].items[location.item])
    }

    /// Fails unless `index` names an existing section.
    pub fn check_section(&self, index: usize) -> CollectionResult<()> {
        if index < self.sections.len() {
            Ok(())
        } else {
            Err(CollectionError::SectionOutOfBounds {
                index,
                count: self.sections.len(),
            })
        }
    }

    /// Fails unless `location` names an existing item.
    pub fn check_location(&self, location: Location) -> CollectionResult<()> {
        self.check_item_index(location, 0)
    }

    /// Fails unless `location` is a valid insertion point (one past the last
    /// item is allowed).
    pub fn check_insert_location(&self, location: Location) -> CollectionResult<()> {
        self.check_item_index(location, 1)
    }

    fn check_item_index(&self, location: Location, slack: usize) -> CollectionResult<()> {
        self.check_section(location.section)?;
        let count = self.sections[location.section].len();
        if location.item < count + slack {
            Ok(())
        } else {
            Err(CollectionError::ItemOutOfBounds { location, count })
        }
    }

    // ---- item edits ----

    /// Insert `items` consecutively starting at `at`. Returns the locations
    /// the items now occupy.
    pub fn insert_items(&mut self, at: Location, items: Vec<T>) -> CollectionResult<Vec<Location>> {
        self.check_insert_location(at)?;
        let locations = (0..items.len())
            .map(|offset| Location::new(at.section, at.item + offset))
            .collect();
        let section = &mut self.sections[at.section].items;
        section.splice(at.item..at.item, items);
        Ok(locations)
    }

    /// Append `items` to the end of section `index`.
    pub fn append_items(&mut self, index: usize, items: Vec<T>) -> CollectionResult<Vec<Location>> {
        self.check_section(index)?;
        let at = Location::new(index, self.sections[index].len());
        self.insert_items(at, items)
    }

    pub fn remove_item(&mut self, at: Location) -> CollectionResult<T> {
        self.check_location(at)?;
        Ok(self.sections[at.section].items.remove(at.item))
    }

    /// Remove the items at `locations`, all addressed against the collection
    /// before any removal. Returns the sorted locations with the removed
    /// items in the same order.
    pub fn remove_items(&mut self, locations: &[Location]) -> CollectionResult<(Vec<Location>, Vec<T>)> {
        let mut sorted = locations.to_vec();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(CollectionError::DuplicateLocation(pair[0]));
            }
        }
        for &loc in &sorted {
            self.check_location(loc)?;
        }

        let mut removed: Vec<T> = sorted
            .iter()
            .rev()
            .map(|loc| self.sections[loc.section].items.remove(loc.item))
            .collect();
        removed.reverse();
        Ok((sorted, removed))
    }

    /// Empty every section, keeping the sections themselves. Returns the
    /// locations that were occupied.
    pub fn clear_items(&mut self) -> Vec<Location> {
        let locations = self.locations().collect();
        for section in &mut self.sections {
            section.items.clear();
        }
        locations
    }

    /// Remove the item at `from` and reinsert it so that it ends up at `to`.
    /// `to` addresses the collection after the removal; sections may differ.
    pub fn move_item(&mut self, from: Location, to: Location) -> CollectionResult<()> {
        self.check_location(from)?;
        self.check_section(to.section)?;
        let mut count = self.sections[to.section].len();
        if from.section == to.section {
            count -= 1;
        }
        if to.item > count {
            return Err(CollectionError::ItemOutOfBounds {
                location: to,
                count,
            });
        }

        let item = self.sections[from.section].items.remove(from.item);
        self.sections[to.section].items.insert(to.item, item);
        Ok(())
    }

    /// Swap in a new value at `at`, returning the previous one.
    pub fn replace_item(&mut self, at: Location, item: T) -> CollectionResult<T> {
        self.check_location(at)?;
        Ok(std::mem::replace(
            &mut self.sections[at.section].items[at.item],
            item,
        ))
    }

    /// Swap in a new item list for section `index`, returning the old one.
    pub fn replace_items(&mut self, index: usize, items: Vec<T>) -> CollectionResult<Vec<T>> {
        self.check_section(index)?;
        Ok(std::mem::replace(&mut self.sections[index].items, items))
    }

    // ---- section edits ----

    /// Insert `sections` consecutively starting at index `at`.
    pub fn insert_sections(
        &mut self,
        at: usize,
        sections: Vec<Section<M, T>>,
    ) -> CollectionResult<Vec<usize>> {
        if at > self.sections.len() {
            return Err(CollectionError::SectionOutOfBounds {
                index: at,
                count: self.sections.len(),
            });
        }
        let indices = (at..at + sections.len()).collect();
        self.sections.splice(at..at, sections);
        Ok(indices)
    }

    pub fn push_section(&mut self, section: Section<M, T>) -> usize {
        self.sections.push(section);
        self.sections.len() - 1
    }

    pub fn remove_section(&mut self, index: usize) -> CollectionResult<Section<M, T>> {
        self.check_section(index)?;
        Ok(self.sections.remove(index))
    }

    /// Remove every section. Returns the indices that were occupied.
    pub fn clear(&mut self) -> Vec<usize> {
        let indices = (0..self.sections.len()).collect();
        self.sections.clear();
        indices
    }

    /// Move section `from` so that it ends up at index `to`.
    pub fn move_section(&mut self, from: usize, to: usize) -> CollectionResult<()> {
        self.check_section(from)?;
        self.check_section(to)?;
        let section = self.sections.remove(from);
        self.sections.insert(to, section);
        Ok(())
    }

    pub fn replace_section(
        &mut self,
        index: usize,
        section: Section<M, T>,
    ) -> CollectionResult<Section<M, T>> {
        self.check_section(index)?;
        Ok(std::mem::replace(&mut self.sections[index], section))
    }

    pub fn set_metadata(&mut self, index: usize, metadata: M) -> CollectionResult<M> {
        self.check_section(index)?;
        Ok(std::mem::replace(&mut self.sections[index].metadata, metadata))
    }
}

impl<M, T> FromIterator<Section<M, T>> for Collection<M, T> {
    fn from_iter<I: IntoIterator<Item = Section<M, T>>>(iter: I) -> Self {
        Self::from_sections(iter)
    }
}
