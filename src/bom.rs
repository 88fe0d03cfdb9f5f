//! Shared BOM row semantics: photo-row classification, match index, merge
//! rules. Both the TSV and the HTML adapter run the exact same pass through
//! this module; each one only supplies a thin accessor over its own row
//! storage, so the two representations cannot drift apart.

use std::collections::HashMap;

/// Legacy label of the photo column as emitted by the upstream generator.
pub const PHOTO_LABEL_LEGACY: &str = "SPN";
/// Current label the photo column is renamed to in both representations.
pub const PHOTO_LABEL: &str = "Product Photo";

/// Logical accessor over one BOM row, independent of the storage format.
///
/// `description`, `designator` and `part_number` return trimmed plain text
/// (the HTML adapter strips markup); `photo` returns the trimmed raw cell
/// value, which in the HTML representation may itself be markup such as an
/// `<img>` tag. Setters write into the underlying representation; a setter
/// on a row that lacks the corresponding column is a no-op.
pub trait BomRecord {
    fn description(&self) -> String;
    fn designator(&self) -> String;
    fn part_number(&self) -> String;
    fn photo(&self) -> String;
    fn set_designator(&mut self, value: &str);
    fn set_photo(&mut self, value: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Data,
    Photo,
}

/// A row is a photo helper iff it carries a photo value AND its description
/// says so. A row with photo data but an ordinary description is a data row;
/// it already legitimately owns that photo and must never be merged away.
pub fn classify<R: BomRecord>(row: &R) -> RowKind {
    if !row.photo().is_empty() && row.description().to_lowercase().contains("photo") {
        RowKind::Photo
    } else {
        RowKind::Data
    }
}

/// Lookup structures over the data rows of one table, built once per merge
/// pass. Only the first row with a given designator or part number is
/// registered, so ties break deterministically toward the lowest index.
#[derive(Debug, Default)]
pub struct MatchIndex {
    by_designator: HashMap<String, usize>,
    by_part_number: HashMap<String, usize>,
}

impl MatchIndex {
    pub fn build<R: BomRecord>(rows: &[R]) -> MatchIndex {
        let mut index = MatchIndex::default();
        for (idx, row) in rows.iter().enumerate() {
            if classify(row) == RowKind::Photo {
                continue;
            }
            let designator = row.designator();
            if !designator.is_empty() {
                index.by_designator.entry(designator).or_insert(idx);
            }
            let part_number = row.part_number();
            if !part_number.is_empty() {
                index.by_part_number.entry(part_number).or_insert(idx);
            }
        }
        index
    }

    /// Designator match first; part number is the fallback for components
    /// whose designator display was suppressed upstream.
    pub fn lookup<R: BomRecord>(&self, photo_row: &R) -> Option<usize> {
        let designator = photo_row.designator();
        if !designator.is_empty() {
            if let Some(&idx) = self.by_designator.get(&designator) {
                return Some(idx);
            }
        }
        let part_number = photo_row.part_number();
        if !part_number.is_empty() {
            return self.by_part_number.get(&part_number).copied();
        }
        None
    }
}

/// Applies the two merge rules. Each rule fires independently; the helper
/// row may only be removed when at least one of them did.
///
/// A rule counts as fired only when the write is observable afterwards. A
/// format-level miss (the target row lacks that cell) must not cost the
/// helper row its contents.
pub fn merge_into<R: BomRecord>(photo_row: &R, target: &mut R) -> bool {
    let mut merged = false;
    let designator = photo_row.designator();
    if !designator.is_empty() && target.designator().is_empty() {
        target.set_designator(&designator);
        merged |= !target.designator().is_empty();
    }
    let photo = photo_row.photo();
    if !photo.is_empty() && target.photo().is_empty() {
        target.set_photo(&photo);
        merged |= !target.photo().is_empty();
    }
    merged
}

/// Runs one merge pass over `rows` and returns the indexes of the photo rows
/// that were merged into a data row. Removal is the caller's job: rows are
/// only flagged here and filtered out at serialization time, so row order is
/// never disturbed.
pub fn merge_pass<R: BomRecord>(rows: &mut [R]) -> Vec<usize> {
    let index = MatchIndex::build(rows);
    let mut removed = Vec::new();
    for i in 0..rows.len() {
        if classify(&rows[i]) != RowKind::Photo {
            continue;
        }
        let Some(target_idx) = index.lookup(&rows[i]) else {
            continue;
        };
        if target_idx == i {
            continue;
        }
        let (photo_row, target) = if i < target_idx {
            let (head, tail) = rows.split_at_mut(target_idx);
            (&head[i], &mut tail[0])
        } else {
            let (head, tail) = rows.split_at_mut(i);
            (&tail[0], &mut head[target_idx])
        };
        if merge_into(photo_row, target) {
            removed.push(i);
        }
    }
    removed
}
