//! TSV adapter for the generated bill of materials.
//!
//! The upstream generator emits a tab-delimited table whose first line is
//! the header. Photo helper rows are merged back into the data rows they
//! describe, and the legacy photo column label is renamed. Files are only
//! rewritten when something actually changed.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::bom::{self, BomRecord, PHOTO_LABEL, PHOTO_LABEL_LEGACY};
use crate::error::WirePostError;

const DESCRIPTION_HEADER: &str = "Description";
const DESIGNATORS_HEADER: &str = "Designators";
const PART_NUMBER_HEADER: &str = "MPN";

/// Column positions resolved once from the header line. The photo column is
/// mandatory (its absence means this is not a BOM we understand); the others
/// degrade to empty values when missing.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    description: Option<usize>,
    designators: Option<usize>,
    part_number: Option<usize>,
    photo: usize,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Option<ColumnMap> {
        let position = |name: &str| headers.iter().position(|h| h == name);
        let photo = position(PHOTO_LABEL_LEGACY).or_else(|| position(PHOTO_LABEL))?;
        Some(ColumnMap {
            description: position(DESCRIPTION_HEADER),
            designators: position(DESIGNATORS_HEADER),
            part_number: position(PART_NUMBER_HEADER),
            photo,
        })
    }
}

#[derive(Debug)]
struct TsvRow {
    fields: Vec<String>,
    columns: ColumnMap,
}

impl TsvRow {
    fn get(&self, column: Option<usize>) -> String {
        column
            .and_then(|idx| self.fields.get(idx))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    }

    fn set(&mut self, column: Option<usize>, value: &str) {
        if let Some(idx) = column {
            if idx < self.fields.len() {
                self.fields[idx] = value.to_string();
            }
        }
    }
}

impl BomRecord for TsvRow {
    fn description(&self) -> String {
        self.get(self.columns.description)
    }
    fn designator(&self) -> String {
        self.get(self.columns.designators)
    }
    fn part_number(&self) -> String {
        self.get(self.columns.part_number)
    }
    fn photo(&self) -> String {
        self.get(Some(self.columns.photo))
    }
    fn set_designator(&mut self, value: &str) {
        self.set(self.columns.designators, value);
    }
    fn set_photo(&mut self, value: &str) {
        self.set(Some(self.columns.photo), value);
    }
}

/// Merges photo helper rows into their matching data rows and rewrites the
/// file without the merged helpers. Returns `Ok(false)` when the file is
/// missing, is not a recognizable BOM, or nothing changed.
pub fn merge_photo_rows(path: &Path) -> Result<bool, WirePostError> {
    if !path.exists() {
        return Ok(false);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let Some(columns) = ColumnMap::resolve(&headers) else {
        return Ok(false);
    };

    let mut rows: Vec<TsvRow> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        fields.resize(headers.len(), String::new());
        rows.push(TsvRow { fields, columns });
    }
    if rows.is_empty() {
        return Ok(false);
    }

    let removed = bom::merge_pass(&mut rows);
    if removed.is_empty() {
        return Ok(false);
    }
    let removed: HashSet<usize> = removed.into_iter().collect();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;
    writer.write_record(&headers)?;
    for (idx, row) in rows.iter().enumerate() {
        if removed.contains(&idx) {
            continue;
        }
        writer.write_record(&row.fields)?;
    }
    writer.flush()?;

    tracing::debug!(
        merged = removed.len(),
        path = %path.display(),
        "merged photo rows in bom tsv"
    );
    Ok(true)
}

/// Renames the legacy photo column label in the header line. Exact match
/// only, first line only; rewrites the file iff the label was present.
pub fn rename_header(path: &Path) -> Result<bool, WirePostError> {
    if !path.exists() {
        return Ok(false);
    }
    let text = fs::read_to_string(path)?;
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let Some(header) = lines.first() else {
        return Ok(false);
    };

    let mut changed = false;
    let renamed: Vec<&str> = header
        .split('\t')
        .map(|column| {
            if column == PHOTO_LABEL_LEGACY {
                changed = true;
                PHOTO_LABEL
            } else {
                column
            }
        })
        .collect();
    if !changed {
        return Ok(false);
    }

    lines[0] = renamed.join("\t");
    fs::write(path, lines.join("\n") + "\n")?;
    tracing::debug!(path = %path.display(), "renamed legacy photo header in bom tsv");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tsv(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("report.bom.tsv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn merges_photo_row_and_renames_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            &dir,
            "Designators\tDescription\tSPN\tMPN\nU1\tResistor\t\tR100\n\tResistor Photo\tpic.jpg\tR100\n",
        );

        assert!(merge_photo_rows(&path).unwrap());
        let merged = fs::read_to_string(&path).unwrap();
        assert_eq!(
            merged,
            "Designators\tDescription\tSPN\tMPN\nU1\tResistor\tpic.jpg\tR100\n"
        );

        assert!(rename_header(&path).unwrap());
        let renamed = fs::read_to_string(&path).unwrap();
        assert!(renamed.starts_with("Designators\tDescription\tProduct Photo\tMPN\n"));
    }

    #[test]
    fn merge_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            &dir,
            "Designators\tDescription\tSPN\tMPN\nU1\tResistor\t\tR100\n\tResistor Photo\tpic.jpg\tR100\n",
        );
        assert!(merge_photo_rows(&path).unwrap());
        let after_first = fs::read_to_string(&path).unwrap();

        assert!(!merge_photo_rows(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
    }

    #[test]
    fn unmatched_photo_row_survives_verbatim() {
        // No data row shares MPN X9 or a designator with the helper.
        let dir = tempfile::tempdir().unwrap();
        let content =
            "Designators\tDescription\tSPN\tMPN\nU1\tResistor\t\tR100\n\tWidget Photo\tw.jpg\tX9\n";
        let path = write_tsv(&dir, content);

        assert!(!merge_photo_rows(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn surviving_rows_keep_their_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            &dir,
            "Designators\tDescription\tSPN\tMPN\n\
             U3\tCable\t\tC3\n\
             U1\tResistor\t\tR100\n\
             \tResistor Photo\tpic.jpg\tR100\n\
             U2\tConnector\t\tC2\n",
        );
        assert!(merge_photo_rows(&path).unwrap());
        let merged = fs::read_to_string(&path).unwrap();
        let designators: Vec<&str> = merged
            .lines()
            .skip(1)
            .map(|line| line.split('\t').next().unwrap())
            .collect();
        assert_eq!(designators, vec!["U3", "U1", "U2"]);
    }

    #[test]
    fn merge_accepts_already_renamed_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            &dir,
            "Designators\tDescription\tProduct Photo\tMPN\nU1\tResistor\t\tR100\n\tResistor Photo\tpic.jpg\tR100\n",
        );
        assert!(merge_photo_rows(&path).unwrap());
        let merged = fs::read_to_string(&path).unwrap();
        assert!(merged.contains("U1\tResistor\tpic.jpg\tR100"));
    }

    #[test]
    fn rename_is_stable_after_first_application() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(&dir, "Designators\tDescription\tSPN\tMPN\n");
        assert!(rename_header(&path).unwrap());
        let after_first = fs::read_to_string(&path).unwrap();

        assert!(!rename_header(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
    }

    #[test]
    fn rename_ignores_non_header_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            &dir,
            "Designators\tDescription\tProduct Photo\tMPN\nSPN\tSPN label in data\t\tR1\n",
        );
        assert!(!rename_header(&path).unwrap());
    }

    #[test]
    fn missing_file_is_a_quiet_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.bom.tsv");
        assert!(!merge_photo_rows(&path).unwrap());
        assert!(!rename_header(&path).unwrap());
    }

    #[test]
    fn unrelated_table_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let content = "Name\tValue\na\t1\n";
        let path = write_tsv(&dir, content);
        assert!(!merge_photo_rows(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }
}
