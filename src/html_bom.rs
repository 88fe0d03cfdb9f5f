//! HTML adapter for the BOM table embedded in the generated report.
//!
//! The producing template is fixed and narrow, so the table is consumed via
//! structural text patterns instead of a DOM: the table block is identified
//! by its marker class, rows by `<tr>` delimiters, and cells by per-column
//! marker classes. Every edit is scoped to one cell's markup, the surviving
//! rows are reassembled in their original relative order, and only the table
//! block is spliced back into the document. Markup outside the table is
//! never touched.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::bom::{self, BomRecord, PHOTO_LABEL};
use crate::error::WirePostError;

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<table class="bom">\s*(.*?)\s*</table>"#).unwrap());
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<tr>.*?</tr>").unwrap());
// A data row is one where every cell carries a column-marker class. Header
// and separator rows share the <tr> delimiter but fail this shape.
static DATA_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\A<tr>\s*(?:<td class="[^"]+">.*?</td>\s*)+</tr>\z"#).unwrap()
});

static DESCRIPTION_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(<td class="bom_col_description">)\s*(.*?)\s*(</td>)"#).unwrap()
});
static DESIGNATORS_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(<td class="bom_col_designators">)\s*(.*?)\s*(</td>)"#).unwrap()
});
static PHOTO_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(<td class="bom_col_spn">)\s*(.*?)\s*(</td>)"#).unwrap()
});
static PART_NUMBER_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(<td class="bom_col_mpn">)\s*(.*?)\s*(</td>)"#).unwrap()
});

static HEADER_PHOTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(<th\s+class="bom_col_spn">)\s*SPN\s*(</th>)"#).unwrap()
});
// Looser fallback for template drift: any header cell whose text is the
// legacy label.
static HEADER_ANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(<th[^>]*>)\s*SPN\s*(</th>)").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.*?>").unwrap());

fn strip_tags(markup: &str) -> String {
    TAG_RE.replace_all(markup, "").trim().to_string()
}

/// One parsed data row, carried around as its raw markup. Cell reads and
/// writes go through the column-marker patterns so edits stay scoped to the
/// one cell they target.
#[derive(Debug, Clone)]
struct HtmlRow {
    markup: String,
}

impl HtmlRow {
    fn cell_text(&self, re: &Regex) -> String {
        re.captures(&self.markup)
            .map(|caps| strip_tags(caps.get(2).unwrap().as_str()))
            .unwrap_or_default()
    }

    fn cell_raw(&self, re: &Regex) -> String {
        re.captures(&self.markup)
            .map(|caps| caps.get(2).unwrap().as_str().trim().to_string())
            .unwrap_or_default()
    }

    fn set_cell(&mut self, re: &Regex, value: &str) {
        self.markup = re
            .replacen(&self.markup, 1, |caps: &regex::Captures| {
                format!("{}{}{}", &caps[1], value, &caps[3])
            })
            .into_owned();
    }
}

impl BomRecord for HtmlRow {
    fn description(&self) -> String {
        self.cell_text(&DESCRIPTION_CELL_RE)
    }
    fn designator(&self) -> String {
        self.cell_text(&DESIGNATORS_CELL_RE)
    }
    // Best-effort: an absent part-number cell reads as empty, not as an
    // error.
    fn part_number(&self) -> String {
        self.cell_text(&PART_NUMBER_CELL_RE)
    }
    fn photo(&self) -> String {
        self.cell_raw(&PHOTO_CELL_RE)
    }
    fn set_designator(&mut self, value: &str) {
        self.set_cell(&DESIGNATORS_CELL_RE, value);
    }
    fn set_photo(&mut self, value: &str) {
        self.set_cell(&PHOTO_CELL_RE, value);
    }
}

/// Merges photo helper rows inside the marked BOM table and rewrites the
/// file with the helpers removed. Returns `Ok(false)` when the file or the
/// table block is missing, or when no row changed.
pub fn merge_photo_rows(path: &Path) -> Result<bool, WirePostError> {
    if !path.exists() {
        return Ok(false);
    }
    let content = fs::read_to_string(path)?;

    let Some(caps) = TABLE_RE.captures(&content) else {
        return Ok(false);
    };
    let body = caps.get(1).unwrap();
    let (body_start, body_end) = (body.start(), body.end());

    let mut all_rows: Vec<String> = ROW_RE
        .find_iter(body.as_str())
        .map(|m| m.as_str().to_string())
        .collect();
    let data_indexes: Vec<usize> = all_rows
        .iter()
        .enumerate()
        .filter(|(_, row)| DATA_ROW_RE.is_match(row))
        .map(|(idx, _)| idx)
        .collect();
    if data_indexes.is_empty() {
        return Ok(false);
    }

    let mut records: Vec<HtmlRow> = data_indexes
        .iter()
        .map(|&idx| HtmlRow {
            markup: all_rows[idx].clone(),
        })
        .collect();
    let removed = bom::merge_pass(&mut records);
    if removed.is_empty() {
        return Ok(false);
    }
    let removed: HashSet<usize> = removed.into_iter().collect();

    for (record_idx, &row_idx) in data_indexes.iter().enumerate() {
        all_rows[row_idx] = if removed.contains(&record_idx) {
            String::new()
        } else {
            records[record_idx].markup.clone()
        };
    }

    let new_body = all_rows
        .iter()
        .filter(|row| !row.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let rewritten = format!(
        "{}{}{}",
        &content[..body_start],
        new_body,
        &content[body_end..]
    );
    fs::write(path, rewritten)?;

    tracing::debug!(
        merged = removed.len(),
        path = %path.display(),
        "merged photo rows in html bom table"
    );
    Ok(true)
}

/// Renames the legacy photo column label in the table header. Matches the
/// marked header cell first, then any header cell whose text is the legacy
/// label; case-insensitive. Rewrites the file iff something matched.
pub fn rename_header(path: &Path) -> Result<bool, WirePostError> {
    if !path.exists() {
        return Ok(false);
    }
    let content = fs::read_to_string(path)?;

    let mut updated = HEADER_PHOTO_RE
        .replace_all(&content, |caps: &regex::Captures| {
            format!("{}{}{}", &caps[1], PHOTO_LABEL, &caps[2])
        })
        .into_owned();
    if updated == content {
        updated = HEADER_ANY_RE
            .replace_all(&content, |caps: &regex::Captures| {
                format!("{}{}{}", &caps[1], PHOTO_LABEL, &caps[2])
            })
            .into_owned();
    }

    if updated == content {
        return Ok(false);
    }
    fs::write(path, updated)?;
    tracing::debug!(path = %path.display(), "renamed legacy photo header in html bom table");
    Ok(true)
}
