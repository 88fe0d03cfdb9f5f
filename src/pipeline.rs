//! Post-processing pipeline over one report's artifacts.
//!
//! The generator leaves a family of sibling files sharing a base path:
//! `<base>.html`, `<base>.bom.tsv` and, after export, `<base>.pdf`. The
//! pipeline runs every normalization pass over each artifact that exists
//! and reports per-artifact what actually changed. Passes are ordered so
//! the photo merge sees the legacy header before it is renamed.

use std::path::{Path, PathBuf};

use crate::error::WirePostError;
use crate::html_bom;
use crate::image_paths;
use crate::pdf_export::{self, PdfOutcome};
use crate::sheet::SheetSize;
use crate::tsv;

/// Which normalization passes changed one artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactNotes {
    pub photo_rows_merged: bool,
    pub header_renamed: bool,
    pub image_paths_rewritten: bool,
}

impl ArtifactNotes {
    pub fn summary(&self) -> Vec<&'static str> {
        let mut notes = Vec::new();
        if self.photo_rows_merged {
            notes.push("photo row merged");
        }
        if self.header_renamed {
            notes.push("header normalized");
        }
        if self.image_paths_rewritten {
            notes.push("image paths normalized");
        }
        notes
    }
}

/// Everything the pipeline did to one report.
#[derive(Debug)]
pub struct ArtifactReport {
    pub html_path: PathBuf,
    pub tsv_path: PathBuf,
    pub pdf_path: PathBuf,
    pub html: ArtifactNotes,
    pub tsv: ArtifactNotes,
    pub pdf: PdfOutcome,
}

/// Runs every post-processing pass over the artifacts rooted at `base`
/// (the generator output path without an extension). `source_dir` is where
/// the diagram source and its referenced images live.
pub fn finalize_report(
    base: &Path,
    source_dir: &Path,
    sheet: SheetSize,
) -> Result<ArtifactReport, WirePostError> {
    let html_path = base.with_extension("html");
    let pdf_path = base.with_extension("pdf");
    let tsv_path = PathBuf::from(format!("{}.bom.tsv", base.display()));
    let output_dir = base
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tsv_notes = ArtifactNotes::default();
    let mut html_notes = ArtifactNotes::default();

    // Merge before rename: the merge recognizes both header spellings, but
    // running it first keeps the passes order-insensitive to upstream
    // generator changes.
    tsv_notes.photo_rows_merged = tsv::merge_photo_rows(&tsv_path)?;
    html_notes.photo_rows_merged = html_bom::merge_photo_rows(&html_path)?;
    html_notes.header_renamed = html_bom::rename_header(&html_path)?;
    tsv_notes.header_renamed = tsv::rename_header(&tsv_path)?;

    html_notes.image_paths_rewritten =
        image_paths::rewrite_image_paths(&html_path, source_dir, output_dir)?;
    tsv_notes.image_paths_rewritten =
        image_paths::rewrite_image_paths(&tsv_path, source_dir, output_dir)?;

    let pdf = pdf_export::export_pdf(&html_path, &pdf_path, sheet);

    tracing::info!(
        base = %base.display(),
        html = ?html_notes.summary(),
        tsv = ?tsv_notes.summary(),
        pdf_ok = pdf.success,
        "report finalized"
    );

    Ok(ArtifactReport {
        html_path,
        tsv_path,
        pdf_path,
        html: html_notes,
        tsv: tsv_notes,
        pdf,
    })
}
