//! Post-processor for generated wiring-diagram reports.
//!
//! Takes the HTML and TSV artifacts a diagram generator leaves behind and
//! makes them shippable: photo helper rows are merged back into the BOM
//! rows they describe, the legacy photo column label is renamed, relative
//! image references are fixed up for the output directory, and the HTML is
//! exported to a landscape PDF through a chain of fallback engines.

pub mod bom;
pub mod browser;
mod error;
pub mod generator;
pub mod html_bom;
pub mod image_paths;
mod paths;
pub mod pdf_export;
pub mod pipeline;
pub mod sheet;
pub mod tsv;

pub use error::WirePostError;
pub use pdf_export::{PdfOutcome, export_pdf};
pub use pipeline::{ArtifactNotes, ArtifactReport, finalize_report};
pub use sheet::SheetSize;
