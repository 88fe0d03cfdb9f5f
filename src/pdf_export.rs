//! HTML-to-PDF export with engine fallback.
//!
//! Engines are tried in a fixed order: a headless browser, the embedded
//! rendering library when compiled in, then a `wkhtmltopdf` CLI. Each
//! engine either produces the PDF or returns a diagnostic; when the whole
//! chain fails, the diagnostics are aggregated into a single note so the
//! caller sees every reason at once. Export failure never fails the run.

use std::path::Path;
use std::process::Command;

use crate::browser;
use crate::paths;
use crate::sheet::SheetSize;

/// Result of one export attempt, reported back to the caller regardless of
/// success.
#[derive(Debug, Clone, Default)]
pub struct PdfOutcome {
    pub success: bool,
    pub note: Option<String>,
}

struct ExportJob<'a> {
    html_path: &'a Path,
    pdf_path: &'a Path,
    sheet: SheetSize,
}

/// One way of turning HTML into PDF. `attempt` returns a short engine note
/// on success, a diagnostic on failure.
trait PdfEngine {
    fn label(&self) -> &'static str;
    fn attempt(&self, job: &ExportJob<'_>) -> Result<String, String>;
}

struct BrowserEngine;

impl PdfEngine for BrowserEngine {
    fn label(&self) -> &'static str {
        "browser"
    }

    fn attempt(&self, job: &ExportJob<'_>) -> Result<String, String> {
        browser::render_pdf(job.html_path, job.pdf_path, job.sheet)
    }
}

#[cfg(feature = "library_engine")]
struct LibraryEngine;

#[cfg(feature = "library_engine")]
impl PdfEngine for LibraryEngine {
    fn label(&self) -> &'static str {
        "library"
    }

    fn attempt(&self, job: &ExportJob<'_>) -> Result<String, String> {
        let html = std::fs::read_to_string(job.html_path)
            .map_err(|err| format!("cannot read html: {err}"))?;
        let (width_mm, height_mm) = job.sheet.dimensions_mm();
        let engine = fullbleed::FullBleed::builder()
            .page_size(fullbleed::Size::from_mm(width_mm, height_mm))
            .margin_all(0.0)
            .build()
            .map_err(|err| format!("engine setup failed: {err}"))?;
        engine
            .render_to_file(&html, "html, body { margin: 0; padding: 0; }", job.pdf_path)
            .map_err(|err| format!("render failed: {err}"))?;
        Ok("embedded renderer".to_string())
    }
}

struct CliEngine;

impl PdfEngine for CliEngine {
    fn label(&self) -> &'static str {
        "wkhtmltopdf"
    }

    fn attempt(&self, job: &ExportJob<'_>) -> Result<String, String> {
        let Some(binary) = paths::find_in_path("wkhtmltopdf") else {
            return Err("wkhtmltopdf not found on PATH".to_string());
        };
        let output = Command::new(&binary)
            .args([
                "--enable-local-file-access",
                "--orientation",
                "Landscape",
                "--page-size",
                job.sheet.css_name(),
                "--margin-top",
                "0",
                "--margin-right",
                "0",
                "--margin-bottom",
                "0",
                "--margin-left",
                "0",
            ])
            .arg(job.html_path)
            .arg(job.pdf_path)
            .output()
            .map_err(|err| format!("cannot run {}: {err}", binary.display()))?;

        let produced = job
            .pdf_path
            .metadata()
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if output.status.success() && produced {
            return Ok("wkhtmltopdf".to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(format!("exit {}", output.status.code().unwrap_or(-1)))
        } else {
            Err(stderr)
        }
    }
}

/// Exports `html_path` to `pdf_path`, trying each available engine in
/// order. The outcome is advisory: a failed export is reported in the note
/// but never aborts the surrounding run.
pub fn export_pdf(html_path: &Path, pdf_path: &Path, sheet: SheetSize) -> PdfOutcome {
    if !html_path.exists() {
        return PdfOutcome {
            success: false,
            note: Some("HTML output was not found".to_string()),
        };
    }

    let mut engines: Vec<Box<dyn PdfEngine>> = Vec::new();
    engines.push(Box::new(BrowserEngine));
    #[cfg(feature = "library_engine")]
    engines.push(Box::new(LibraryEngine));
    engines.push(Box::new(CliEngine));

    let job = ExportJob {
        html_path,
        pdf_path,
        sheet,
    };
    run_chain(&engines, &job)
}

fn run_chain(engines: &[Box<dyn PdfEngine>], job: &ExportJob<'_>) -> PdfOutcome {
    let mut diagnostics = Vec::new();
    for engine in engines {
        match engine.attempt(job) {
            Ok(note) => {
                tracing::info!(
                    engine = engine.label(),
                    pdf = %job.pdf_path.display(),
                    "pdf export succeeded"
                );
                return PdfOutcome {
                    success: true,
                    note: Some(note),
                };
            }
            Err(diagnostic) => {
                tracing::warn!(
                    engine = engine.label(),
                    %diagnostic,
                    "pdf engine failed, trying next"
                );
                diagnostics.push(format!("{}: {}", engine.label(), diagnostic));
            }
        }
    }
    PdfOutcome {
        success: false,
        note: Some(format!("PDF engine failed: {}", diagnostics.join("; "))),
    }
}
