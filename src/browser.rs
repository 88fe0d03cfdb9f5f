//! Headless-browser PDF rendering.
//!
//! Candidate browsers are enumerated in priority order (explicit override
//! first, then well-known names and install locations), and each candidate
//! is tried with each supported headless flag variant until one produces a
//! usable PDF. A zero exit code is not trusted on its own: browsers happily
//! render a "file not found" page into a valid PDF, so the output is also
//! scanned for known error-page signatures.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::paths;
use crate::sheet::SheetSize;

/// Environment variable pinning an explicit browser executable, bypassing
/// candidate enumeration.
pub const BROWSER_ENV: &str = "WIREPOST_PDF_BROWSER";

// Engines disagree on which headless spelling they accept.
const HEADLESS_MODES: &[&str] = &["--headless=old", "--headless=new", "--headless"];

const ERROR_PAGE_SCAN_LIMIT: usize = 200_000;
const ERROR_PAGE_SIGNATURES: &[&str] = &[
    "file not found",
    "err_file_not_found",
    "this page isn't working",
    "couldn't be loaded",
];

#[cfg(target_os = "windows")]
const PATH_NAMES: &[&str] = &["msedge", "chrome", "google-chrome", "chromium", "brave"];
#[cfg(target_os = "macos")]
const PATH_NAMES: &[&str] = &["chrome", "chromium", "brave", "microsoft-edge"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "brave-browser",
    "microsoft-edge",
];

#[cfg(target_os = "windows")]
fn known_install_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for root in ["ProgramFiles", "ProgramFiles(x86)", "LocalAppData"] {
        let Ok(base) = env::var(root) else {
            continue;
        };
        for suffix in [
            r"Microsoft\Edge\Application\msedge.exe",
            r"Google\Chrome\Application\chrome.exe",
            r"BraveSoftware\Brave-Browser\Application\brave.exe",
        ] {
            paths.push(Path::new(&base).join(suffix));
        }
    }
    paths
}

#[cfg(target_os = "macos")]
fn known_install_paths() -> Vec<PathBuf> {
    [
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn known_install_paths() -> Vec<PathBuf> {
    Vec::new()
}

/// Candidate browser executables in priority order, de-duplicated by
/// resolved path.
pub fn browser_candidates() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Ok(explicit) = env::var(BROWSER_ENV) {
        let explicit = explicit.trim();
        if !explicit.is_empty() {
            let path = PathBuf::from(explicit);
            if path.exists() {
                candidates.push(path);
            }
        }
    }

    for name in PATH_NAMES {
        if let Some(found) = paths::find_in_path(name) {
            candidates.push(found);
        }
    }
    for known in known_install_paths() {
        if known.exists() {
            candidates.push(known);
        }
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    candidates.retain(|path| {
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        seen.insert(key)
    });
    candidates
}

/// Whether a rendered PDF is actually a browser error page saved as PDF.
pub fn pdf_looks_like_error_page(pdf_path: &Path) -> bool {
    let Ok(data) = fs::read(pdf_path) else {
        return false;
    };
    let scan_len = data.len().min(ERROR_PAGE_SCAN_LIMIT);
    let haystack = data[..scan_len].to_ascii_lowercase();
    ERROR_PAGE_SIGNATURES
        .iter()
        .any(|signature| contains_bytes(&haystack, signature.as_bytes()))
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

/// Writes a print-ready copy of the HTML next to the original: a base tag
/// so relative resources resolve from a `file://` URL, plus a zero-margin
/// `@page` rule sized for the requested sheet. Returns the copy path and
/// whether a copy was actually written (on failure the original is used
/// as-is).
pub fn prepare_print_copy(html_path: &Path, sheet: SheetSize) -> (PathBuf, bool) {
    let Ok(text) = fs::read_to_string(html_path) else {
        return (html_path.to_path_buf(), false);
    };

    let parent = html_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut head_extra = String::new();
    if let Some(base_href) = paths::dir_uri(parent) {
        head_extra.push_str(&format!("<base href=\"{base_href}\">"));
    }
    head_extra.push_str(&format!(
        "<style>@page {{ size: {} landscape; margin: 0; }}\
         html, body {{ margin: 0; padding: 0; }}</style>",
        sheet.css_name()
    ));

    let injected = match text.find("</head>") {
        Some(position) => format!("{}{}{}", &text[..position], head_extra, &text[position..]),
        None => format!("{head_extra}{text}"),
    };

    let copy_path = html_path.with_extension("print.html");
    match fs::write(&copy_path, injected) {
        Ok(()) => (copy_path, true),
        Err(_) => (html_path.to_path_buf(), false),
    }
}

/// Renders `html_path` to `pdf_path` via the first browser candidate and
/// headless variant that produces a usable PDF. `Ok` carries a short engine
/// note, `Err` a diagnostic for the fallback chain.
pub fn render_pdf(html_path: &Path, pdf_path: &Path, sheet: SheetSize) -> Result<String, String> {
    let candidates = browser_candidates();
    if candidates.is_empty() {
        return Err(format!("no supported browser found (set {BROWSER_ENV})"));
    }

    let (print_path, is_copy) = prepare_print_copy(html_path, sheet);
    let result = render_with_candidates(&candidates, &print_path, pdf_path);
    if is_copy {
        let _ = fs::remove_file(&print_path);
    }
    result
}

fn render_with_candidates(
    candidates: &[PathBuf],
    print_path: &Path,
    pdf_path: &Path,
) -> Result<String, String> {
    let Some(html_url) = paths::file_uri(print_path) else {
        return Err(format!(
            "cannot build file url for {}",
            print_path.display()
        ));
    };

    let mut last_error = String::new();
    for browser in candidates {
        let file_name = browser
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let engine = if file_name.contains("edge") {
            "edge"
        } else {
            "chromium"
        };

        for mode in HEADLESS_MODES {
            if pdf_path.exists() {
                let _ = fs::remove_file(pdf_path);
            }
            // Profile directory lives only for this one attempt.
            let profile = match tempfile::tempdir() {
                Ok(dir) => dir,
                Err(err) => {
                    last_error = format!("cannot create profile dir: {err}");
                    continue;
                }
            };

            let output = Command::new(browser)
                .arg(mode)
                .args([
                    "--disable-gpu",
                    "--no-first-run",
                    "--disable-extensions",
                    "--disable-background-networking",
                    "--disable-sync",
                    "--no-default-browser-check",
                    "--landscape",
                    "--allow-file-access-from-files",
                    "--allow-file-access",
                    "--no-pdf-header-footer",
                ])
                .arg(format!("--user-data-dir={}", profile.path().display()))
                .arg(format!("--print-to-pdf={}", pdf_path.display()))
                .arg(&html_url)
                .output();
            let output = match output {
                Ok(output) => output,
                Err(err) => {
                    last_error = format!("browser not found: {}: {err}", browser.display());
                    continue;
                }
            };

            let produced = pdf_path.metadata().map(|m| m.len() > 0).unwrap_or(false);
            if output.status.success() && produced {
                if pdf_looks_like_error_page(pdf_path) {
                    let _ = fs::remove_file(pdf_path);
                    last_error = "browser rendered error page (file not found)".to_string();
                    tracing::warn!(
                        browser = %browser.display(),
                        mode,
                        "headless render produced an error page"
                    );
                    continue;
                }
                return Ok(format!("{engine} headless"));
            }

            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            last_error = if !stderr.is_empty() {
                stderr
            } else if !stdout.is_empty() {
                stdout
            } else {
                format!("exit {}", output.status.code().unwrap_or(-1))
            };
        }
    }

    Err(format!("browser print failed: {last_error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_page_signatures_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("out.pdf");

        fs::write(&pdf, b"%PDF-1.4 ... File Not Found ...").unwrap();
        assert!(pdf_looks_like_error_page(&pdf));

        fs::write(&pdf, b"%PDF-1.4 ERR_FILE_NOT_FOUND").unwrap();
        assert!(pdf_looks_like_error_page(&pdf));

        fs::write(&pdf, b"%PDF-1.4 perfectly ordinary content").unwrap();
        assert!(!pdf_looks_like_error_page(&pdf));
    }

    #[test]
    fn missing_pdf_is_not_an_error_page() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!pdf_looks_like_error_page(&dir.path().join("nope.pdf")));
    }

    #[test]
    fn print_copy_injects_page_rule_and_base_tag() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("report.html");
        fs::write(&html, "<html><head><title>t</title></head><body>x</body></html>").unwrap();

        let (copy, is_copy) = prepare_print_copy(&html, SheetSize::A3);
        assert!(is_copy);
        assert_eq!(copy, dir.path().join("report.print.html"));

        let text = fs::read_to_string(&copy).unwrap();
        assert!(text.contains("@page { size: A3 landscape; margin: 0; }"));
        assert!(text.contains("<base href=\"file://"));
        // Injection lands inside head, before the closing tag.
        let head_close = text.find("</head>").unwrap();
        assert!(text.find("<base href").unwrap() < head_close);
        assert!(text.contains("<body>x</body>"));
    }

    #[test]
    fn print_copy_without_head_prepends_markup() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("bare.html");
        fs::write(&html, "<table class=\"bom\"></table>").unwrap();

        let (copy, is_copy) = prepare_print_copy(&html, SheetSize::A4);
        assert!(is_copy);
        let text = fs::read_to_string(&copy).unwrap();
        assert!(text.starts_with("<base href=\"file://"));
        assert!(text.ends_with("<table class=\"bom\"></table>"));
    }

    #[cfg(unix)]
    mod fake_browser {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn install_fake_browser(dir: &Path, script_body: &str) -> PathBuf {
            let path = dir.join("fake-browser");
            fs::write(&path, script_body).unwrap();
            let mut permissions = fs::metadata(&path).unwrap().permissions();
            permissions.set_mode(0o755);
            fs::set_permissions(&path, permissions).unwrap();
            path
        }

        const ERROR_PAGE_SCRIPT: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --print-to-pdf=*) out="${arg#--print-to-pdf=}" ;;
  esac
done
printf '%%PDF-1.4 File Not Found' > "$out"
exit 0
"#;

        const GOOD_SCRIPT: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --print-to-pdf=*) out="${arg#--print-to-pdf=}" ;;
  esac
done
printf '%%PDF-1.4 rendered sheet' > "$out"
exit 0
"#;

        #[test]
        fn zero_exit_error_page_is_rejected_and_deleted() {
            // Exit code 0, but the bytes spell out a navigation
            // failure.
            let dir = tempfile::tempdir().unwrap();
            let browser = install_fake_browser(dir.path(), ERROR_PAGE_SCRIPT);
            let html = dir.path().join("report.html");
            fs::write(&html, "<html></html>").unwrap();
            let pdf = dir.path().join("report.pdf");

            let result = render_with_candidates(&[browser], &html, &pdf);
            let diagnostic = result.unwrap_err();
            assert!(diagnostic.contains("error page"), "got: {diagnostic}");
            assert!(!pdf.exists());
        }

        #[test]
        fn healthy_output_is_accepted() {
            let dir = tempfile::tempdir().unwrap();
            let browser = install_fake_browser(dir.path(), GOOD_SCRIPT);
            let html = dir.path().join("report.html");
            fs::write(&html, "<html></html>").unwrap();
            let pdf = dir.path().join("report.pdf");

            let note = render_with_candidates(&[browser], &html, &pdf).unwrap();
            assert_eq!(note, "chromium headless");
            assert!(pdf.exists());
        }

        #[test]
        fn error_page_browser_falls_through_to_next_candidate() {
            let dir = tempfile::tempdir().unwrap();
            let bad = install_fake_browser(dir.path(), ERROR_PAGE_SCRIPT);
            let good_dir = dir.path().join("good");
            fs::create_dir(&good_dir).unwrap();
            let good = install_fake_browser(&good_dir, GOOD_SCRIPT);
            let html = dir.path().join("report.html");
            fs::write(&html, "<html></html>").unwrap();
            let pdf = dir.path().join("report.pdf");

            let note = render_with_candidates(&[bad, good], &html, &pdf).unwrap();
            assert_eq!(note, "chromium headless");
            assert!(pdf.exists());
        }
    }
}
