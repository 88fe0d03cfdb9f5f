//! Rewrites relative `<img src>` references so they stay valid after the
//! report files are moved into the output directory. References that are
//! absolute, fragment-only, `data:` URIs, or carry a URI scheme are never
//! touched, and neither is a reference whose target cannot be found under
//! the source directory (it may already be correct relative to the
//! destination).

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Regex, Replacer};

use crate::error::WirePostError;
use crate::paths;

static IMG_SRC_DOUBLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(<img\b[^>]*\bsrc=")([^"]+)(")"#).unwrap());
static IMG_SRC_SINGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(<img\b[^>]*\bsrc=')([^']+)(')").unwrap());

fn normalize_src(src: &str, source_dir: &Path, output_dir: &Path) -> String {
    let reference = src.trim();
    if reference.is_empty()
        || reference.contains("://")
        || reference.starts_with("data:")
        || reference.starts_with('/')
        || reference.starts_with('#')
    {
        return src.to_string();
    }

    let candidate = source_dir.join(reference);
    if !candidate.exists() {
        return src.to_string();
    }
    let (Ok(candidate), Ok(output_dir)) = (candidate.canonicalize(), output_dir.canonicalize())
    else {
        return src.to_string();
    };
    match paths::relative_from(&candidate, &output_dir) {
        Some(relative) => paths::to_posix(&relative),
        None => src.to_string(),
    }
}

/// Rewrites relative image references in `path` so they resolve from
/// `output_dir`. Quoting style is preserved per reference. Returns whether
/// any reference changed; the file is only rewritten on a true change.
pub fn rewrite_image_paths(
    path: &Path,
    source_dir: &Path,
    output_dir: &Path,
) -> Result<bool, WirePostError> {
    if !path.exists() {
        return Ok(false);
    }
    let content = fs::read_to_string(path)?;

    let mut changed = false;
    let mut substitute = |caps: &regex::Captures| -> String {
        let original = caps.get(2).unwrap().as_str();
        let normalized = normalize_src(original, source_dir, output_dir);
        if normalized != original {
            changed = true;
        }
        format!("{}{}{}", &caps[1], normalized, &caps[3])
    };

    let rewritten = IMG_SRC_DOUBLE_RE
        .replace_all(&content, substitute.by_ref())
        .into_owned();
    let rewritten = IMG_SRC_SINGLE_RE
        .replace_all(&rewritten, substitute.by_ref())
        .into_owned();

    if changed && rewritten != content {
        fs::write(path, rewritten)?;
        tracing::debug!(path = %path.display(), "rewrote relative image paths");
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_reference_relative_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("project");
        let output_dir = source_dir.join("output");
        fs::create_dir_all(&output_dir).unwrap();
        fs::write(source_dir.join("pic.jpg"), b"jpg").unwrap();

        let html = output_dir.join("report.html");
        fs::write(&html, r#"<img class="photo" src="pic.jpg">"#).unwrap();

        assert!(rewrite_image_paths(&html, &source_dir, &output_dir).unwrap());
        let rewritten = fs::read_to_string(&html).unwrap();
        assert_eq!(rewritten, r#"<img class="photo" src="../pic.jpg">"#);
    }

    #[test]
    fn preserves_single_quote_style() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("project");
        let output_dir = source_dir.join("output");
        fs::create_dir_all(&output_dir).unwrap();
        fs::write(source_dir.join("pic.jpg"), b"jpg").unwrap();

        let html = output_dir.join("report.html");
        fs::write(&html, "<img src='pic.jpg'>").unwrap();

        assert!(rewrite_image_paths(&html, &source_dir, &output_dir).unwrap());
        assert_eq!(
            fs::read_to_string(&html).unwrap(),
            "<img src='../pic.jpg'>"
        );
    }

    #[test]
    fn never_touches_absolute_data_or_fragment_references() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().to_path_buf();
        let output_dir = dir.path().join("output");
        fs::create_dir_all(&output_dir).unwrap();

        let html = output_dir.join("report.html");
        let content = concat!(
            r#"<img src="/abs/pic.jpg">"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
            r##"<img src="#anchor">"##,
            r#"<img src="https://example.com/pic.jpg">"#,
        );
        fs::write(&html, content).unwrap();

        assert!(!rewrite_image_paths(&html, &source_dir, &output_dir).unwrap());
        assert_eq!(fs::read_to_string(&html).unwrap(), content);
    }

    #[test]
    fn leaves_unresolvable_reference_untouched() {
        // The reference may already be correct relative to the destination;
        // do not break what cannot be verified.
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("project");
        let output_dir = dir.path().join("output");
        fs::create_dir_all(&source_dir).unwrap();
        fs::create_dir_all(&output_dir).unwrap();

        let html = output_dir.join("report.html");
        fs::write(&html, r#"<img src="missing.jpg">"#).unwrap();

        assert!(!rewrite_image_paths(&html, &source_dir, &output_dir).unwrap());
        assert_eq!(
            fs::read_to_string(&html).unwrap(),
            r#"<img src="missing.jpg">"#
        );
    }

    #[test]
    fn missing_file_is_a_quiet_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.html");
        assert!(!rewrite_image_paths(&path, dir.path(), dir.path()).unwrap());
    }
}
