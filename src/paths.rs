//! Path and URI helpers shared by the rewriters and the rendering engines.

use std::env;
use std::path::{Path, PathBuf};

/// Finds an executable on the `PATH` search path.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let with_exe = dir.join(format!("{name}.exe"));
            if with_exe.is_file() {
                return Some(with_exe);
            }
        }
    }
    None
}

/// `file://` URL for an existing file, suitable as a browser navigation
/// target.
pub fn file_uri(path: &Path) -> Option<String> {
    let absolute = path.canonicalize().ok()?;
    url::Url::from_file_path(absolute).ok().map(|u| u.to_string())
}

/// `file://` URL for an existing directory, with a trailing slash so it can
/// serve as a `<base href>`.
pub fn dir_uri(path: &Path) -> Option<String> {
    let absolute = path.canonicalize().ok()?;
    url::Url::from_directory_path(absolute)
        .ok()
        .map(|u| u.to_string())
}

/// Relative path from `base` to `path`. Both must be absolute; returns
/// `None` when they do not share a root (e.g. different drives).
pub fn relative_from(path: &Path, base: &Path) -> Option<PathBuf> {
    let path_components: Vec<_> = path.components().collect();
    let base_components: Vec<_> = base.components().collect();
    if path_components.first() != base_components.first() {
        return None;
    }

    let mut shared = 0;
    while shared < path_components.len()
        && shared < base_components.len()
        && path_components[shared] == base_components[shared]
    {
        shared += 1;
    }

    let mut relative = PathBuf::new();
    for _ in shared..base_components.len() {
        relative.push("..");
    }
    for component in &path_components[shared..] {
        relative.push(component.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Some(relative)
}

/// Forward-slash rendering of a relative path, for use inside HTML.
pub fn to_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
