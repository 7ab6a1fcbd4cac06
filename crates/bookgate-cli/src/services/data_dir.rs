// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use bookgate_core::error::{BookgateError, Result};

const APP_DIR: &str = "bookgate";

/// Return the application data directory, creating it if needed.
///
/// `explicit` comes from `--data-dir` / `BOOKGATE_DATA_DIR` and wins over
/// the XDG and home-directory fallbacks.
pub fn data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = resolve(
        explicit,
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
    .ok_or_else(|| {
        BookgateError::Config("cannot determine a data directory; set BOOKGATE_DATA_DIR".into())
    })?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn resolve(explicit: Option<&Path>, xdg: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(dir.to_path_buf());
    }
    // Empty XDG_DATA_HOME counts as unset.
    if let Some(xdg) = xdg.filter(|p| !p.as_os_str().is_empty()) {
        return Some(xdg.join(APP_DIR));
    }
    home.map(|home| home.join(".local").join("share").join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = resolve(
            Some(Path::new("/srv/books")),
            Some("/xdg".into()),
            Some("/home/u".into()),
        );
        assert_eq!(dir, Some(PathBuf::from("/srv/books")));
    }

    #[test]
    fn xdg_then_home() {
        assert_eq!(
            resolve(None, Some("/xdg".into()), Some("/home/u".into())),
            Some(PathBuf::from("/xdg/bookgate"))
        );
        assert_eq!(
            resolve(None, Some(PathBuf::new()), Some("/home/u".into())),
            Some(PathBuf::from("/home/u/.local/share/bookgate"))
        );
        assert_eq!(resolve(None, None, None), None);
    }

    #[test]
    fn creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("bookgate");
        let dir = data_dir(Some(&target)).unwrap();
        assert!(dir.is_dir());
    }
}
