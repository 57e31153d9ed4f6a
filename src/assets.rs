// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("unable to read sounds directory {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} contains a file name that isn't valid UTF-8")]
    InvalidName(PathBuf),
}

/// Lists the sound files in the given directory, sorted by name. Sub-directories and
/// entries that can't be inspected, such as dangling symlinks, are skipped.
pub fn discover(dir: &Path) -> Result<Vec<String>, AssetError> {
    let read_err = |source| AssetError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut filenames = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        // Follow symlinks so a linked clip counts as a file.
        let metadata = match fs::metadata(entry.path()) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = ?entry.path(), err = e.to_string(), "Skipping unreadable entry");
                continue;
            }
        };
        if !metadata.is_file() {
            debug!(path = ?entry.path(), "Skipping non-file entry");
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => filenames.push(name),
            Err(_) => return Err(AssetError::InvalidName(entry.path())),
        }
    }

    filenames.sort();
    info!(dir = ?dir, count = filenames.len(), "Discovered sounds");
    Ok(filenames)
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_discover_sorted_files_only() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("wind.ogg"), b"")?;
        fs::write(dir.path().join("birds.wav"), b"")?;
        fs::write(dir.path().join("creek.mp3"), b"")?;
        fs::create_dir(dir.path().join("unused"))?;
        fs::write(dir.path().join("unused").join("thunder.wav"), b"")?;

        assert_eq!(
            vec!["birds.wav", "creek.mp3", "wind.ogg"],
            discover(dir.path())?
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_skips_dangling_symlink() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("birds.wav"), b"")?;
        fs::write(dir.path().join("owl.wav"), b"")?;
        std::os::unix::fs::symlink(dir.path().join("gone.wav"), dir.path().join("broken.wav"))?;
        std::os::unix::fs::symlink(dir.path().join("owl.wav"), dir.path().join("linked.wav"))?;

        assert_eq!(
            vec!["birds.wav", "linked.wav", "owl.wav"],
            discover(dir.path())?
        );
        Ok(())
    }

    #[test]
    fn test_discover_empty_dir() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        assert!(discover(dir.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_discover_missing_dir() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let missing = dir.path().join("nope");
        let err = discover(&missing).unwrap_err();
        assert!(matches!(err, AssetError::Read { .. }));
        assert!(err.to_string().contains("nope"));
        Ok(())
    }
}
