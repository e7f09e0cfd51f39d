//! Destination file helpers: collision-safe creation and idempotent delete.

use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on ` (N)` suffix probing before giving up.
const MAX_UNIQUE_ATTEMPTS: u32 = 1000;

/// Create `name` inside `dir`, never overwriting an existing file.
///
/// When the name is taken, a ` (N)` suffix is inserted before the extension
/// (`a.bin` → `a (1).bin`) until a free name is found. The directory is
/// created if missing. Returns the path of the created (empty) file.
pub async fn create_unique_file(dir: &Path, name: &str) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    for attempt in 0..MAX_UNIQUE_ATTEMPTS {
        let candidate = if attempt == 0 {
            name.to_string()
        } else {
            disambiguate(name, attempt)
        };
        let path = dir.join(candidate);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", name, dir.display()),
    ))
}

/// Delete `path`, succeeding if it is already absent.
pub async fn delete_file(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Insert ` (n)` before the final extension: `a.tar.gz` → `a.tar (1).gz`.
/// Names without an extension (or dotfiles like `.profile`) get the suffix
/// appended at the end.
fn disambiguate(name: &str, n: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", name, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn disambiguate_inserts_before_extension() {
        assert_eq!(disambiguate("a.bin", 1), "a (1).bin");
        assert_eq!(disambiguate("a.tar.gz", 2), "a.tar (2).gz");
        assert_eq!(disambiguate("noext", 1), "noext (1)");
        assert_eq!(disambiguate(".profile", 3), ".profile (3)");
    }

    #[tokio::test]
    async fn creates_file_and_avoids_collisions() {
        let dir = tempdir().unwrap();
        let first = create_unique_file(dir.path(), "a.bin").await.unwrap();
        let second = create_unique_file(dir.path(), "a.bin").await.unwrap();
        let third = create_unique_file(dir.path(), "a.bin").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "a.bin");
        assert_eq!(second.file_name().unwrap(), "a (1).bin");
        assert_eq!(third.file_name().unwrap(), "a (2).bin");
        assert!(first.exists() && second.exists() && third.exists());
    }

    #[tokio::test]
    async fn creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("deep/down");
        let created = create_unique_file(&nested, "x").await.unwrap();
        assert!(created.exists());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = create_unique_file(dir.path(), "gone.bin").await.unwrap();
        delete_file(&path).await.unwrap();
        assert!(!path.exists());
        // Second delete finds nothing and still succeeds.
        delete_file(&path).await.unwrap();
    }
}
