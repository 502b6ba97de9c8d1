use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The scripts directory of one bucket.
///
/// Typed buckets live in `<root>/<type>/`, the untyped bucket is the root itself.
#[derive(Debug, Clone)]
pub struct ScriptRepository {
    root: PathBuf,
    bucket: Option<String>,
}

impl ScriptRepository {
    pub fn new(root: impl AsRef<Path>, bucket: Option<&str>) -> Self {
        let root = root.as_ref();
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self {
            root,
            bucket: bucket.map(str::to_owned),
        }
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn dir(&self) -> PathBuf {
        match &self.bucket {
            Some(bucket) => self.root.join(bucket),
            None => self.root.clone(),
        }
    }

    pub fn full_path(&self, filename: &str) -> PathBuf {
        self.dir().join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.full_path(filename).exists()
    }

    /// Names of the regular files directly inside the bucket directory.
    pub fn list(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => log::warn!("Ignoring non UTF-8 script name {:?}", raw),
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lists_files_only() {
        let dir = TempDir::new().unwrap();
        let bucket = dir.path().join("schema");
        fs::create_dir_all(bucket.join("nested")).unwrap();
        fs::write(bucket.join("20240101000000_a.sql"), "").unwrap();
        fs::write(bucket.join("nested/20240101000001_b.sql"), "").unwrap();

        let repo = ScriptRepository::new(dir.path(), Some("schema"));
        assert_eq!(repo.list().unwrap(), vec!["20240101000000_a.sql".to_string()]);
        assert!(repo.exists("20240101000000_a.sql"));
        assert!(!repo.exists("20240101000001_b.sql"));
    }

    #[test]
    fn test_missing_bucket_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let repo = ScriptRepository::new(dir.path(), Some("data"));
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_untyped_bucket_uses_root() {
        let dir = TempDir::new().unwrap();
        let repo = ScriptRepository::new(dir.path(), None);
        assert_eq!(repo.full_path("x.py"), dir.path().join("x.py"));
        assert_eq!(repo.bucket(), None);
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let repo = ScriptRepository::new("migrations", Some("schema"));
        assert!(repo.dir().is_absolute());
        assert!(repo.full_path("a.sql").ends_with("migrations/schema/a.sql"));
    }
}
