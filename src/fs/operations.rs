use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Extensions accepted as markdown when naming a new file.
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Append `.md` unless `name` already ends with a markdown extension.
pub fn markdown_file_name(name: &str) -> String {
    let has_markdown_ext = Path::new(name)
        .extension()
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.iter().any(|m| ext == *m));
    if has_markdown_ext {
        name.to_string()
    } else {
        format!("{name}.md")
    }
}

fn child_path(parent: &Path, name: &str) -> Result<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidPath("name must not be empty".into()));
    }
    Ok(parent.join(name))
}

/// Create an empty markdown file named `name` inside `parent`.
///
/// Returns the path of the new file.
pub fn create_file(parent: &Path, name: &str) -> Result<PathBuf> {
    let path = child_path(parent, &markdown_file_name(name.trim()))?;
    if path.exists() {
        return Err(AppError::AlreadyExists(path));
    }
    fs::File::create_new(&path)?;
    Ok(path)
}

/// Create a directory named `name` inside `parent`, with any missing
/// intermediate directories.
pub fn create_dir(parent: &Path, name: &str) -> Result<PathBuf> {
    let path = child_path(parent, name)?;
    if path.exists() {
        return Err(AppError::AlreadyExists(path));
    }
    fs::create_dir_all(&path)?;
    Ok(path)
}

/// Rename `from` to `new_name` within the same directory. Refuses to
/// overwrite an existing entry.
pub fn rename(from: &Path, new_name: &str) -> Result<PathBuf> {
    let parent = from
        .parent()
        .ok_or_else(|| AppError::InvalidPath(format!("{} has no parent", from.display())))?;
    let to = child_path(parent, new_name)?;
    if to == from {
        return Ok(to);
    }
    if to.exists() {
        return Err(AppError::AlreadyExists(to));
    }
    if !from.exists() {
        return Err(AppError::NotFound(from.to_path_buf()));
    }
    fs::rename(from, &to)?;
    Ok(to)
}

/// Delete a file or directory. Directories are removed recursively.
pub fn delete(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|_| AppError::NotFound(path.to_path_buf()))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_markdown_file_name() {
        assert_eq!(markdown_file_name("notes"), "notes.md");
        assert_eq!(markdown_file_name("notes.md"), "notes.md");
        assert_eq!(markdown_file_name("notes.markdown"), "notes.markdown");
        assert_eq!(markdown_file_name("notes.txt"), "notes.txt.md");
    }

    #[test]
    fn test_create_file_appends_extension() {
        let tmp = TempDir::new().unwrap();
        let path = create_file(tmp.path(), "todo").unwrap();
        assert_eq!(path, tmp.path().join("todo.md"));
        assert!(path.is_file());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_create_file_collision_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("taken.md"), "keep me").unwrap();
        let err = create_file(tmp.path(), "taken").unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(tmp.path().join("taken.md")).unwrap(), "keep me");
    }

    #[test]
    fn test_create_empty_name_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            create_dir(tmp.path(), "   "),
            Err(AppError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_create_dir() {
        let tmp = TempDir::new().unwrap();
        let path = create_dir(tmp.path(), "guides").unwrap();
        assert!(path.is_dir());
        assert!(matches!(
            create_dir(tmp.path(), "guides"),
            Err(AppError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_rename() {
        let tmp = TempDir::new().unwrap();
        let old_path = tmp.path().join("old.md");
        fs::write(&old_path, "x").unwrap();
        let new_path = rename(&old_path, "new.md").unwrap();
        assert_eq!(new_path, tmp.path().join("new.md"));
        assert!(!old_path.exists());
        assert!(new_path.exists());
    }

    #[test]
    fn test_rename_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.md"), "a").unwrap();
        fs::write(tmp.path().join("b.md"), "b").unwrap();
        let err = rename(&tmp.path().join("a.md"), "b.md").unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(tmp.path().join("b.md")).unwrap(), "b");
    }

    #[test]
    fn test_rename_nonexistent_fails() {
        let tmp = TempDir::new().unwrap();
        let err = rename(&tmp.path().join("ghost.md"), "dest.md").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_delete_directory_recursively() {
        let tmp = TempDir::new().unwrap();
        let dir_path = tmp.path().join("parent");
        let nested_dir = dir_path.join("child");
        fs::create_dir_all(&nested_dir).unwrap();
        fs::File::create(nested_dir.join("file.md")).unwrap();
        delete(&dir_path).unwrap();
        assert!(!dir_path.exists());
    }

    #[test]
    fn test_delete_nonexistent_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            delete(&tmp.path().join("nope.md")),
            Err(AppError::NotFound(_))
        ));
    }
}
