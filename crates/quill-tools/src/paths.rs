//! Path resolution shared by the filesystem tools.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `working_dir` into an absolute, lexically
/// normalized path. Symlinks are left alone.
pub(crate) fn resolve(path: &str, working_dir: &Path) -> PathBuf {
    let path = Path::new(path);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    };
    let absolute = if joined.is_absolute() {
        joined
    } else {
        std::env::current_dir().unwrap_or_default().join(joined)
    };
    normalize(&absolute)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir => out.push(component.as_os_str()),
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::Normal(seg) => out.push(seg),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_join_working_dir() {
        let wd = Path::new("/work/project");
        assert_eq!(resolve("src/main.rs", wd), PathBuf::from("/work/project/src/main.rs"));
        assert_eq!(resolve("./a/../b.txt", wd), PathBuf::from("/work/project/b.txt"));
        assert_eq!(resolve("", wd), PathBuf::from("/work/project"));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let wd = Path::new("/work/project");
        assert_eq!(resolve("/etc/hosts", wd), PathBuf::from("/etc/hosts"));
    }
}
