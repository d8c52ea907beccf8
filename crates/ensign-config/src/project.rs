//! The `.ensime` project config.
//!
//! A `.ensime` file is a single keyed S-expression list, written by hand
//! or by a build-tool plugin, and is passed to the server mostly verbatim
//! when the project is initialised.

use std::fs;
use std::path::{Path, PathBuf};

use ensign_sexp::{key_map, parse, Sexp};
use tracing::debug;

use crate::error::ConfigError;

/// File name of the project config.
pub const CONFIG_FILE: &str = ".ensime";

/// A loaded `.ensime` config.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    path: PathBuf,
    root_dir: PathBuf,
    name: Option<String>,
    items: Vec<Sexp>,
}

impl ProjectConfig {
    /// Walk up from `start` looking for a `.ensime` file.
    pub fn locate(start: &Path) -> Result<PathBuf, ConfigError> {
        let mut dir = Some(start);
        while let Some(d) = dir {
            let candidate = d.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(candidate);
            }
            dir = d.parent();
        }
        Err(ConfigError::NotFound(start.to_path_buf()))
    }

    /// Load and normalise the config at `path`.
    ///
    /// `:root-dir` defaults to the directory holding the file; a relative
    /// `:root-dir` is resolved against that directory. The stored form
    /// always carries the resolved, absolute value.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let value = parse(&text)?;
        let items = match value {
            Sexp::List(items) => items,
            other => {
                return Err(ConfigError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!("expected a keyed list, got {}", other),
                })
            }
        };
        let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let map = key_map(&items);
        let root_dir = match map.get("root-dir").and_then(|v| v.as_str()) {
            Some(dir) => {
                let dir = PathBuf::from(dir);
                if dir.is_absolute() {
                    dir
                } else {
                    base.join(dir)
                }
            }
            None => base,
        };
        let name = map.get("name").and_then(|v| v.as_str()).map(str::to_string);

        let mut items = items;
        set_key(&mut items, "root-dir", Sexp::string(root_dir.to_string_lossy()));
        debug!(path = %path.display(), root_dir = %root_dir.display(), "loaded project config");
        Ok(ProjectConfig {
            path: path.to_path_buf(),
            root_dir,
            name,
            items,
        })
    }

    /// Find and load the config governing `start`.
    pub fn find(start: &Path) -> Result<Self, ConfigError> {
        let path = Self::locate(start)?;
        Self::load(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Module names declared under `:subprojects`.
    pub fn subproject_names(&self) -> Vec<String> {
        let map = key_map(&self.items);
        let mut names = Vec::new();
        if let Some(subs) = map.get("subprojects").and_then(|v| v.as_list()) {
            for sub in subs {
                if let Some(fields) = sub.as_list() {
                    let m = key_map(fields);
                    if let Some(name) = m.get("module-name").and_then(|v| v.as_str()) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names
    }

    /// The argument sent with the project-init request: the config itself,
    /// plus `:active-subproject` when one is chosen.
    pub fn to_init_args(&self, active_subproject: Option<&str>) -> Sexp {
        let mut items = self.items.clone();
        if let Some(name) = active_subproject {
            set_key(&mut items, "active-subproject", Sexp::string(name));
        }
        Sexp::List(items)
    }
}

/// Replace the value following `name`, or append the pair if absent.
fn set_key(items: &mut Vec<Sexp>, name: &str, value: Sexp) {
    let mut i = 0;
    while i + 1 < items.len() {
        if items[i].as_key() == Some(name) {
            items[i + 1] = value;
            return;
        }
        i += 1;
    }
    items.push(Sexp::key(name));
    items.push(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn root_dir_defaults_to_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), "(:name \"demo\")");
        let cfg = ProjectConfig::load(&path).unwrap();
        assert_eq!(cfg.root_dir(), tmp.path());
        assert_eq!(cfg.name(), Some("demo"));
    }

    #[test]
    fn relative_root_dir_resolved() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("proj")).unwrap();
        let path = write_config(tmp.path(), "(:root-dir \"proj\")");
        let cfg = ProjectConfig::load(&path).unwrap();
        assert_eq!(cfg.root_dir(), tmp.path().join("proj"));
    }

    #[test]
    fn comments_tolerated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            ";; generated by hand\n(:name \"demo\" ; project name\n)\n",
        );
        let cfg = ProjectConfig::load(&path).unwrap();
        assert_eq!(cfg.name(), Some("demo"));
    }

    #[test]
    fn subproject_names_listed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            "(:subprojects ((:module-name \"core\") (:module-name \"web\")))",
        );
        let cfg = ProjectConfig::load(&path).unwrap();
        assert_eq!(cfg.subproject_names(), vec!["core", "web"]);
    }

    #[test]
    fn init_args_carry_active_subproject() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), "(:name \"demo\")");
        let cfg = ProjectConfig::load(&path).unwrap();
        let args = cfg.to_init_args(Some("core"));
        let m = key_map(args.as_list().unwrap());
        assert_eq!(m["active-subproject"].as_str(), Some("core"));
        assert!(m.contains_key("root-dir"));
    }

    #[test]
    fn locate_walks_up() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "(:name \"demo\")");
        let nested = tmp.path().join("src").join("main");
        fs::create_dir_all(&nested).unwrap();
        let found = ProjectConfig::locate(&nested).unwrap();
        assert_eq!(found, tmp.path().join(CONFIG_FILE));
    }

    #[test]
    fn locate_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProjectConfig::locate(tmp.path()),
            Err(ConfigError::NotFound(_))
        ));
    }
}
