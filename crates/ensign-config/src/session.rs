//! Debugger session persistence.
//!
//! Breakpoints and launch configurations survive editor restarts in a
//! small JSON file next to the project config. The file is meant to be
//! hand-editable, so saving an empty config writes a placeholder launch
//! for the user to fill in.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// File name of the session file, relative to the project root.
pub const SESSION_FILE: &str = ".ensime_session";

/// A line breakpoint the user has set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub file_name: String,
    pub line: i64,
}

/// A named way of starting (or attaching to) a debuggee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Launch {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
}

/// How a launch config starts the debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    /// Launch a fresh VM running `command_line`.
    Main { command_line: String },
    /// Attach to a VM already listening at `host:port`.
    Remote { host: String, port: String },
}

impl Launch {
    fn main_class(&self) -> Option<&str> {
        self.main_class.as_deref().filter(|s| !s.is_empty())
    }

    fn remote_address(&self) -> Option<&str> {
        self.remote_address.as_deref().filter(|s| !s.is_empty())
    }

    /// Validate the config and resolve it to a target.
    ///
    /// Exactly one of `main_class` and `remote_address` must be set;
    /// anything else is rejected before the debugger is touched.
    pub fn target(&self) -> Result<LaunchTarget, ConfigError> {
        match (self.main_class(), self.remote_address()) {
            (Some(main), None) => {
                let command_line = match self.args.as_deref().filter(|s| !s.is_empty()) {
                    Some(args) => format!("{} {}", main, args),
                    None => main.to_string(),
                };
                Ok(LaunchTarget::Main { command_line })
            }
            (None, Some(addr)) => match addr.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && !port.is_empty() => {
                    Ok(LaunchTarget::Remote {
                        host: host.to_string(),
                        port: port.to_string(),
                    })
                }
                _ => Err(ConfigError::InvalidLaunch {
                    name: self.name.clone(),
                    reason: format!("remote_address {:?} is not host:port", addr),
                }),
            },
            (Some(_), Some(_)) => Err(ConfigError::InvalidLaunch {
                name: self.name.clone(),
                reason: "both main_class and remote_address are set".to_string(),
            }),
            (None, None) => Err(ConfigError::InvalidLaunch {
                name: self.name.clone(),
                reason: "neither main_class nor remote_address is set".to_string(),
            }),
        }
    }
}

/// Everything the session file holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub breakpoints: Vec<Breakpoint>,
    #[serde(default)]
    pub launch_configs: Vec<Launch>,
    #[serde(default)]
    pub current_launch_config: String,
}

impl SessionData {
    fn file_for(root: &Path) -> PathBuf {
        root.join(SESSION_FILE)
    }

    /// Load the session file under `root`. A missing file is an empty
    /// session, not an error.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::file_for(root);
        if !path.is_file() {
            return Ok(SessionData::default());
        }
        let text = fs::read_to_string(&path)?;
        let data = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "loaded session file");
        Ok(data)
    }

    /// Write the session file under `root`.
    pub fn save(&self, root: &Path) -> Result<(), ConfigError> {
        let path = Self::file_for(root);
        let mut data = self.clone();
        if data.launch_configs.is_empty() {
            data.launch_configs.push(Launch::default());
        }
        let text = serde_json::to_string_pretty(&data)?;
        fs::write(&path, text)?;
        debug!(path = %path.display(), "saved session file");
        Ok(())
    }

    /// The launch config named by `current_launch_config`, falling back
    /// to the first one when no name is set.
    pub fn current_launch(&self) -> Option<&Launch> {
        if self.current_launch_config.is_empty() {
            return self.launch_configs.first();
        }
        self.launch_configs
            .iter()
            .find(|l| l.name == self.current_launch_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_launch() -> Launch {
        Launch {
            name: "run".to_string(),
            main_class: Some("com.example.Main".to_string()),
            args: Some("--fast".to_string()),
            remote_address: None,
        }
    }

    #[test]
    fn main_target_builds_command_line() {
        assert_eq!(
            main_launch().target().unwrap(),
            LaunchTarget::Main {
                command_line: "com.example.Main --fast".to_string()
            }
        );
    }

    #[test]
    fn main_target_without_args() {
        let mut l = main_launch();
        l.args = None;
        assert_eq!(
            l.target().unwrap(),
            LaunchTarget::Main {
                command_line: "com.example.Main".to_string()
            }
        );
    }

    #[test]
    fn remote_target_splits_address() {
        let l = Launch {
            name: "attach".to_string(),
            remote_address: Some("localhost:5005".to_string()),
            ..Launch::default()
        };
        assert_eq!(
            l.target().unwrap(),
            LaunchTarget::Remote {
                host: "localhost".to_string(),
                port: "5005".to_string()
            }
        );
    }

    #[test]
    fn both_set_rejected() {
        let mut l = main_launch();
        l.remote_address = Some("localhost:5005".to_string());
        assert!(matches!(l.target(), Err(ConfigError::InvalidLaunch { .. })));
    }

    #[test]
    fn neither_set_rejected() {
        assert!(matches!(
            Launch::default().target(),
            Err(ConfigError::InvalidLaunch { .. })
        ));
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let l = Launch {
            name: "blank".to_string(),
            main_class: Some(String::new()),
            remote_address: Some("localhost:5005".to_string()),
            ..Launch::default()
        };
        assert!(matches!(l.target(), Ok(LaunchTarget::Remote { .. })));
    }

    #[test]
    fn bad_remote_address_rejected() {
        let l = Launch {
            name: "attach".to_string(),
            remote_address: Some("5005".to_string()),
            ..Launch::default()
        };
        assert!(matches!(l.target(), Err(ConfigError::InvalidLaunch { .. })));
    }

    #[test]
    fn missing_file_is_empty_session() {
        let tmp = tempfile::tempdir().unwrap();
        let data = SessionData::load(tmp.path()).unwrap();
        assert!(data.breakpoints.is_empty());
        assert!(data.launch_configs.is_empty());
    }

    #[test]
    fn save_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let data = SessionData {
            breakpoints: vec![Breakpoint {
                file_name: "A.scala".to_string(),
                line: 12,
            }],
            launch_configs: vec![main_launch()],
            current_launch_config: "run".to_string(),
        };
        data.save(tmp.path()).unwrap();
        let loaded = SessionData::load(tmp.path()).unwrap();
        assert_eq!(loaded.breakpoints, data.breakpoints);
        assert_eq!(loaded.current_launch().map(|l| l.name.as_str()), Some("run"));
    }

    #[test]
    fn save_empty_writes_placeholder_launch() {
        let tmp = tempfile::tempdir().unwrap();
        SessionData::default().save(tmp.path()).unwrap();
        let loaded = SessionData::load(tmp.path()).unwrap();
        assert_eq!(loaded.launch_configs.len(), 1);
        assert!(loaded.launch_configs[0].name.is_empty());
    }

    #[test]
    fn current_launch_falls_back_to_first() {
        let data = SessionData {
            launch_configs: vec![main_launch()],
            ..SessionData::default()
        };
        assert_eq!(data.current_launch().map(|l| l.name.as_str()), Some("run"));
    }
}
