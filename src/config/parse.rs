//! Task file parsing and discovery

use crate::config::schema::build_registry;
use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::Registry;
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default task file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["trun.yml", "trun.yaml"];

/// Find the task file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    let current_dir = env::current_dir().map_err(|e| ConfigError::Read {
        path: PathBuf::from("."),
        source: e,
    })?;
    find_config_file_from(current_dir)
}

/// Find the task file starting from a specific directory.
///
/// Falls back to the user's global task file when no ancestor has one.
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut searched_paths = Vec::new();

    if let Some(found) = search_ancestors(&start_dir, &mut searched_paths) {
        return Ok(found);
    }

    if let Some(global) = global_config_file() {
        searched_paths.push(global.display().to_string());
        if global.is_file() {
            return Ok(global);
        }
    }

    Err(ConfigError::NotFound(searched_paths.join(", ")))
}

fn search_ancestors(start_dir: &Path, searched_paths: &mut Vec<String>) -> Option<PathBuf> {
    for dir in start_dir.ancestors() {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Some(config_path);
            }
        }
    }
    None
}

/// Location of the user's global task file (e.g. `~/.config/trun/trun.yml`)
pub fn global_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "trun").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAMES[0]))
}

/// Parse a task file from a path.
///
/// The registry remembers the file's directory; tasks run from there.
pub fn parse_config_file(path: &Path) -> ConfigResult<Registry> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_registry(&contents, Some(path))
}

/// Parse a task file's contents into a registry
pub fn parse_registry(yaml: &str, config_path: Option<&Path>) -> ConfigResult<Registry> {
    let config: Config = if yaml.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(yaml)?
    };

    let mut registry = build_registry(config)?;

    if let Some(path) = config_path {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = dir.canonicalize().unwrap_or(dir);
        registry = registry.with_root_dir(dir);
    }

    debug!(tasks = registry.len(), path = ?config_path, "task file parsed");
    Ok(registry)
}

/// Parse the task file with automatic discovery
pub fn parse_config_auto() -> ConfigResult<(Registry, PathBuf)> {
    let config_path = find_config_file()?;
    let registry = parse_config_file(&config_path)?;
    Ok((registry, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
tasks:
  hello:
    usage: Say hello
    run: echo "hello"
"#;
        let registry = parse_registry(yaml, None).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("hello"));
        assert_eq!(registry.root_dir(), None);
    }

    #[test]
    fn test_parse_empty_file() {
        let registry = parse_registry("", None).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = parse_registry("tasks: [unclosed", None);
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("trun.yml");

        fs::write(
            &config_path,
            r#"
tasks:
  test:
    run: echo "test"
"#,
        )
        .unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_yaml_extension() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("trun.yaml");
        fs::write(&config_path, "tasks: {}").unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("trun.yml");
        let sub_dir = temp_dir.path().join("subdir");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(
            &config_path,
            r#"
tasks:
  test:
    run: echo "test"
"#,
        )
        .unwrap();

        let found = find_config_file_from(sub_dir).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_parse_config_file_records_root_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("trun.yml");
        fs::write(&config_path, "tasks:\n  a:\n    run: 'true'\n").unwrap();

        let registry = parse_config_file(&config_path).unwrap();
        assert_eq!(
            registry.root_dir(),
            Some(temp_dir.path().canonicalize().unwrap().as_path())
        );
    }

    #[test]
    fn test_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = parse_config_file(&temp_dir.path().join("missing.yml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_parse_config_with_interpreter() {
        let yaml = r#"
interpreter:
  - bash
  - -c
tasks:
  hello:
    run: echo "hello"
"#;
        let registry = parse_registry(yaml, None).unwrap();
        assert_eq!(registry.interpreter(), &["bash", "-c"]);
    }
}
