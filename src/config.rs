use crate::dictation::TextCorrector;
use crate::dispatch::DispatchSettings;
use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::vocabulary::VocabularyConfig;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

/// Get the config directory using platform-appropriate location.
///
/// - macOS: `~/Library/Application Support/voicecommander/`
/// - Linux: `~/.config/voicecommander/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/voicecommander/`
///
/// Falls back to `~/.voicecommander/` if the platform dir is unavailable.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("voicecommander"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".voicecommander")
        })
}

/// Load a JSON file, returning Default if missing or corrupt.
/// Logs a warning when the file exists but cannot be read or parsed, so a
/// broken file is visible instead of silently resetting settings.
pub fn load_json_file<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Could not read config {}: {e}", path.display());
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Corrupt config {}: {e}. Using defaults.", path.display());
            T::default()
        }
    }
}

/// Save a JSON file atomically (temp file + rename).
/// Sets 0600 permissions on Unix.
pub fn save_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let io_err = |e: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE.to_string());
    let temp = path.with_file_name(format!("{file_name}.tmp.{}", std::process::id()));
    std::fs::write(&temp, json).map_err(io_err)?;

    // Owner read/write only, set before the rename
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
    }

    // Either the old file or the new one exists, never a partial write
    std::fs::rename(&temp, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        io_err(e)
    })
}

/// Load `filename` from the config directory.
pub fn load_json_config<T: DeserializeOwned + Default>(filename: &str) -> T {
    load_json_file(&config_dir().join(filename))
}

/// Save `filename` into the config directory.
pub fn save_json_config<T: Serialize>(filename: &str, value: &T) -> Result<(), ConfigError> {
    save_json_file(&config_dir().join(filename), value)
}

fn default_pace_ms() -> u64 {
    DispatchSettings::default().pace_ms
}

fn default_max_repeat() -> u32 {
    DispatchSettings::default().max_repeat
}

fn default_max_sequence() -> usize {
    DispatchSettings::default().max_sequence
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

/// Settings in `<config_dir>/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommanderConfig {
    /// Pause after each sequence command, in milliseconds
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    /// Largest "repeat <n> times" accepted
    #[serde(default = "default_max_repeat")]
    pub max_repeat: u32,
    /// Most atomic commands per utterance
    #[serde(default = "default_max_sequence")]
    pub max_sequence: usize,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Whole-word replacements applied to dictated text
    #[serde(default)]
    pub corrections: HashMap<String, String>,
    /// Vocabulary file replacing the built-in command tables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<PathBuf>,
}

impl Default for CommanderConfig {
    fn default() -> Self {
        Self {
            pace_ms: default_pace_ms(),
            max_repeat: default_max_repeat(),
            max_sequence: default_max_sequence(),
            history_capacity: default_history_capacity(),
            corrections: HashMap::new(),
            vocabulary: None,
        }
    }
}

impl CommanderConfig {
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            pace_ms: self.pace_ms,
            max_repeat: self.max_repeat,
            max_sequence: self.max_sequence,
        }
    }

    pub fn corrector(&self) -> TextCorrector {
        TextCorrector::from_map(self.corrections.clone())
    }
}

pub fn load_commander_config() -> CommanderConfig {
    load_json_config(CONFIG_FILE)
}

pub fn save_commander_config(config: &CommanderConfig) -> Result<(), ConfigError> {
    save_json_config(CONFIG_FILE, config)
}

/// Load a vocabulary file. Unlike the settings file, a missing or broken
/// vocabulary is an error.
pub fn load_vocabulary(path: &Path) -> Result<VocabularyConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn commander_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let cfg = CommanderConfig {
            pace_ms: 20,
            max_repeat: 50,
            max_sequence: 3,
            history_capacity: 10,
            corrections: HashMap::from([("get hub".to_string(), "github".to_string())]),
            vocabulary: Some(PathBuf::from("/tmp/vocabulary.json")),
        };
        save_json_file(&path, &cfg).unwrap();
        let loaded: CommanderConfig = load_json_file(&path);
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.dispatch_settings().max_sequence, 3);
        assert_eq!(loaded.corrector().correct("open get hub"), "open github");
    }

    #[test]
    fn serde_default_for_missing_fields() {
        let cfg: CommanderConfig = serde_json::from_str(r#"{"pace_ms": 10}"#).unwrap();
        assert_eq!(cfg.pace_ms, 10);
        assert_eq!(cfg.max_repeat, 100);
        assert_eq!(cfg.max_sequence, 5);
        assert_eq!(cfg.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert!(cfg.corrections.is_empty());
        assert!(cfg.vocabulary.is_none());
    }

    #[test]
    fn missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let cfg: CommanderConfig = load_json_file(&dir.path().join("nonexistent.json"));
        assert_eq!(cfg, CommanderConfig::default());
    }

    #[test]
    fn corrupt_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();
        let cfg: CommanderConfig = load_json_file(&path);
        assert_eq!(cfg, CommanderConfig::default());
    }

    #[test]
    fn save_is_atomic_and_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        save_json_file(&path, &CommanderConfig::default()).unwrap();
        let updated = CommanderConfig {
            pace_ms: 75,
            ..CommanderConfig::default()
        };
        save_json_file(&path, &updated).unwrap();
        let loaded: CommanderConfig = load_json_file(&path);
        assert_eq!(loaded.pace_ms, 75);

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        save_json_file(&path, &CommanderConfig::default()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn vocabulary_file_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocabulary.json");
        fs::write(
            &path,
            r#"{
                "root": {
                    "name": "Global",
                    "action_map": {"save": {"type": "key", "spec": "c-s"}}
                },
                "final": {
                    "action_map": {"go code": {"type": "key", "spec": "win:down, 2:1/10, win:up"}}
                }
            }"#,
        )
        .unwrap();
        let vocabulary = load_vocabulary(&path).unwrap();
        assert_eq!(vocabulary.root.name, "Global");
        assert!(vocabulary.nested.action_map.is_empty());
        assert_eq!(vocabulary.final_rule().unwrap().len(), 1);
    }

    #[test]
    fn broken_vocabulary_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_vocabulary(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, r#"{"root": {"name": 3}}"#).unwrap();
        assert!(matches!(load_vocabulary(&broken), Err(ConfigError::Parse { .. })));
    }
}
