//! # Ambiance Configuration Module
//!
//! This module provides configuration management for Ambiance, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use ambconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let dwell = config.get_dwell_ms()?;
//! let videos = config.get_leading_videos()?;
//!
//! // Update configuration values
//! config.set_dwell_ms(5000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{info, warn};

// Built-in default configuration
const DEFAULT_CONFIG: &str = include_str!("ambiance.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> = Arc::new(Config::load_or_defaults());
}

const ENV_CONFIG_DIR: &str = "AMBIANCE_CONFIG";
const ENV_PREFIX: &str = "AMBIANCE_CONFIG__";

// Default values for configuration
const DEFAULT_CROSSFADE_MS: u64 = 1000;
const DEFAULT_DWELL_MS: u64 = 7000;
const DEFAULT_MAX_RETRIES: u64 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_IMAGE_PATTERN: &str = "/assets/images/{n}.jpg";
const DEFAULT_IMAGE_FIRST: u64 = 1;
const DEFAULT_IMAGE_COUNT: u64 = 167;
const DEFAULT_MUSIC_SOURCE: &str = "/assets/gta-vc-style.mp3";
const DEFAULT_MUSIC_VOLUME: f64 = 0.3;
const DEFAULT_HEADLESS_VIDEO_MS: u64 = 15000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate getter/setter for u64 values with default
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<u64> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.is_empty() => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Configuration manager for Ambiance
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters/setters for configuration values
///
/// A `Config` built with [`Config::from_defaults`] has no backing file and
/// never writes to disk.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

// Manual Clone implementation
impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self
            .data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".ambiance").exists() {
            return ".ambiance".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".ambiance");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".ambiance".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        // Create if doesn't exist
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        // Verify it's a directory
        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `AMBIANCE_CONFIG` environment variable
    /// 3. `.ambiance` in the current directory
    /// 4. `.ambiance` in the user's home directory
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&config_dir))?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        // Try to load the configuration file
        match fs::read(&path) {
            Ok(data) => {
                info!(config_file=%path, "Loaded config file");
                let external_value: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut default_value, &external_value);
            }
            Err(_) => {
                info!(config_file=%path, "Config file not found, using default embedded config");
            }
        }

        let mut config_value = Self::lower_keys_value(default_value);
        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Builds an in-memory configuration from the embedded defaults and the
    /// environment overrides, without touching the filesystem.
    pub fn from_defaults() -> Result<Self> {
        let default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        let mut config_value = Self::lower_keys_value(default_value);
        Self::apply_env_overrides(&mut config_value);

        Ok(Config {
            config_dir: String::new(),
            path: String::new(),
            data: Mutex::new(config_value),
        })
    }

    fn load_or_defaults() -> Self {
        match Self::load_config("") {
            Ok(config) => config,
            Err(err) => {
                warn!(error=%err, "Cannot load configuration directory, using embedded defaults");
                // Embedded defaults always parse
                Self::from_defaults().unwrap_or_else(|_| Config {
                    config_dir: String::new(),
                    path: String::new(),
                    data: Mutex::new(Value::Mapping(Mapping::new())),
                })
            }
        }
    }

    /// Returns the directory holding `config.yaml`, empty for in-memory configs.
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        if self.path.is_empty() {
            return Ok(());
        }
        let yaml = {
            let data = self.lock()?;
            serde_yaml::to_string(&*data)?
        };
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["backdrop", "dwell_ms"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock()?;
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key.clone());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock()?;
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                let key_path = key
                    .trim_start_matches(ENV_PREFIX)
                    .split("__")
                    .collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        let new_key = Value::String(s.to_lowercase());
                        let new_val = Self::lower_keys_value(v);
                        new_map.insert(new_key, new_val);
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    fn get_string_list(&self, path: &[&str]) -> Result<Vec<String>> {
        match self.get_value(path) {
            Ok(Value::Sequence(items)) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s),
                    other => {
                        warn!(path=%path.join("."), value=?other, "Ignoring non-string list entry");
                        None
                    }
                })
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// Returns the video sources played first, in order, before the images.
    pub fn get_leading_videos(&self) -> Result<Vec<String>> {
        self.get_string_list(&["backdrop", "leading_videos"])
    }

    /// Replaces the leading video list.
    pub fn set_leading_videos(&self, videos: Vec<String>) -> Result<()> {
        let seq = videos.into_iter().map(Value::String).collect();
        self.set_value(&["backdrop", "leading_videos"], Value::Sequence(seq))
    }

    /// Returns the image catalog.
    ///
    /// An explicit `backdrop.images.catalog` list wins. When it is empty the
    /// catalog is generated by substituting `{n}` in `backdrop.images.pattern`
    /// for every number in `first..first + count`.
    pub fn get_image_catalog(&self) -> Result<Vec<String>> {
        let explicit = self.get_string_list(&["backdrop", "images", "catalog"])?;
        if !explicit.is_empty() {
            return Ok(explicit);
        }

        let pattern = self.get_image_pattern()?;
        let first = self.get_image_first()?;
        let count = self.get_image_count()?;
        Ok(numbered_catalog(&pattern, first, count))
    }

    /// Replaces the explicit image catalog.
    pub fn set_image_catalog(&self, images: Vec<String>) -> Result<()> {
        let seq = images.into_iter().map(Value::String).collect();
        self.set_value(&["backdrop", "images", "catalog"], Value::Sequence(seq))
    }

    impl_string_config!(
        get_image_pattern,
        set_image_pattern,
        &["backdrop", "images", "pattern"],
        DEFAULT_IMAGE_PATTERN
    );

    impl_u64_config!(
        get_image_first,
        set_image_first,
        &["backdrop", "images", "first"],
        DEFAULT_IMAGE_FIRST
    );

    impl_u64_config!(
        get_image_count,
        set_image_count,
        &["backdrop", "images", "count"],
        DEFAULT_IMAGE_COUNT
    );

    impl_u64_config!(
        get_crossfade_ms,
        set_crossfade_ms,
        &["backdrop", "crossfade_ms"],
        DEFAULT_CROSSFADE_MS
    );

    impl_u64_config!(
        get_dwell_ms,
        set_dwell_ms,
        &["backdrop", "dwell_ms"],
        DEFAULT_DWELL_MS
    );

    impl_u64_config!(
        get_max_retries,
        set_max_retries,
        &["backdrop", "playback", "max_retries"],
        DEFAULT_MAX_RETRIES
    );

    impl_u64_config!(
        get_retry_delay_ms,
        set_retry_delay_ms,
        &["backdrop", "playback", "retry_delay_ms"],
        DEFAULT_RETRY_DELAY_MS
    );

    /// Returns the seed used for the image shuffle, if one is pinned.
    pub fn get_shuffle_seed(&self) -> Result<Option<u64>> {
        match self.get_value(&["backdrop", "shuffle_seed"]) {
            Ok(Value::Number(n)) => Ok(n.as_u64()),
            _ => Ok(None),
        }
    }

    /// Pins (or clears) the shuffle seed.
    pub fn set_shuffle_seed(&self, seed: Option<u64>) -> Result<()> {
        let value = match seed {
            Some(seed) => Value::Number(Number::from(seed)),
            None => Value::Null,
        };
        self.set_value(&["backdrop", "shuffle_seed"], value)
    }

    impl_string_config!(
        get_music_source,
        set_music_source,
        &["music", "source"],
        DEFAULT_MUSIC_SOURCE
    );

    /// Returns the music volume, clamped to `0.0..=1.0`.
    pub fn get_music_volume(&self) -> Result<f64> {
        let volume = match self.get_value(&["music", "volume"]) {
            Ok(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_MUSIC_VOLUME),
            _ => DEFAULT_MUSIC_VOLUME,
        };
        Ok(volume.clamp(0.0, 1.0))
    }

    pub fn set_music_volume(&self, volume: f64) -> Result<()> {
        self.set_value(&["music", "volume"], Value::Number(Number::from(volume)))
    }

    impl_u64_config!(
        get_headless_video_duration_ms,
        set_headless_video_duration_ms,
        &["headless", "video_duration_ms"],
        DEFAULT_HEADLESS_VIDEO_MS
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );
}

/// Returns the global configuration instance
///
/// This function provides access to the singleton configuration instance,
/// which is lazily loaded on first access. When the configuration directory
/// cannot be used, the embedded defaults are served instead.
///
/// # Examples
///
/// ```no_run
/// use ambconfig::get_config;
///
/// let config = get_config();
/// let crossfade = config.get_crossfade_ms()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Expands a numbered path pattern (`{n}` placeholder) into a catalog.
pub fn numbered_catalog(pattern: &str, first: u64, count: u64) -> Vec<String> {
    (first..first.saturating_add(count))
        .map(|n| pattern.replace("{n}", &n.to_string()))
        .collect()
}

/// Merges external YAML configuration into default configuration
///
/// This function recursively merges two YAML value trees:
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // scalars and sequences are replaced
    }
}
