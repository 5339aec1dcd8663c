//! Configuration management for lanwatch services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`LANWATCH__<SECTION>__<KEY>`)
//! 2. Config file (`lanwatch.toml` by default)
//! 3. Defaults

use serde::de::DeserializeOwned;

use crate::error::LanwatchError;

/// Default config file name, without extension.
pub const DEFAULT_FILE_PREFIX: &str = "lanwatch";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "LANWATCH";

/// Keys whose environment values are comma-separated lists.
const LIST_KEYS: &[&str] = &["server.cors_origins"];

/// Load one `[section]` of the layered configuration.
///
/// A missing file or a missing section yields `T::default()`. A section that
/// is present but malformed is an error.
pub fn load_section<T>(file_prefix: &str, section: &str) -> Result<T, LanwatchError>
where
    T: DeserializeOwned + Default,
{
    let mut env = config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .try_parsing(true);
    for key in LIST_KEYS {
        env = env.with_list_parse_key(key);
    }

    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(env)
        .build()
        .map_err(|e| LanwatchError::Config(e.to_string()))?;

    match cfg.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section not found, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(LanwatchError::Config(format!("[{section}]: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default = "default_workers")]
        workers: usize,
        #[serde(default)]
        label: Option<String>,
    }

    fn default_workers() -> usize {
        7
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                workers: default_workers(),
                label: None,
            }
        }
    }

    fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("lanwatch.toml");
        std::fs::write(&path, body).unwrap();
        dir.path().join("lanwatch").to_string_lossy().into_owned()
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent").to_string_lossy().into_owned();
        let sample: Sample = load_section(&prefix, "sample").unwrap();
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn test_section_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = write_config(&dir, "[sample]\nworkers = 3\nlabel = \"lab\"\n");
        let sample: Sample = load_section(&prefix, "sample").unwrap();
        assert_eq!(sample.workers, 3);
        assert_eq!(sample.label.as_deref(), Some("lab"));
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = write_config(&dir, "[other]\nworkers = 3\n");
        let sample: Sample = load_section(&prefix, "sample").unwrap();
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = write_config(&dir, "[sample]\nlabel = \"x\"\n");
        let sample: Sample = load_section(&prefix, "sample").unwrap();
        assert_eq!(sample.workers, 7);
    }

    #[test]
    fn test_malformed_section_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = write_config(&dir, "[sample]\nworkers = \"many\"\n");
        let result: Result<Sample, _> = load_section(&prefix, "sample");
        assert!(matches!(result, Err(LanwatchError::Config(_))));
    }
}
