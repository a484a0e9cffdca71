use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scom::FailurePolicy;

const DEFAULT_CONFIG_PATH: &str = "/etc/ocapi-triage/config.toml";
const CONFIG_PATH_ENV: &str = "OCAPI_TRIAGE_CONFIG";

const DEFAULT_DEBUGFS_ROOT: &str = "/sys/kernel/debug/powerpc/scom";
const DEFAULT_VENDOR_CLIENT_LIB: &str = "libecmd_c.so";
const DEFAULT_VENDOR_DLL_ENV: &str = "ECMD_DLL_FILE";
const DEFAULT_VENDOR_DLL_VERSIONS: &str = "ver13,ver14";
const DEFAULT_LOG_SCRIPT: &str = "./log_triage.bash";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Runtime configuration shared by both binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// Directory holding one sub-directory per chip
    pub debugfs_root: PathBuf,
    /// eCMD client library exporting the C entry points
    pub vendor_client_lib: PathBuf,
    /// Environment variable naming the vendor driver file
    pub vendor_dll_env: String,
    /// Interface versions requested when loading the vendor driver
    pub vendor_dll_versions: String,
    /// Script run after a triage pass over the direct backend
    pub log_script: PathBuf,
    /// Overrides the per-backend default failure policy
    pub on_access_failure: Option<FailurePolicy>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debugfs_root: PathBuf::from(DEFAULT_DEBUGFS_ROOT),
            vendor_client_lib: PathBuf::from(DEFAULT_VENDOR_CLIENT_LIB),
            vendor_dll_env: DEFAULT_VENDOR_DLL_ENV.into(),
            vendor_dll_versions: DEFAULT_VENDOR_DLL_VERSIONS.into(),
            log_script: PathBuf::from(DEFAULT_LOG_SCRIPT),
            on_access_failure: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the configuration from `OCAPI_TRIAGE_CONFIG` or the default path.
    ///
    /// A missing default file is not an error; a missing file named by the
    /// environment is.
    pub fn load_default() -> Result<Config, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::load_from_path(path);
        }
        if !Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Ok(Config::default());
        }
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Loads the configuration from the specified path.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub(crate) fn parse(content: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ConfigLoader::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.vendor_dll_env, "ECMD_DLL_FILE");
        assert_eq!(
            config.debugfs_root,
            PathBuf::from("/sys/kernel/debug/powerpc/scom")
        );
    }

    #[test]
    fn partial_override() {
        let config = ConfigLoader::parse(
            r#"
            debugfs_root = "/tmp/scom"
            on_access_failure = "log-and-continue"
            "#,
        )
        .unwrap();
        assert_eq!(config.debugfs_root, PathBuf::from("/tmp/scom"));
        assert_eq!(config.on_access_failure, Some(FailurePolicy::LogAndContinue));
        assert_eq!(config.log_script, PathBuf::from("./log_triage.bash"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = ConfigLoader::parse(r#"on_access_failure = "retry""#);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
