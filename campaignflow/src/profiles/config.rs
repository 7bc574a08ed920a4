//! Global configuration source.

use crate::driver::DriverConfig;
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

fn default_platform() -> String {
    "ali".to_string()
}

fn default_image_pull_policy() -> String {
    "IfNotPresent".to_string()
}

/// Key-value configuration read once at process start.
///
/// Every engine-specific key is optional here; whether a key is required
/// is decided when a profile or graph actually needs it.
#[derive(Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Working directory handed to the first Make stage.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    /// Dispatch account e-mail.
    #[serde(default)]
    pub email: Option<String>,
    /// Dispatch account password.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Dispatch program identifier.
    #[serde(default)]
    pub program_id: Option<serde_json::Value>,
    /// Helper image running Make and Post stages.
    #[serde(default)]
    pub dpgen_image_name: Option<String>,
    /// VASP engine image.
    #[serde(default)]
    pub vasp_image_name: Option<String>,
    /// LAMMPS/DeePMD engine image.
    #[serde(default)]
    pub dpmd_image_name: Option<String>,
    /// ABACUS engine image.
    #[serde(default)]
    pub abacus_image_name: Option<String>,
    /// Remote machine class for CPU work.
    #[serde(default)]
    pub cpu_scass_type: Option<String>,
    /// Remote machine class for GPU work.
    #[serde(default)]
    pub gpu_scass_type: Option<String>,
    /// LAMMPS command line.
    #[serde(default)]
    pub lammps_run_command: Option<String>,
    /// VASP command line.
    #[serde(default)]
    pub vasp_run_command: Option<String>,
    /// ABACUS command line.
    #[serde(default)]
    pub abacus_run_command: Option<String>,
    /// Extra packages shipped into Calculate containers.
    #[serde(default)]
    pub upload_python_packages: Vec<String>,
    /// Remote platform name.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Container image pull policy.
    #[serde(default = "default_image_pull_policy")]
    pub image_pull_policy: String,
    /// Driver polling settings.
    #[serde(default)]
    pub driver: DriverConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            email: None,
            password: None,
            program_id: None,
            dpgen_image_name: None,
            vasp_image_name: None,
            dpmd_image_name: None,
            abacus_image_name: None,
            cpu_scass_type: None,
            gpu_scass_type: None,
            lammps_run_command: None,
            vasp_run_command: None,
            abacus_run_command: None,
            upload_python_packages: Vec::new(),
            platform: default_platform(),
            image_pull_policy: default_image_pull_policy(),
            driver: DriverConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Load` if the file cannot be read or parsed,
    /// and `ConfigurationError::Invalid` if the driver settings are out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config = Self::from_json_str(&raw).map_err(|e| match e {
            ConfigurationError::Load { reason, .. } => ConfigurationError::Load {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses the configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or the driver settings are out of range.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| ConfigurationError::Load {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        config.driver.validate()?;
        Ok(config)
    }

    /// Looks up a string-valued key by its configuration name.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let value = match key {
            "email" => &self.email,
            "password" => &self.password,
            "dpgen_image_name" => &self.dpgen_image_name,
            "vasp_image_name" => &self.vasp_image_name,
            "dpmd_image_name" => &self.dpmd_image_name,
            "abacus_image_name" => &self.abacus_image_name,
            "cpu_scass_type" => &self.cpu_scass_type,
            "gpu_scass_type" => &self.gpu_scass_type,
            "lammps_run_command" => &self.lammps_run_command,
            "vasp_run_command" => &self.vasp_run_command,
            "abacus_run_command" => &self.abacus_run_command,
            _ => return None,
        };
        value.as_deref()
    }

    /// Returns the program identifier rendered as a string.
    #[must_use]
    pub fn program_id(&self) -> Option<String> {
        self.program_id.as_ref().map(|id| match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

impl fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("work_dir", &self.work_dir)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("program_id", &self.program_id)
            .field("dpgen_image_name", &self.dpgen_image_name)
            .field("platform", &self.platform)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE: &str = r#"{
        "email": "user@example.com",
        "password": "hunter2",
        "program_id": 1234,
        "dpgen_image_name": "dpgen:latest",
        "dpmd_image_name": "deepmd:2.2",
        "cpu_scass_type": "c8_m32_cpu",
        "gpu_scass_type": "c8_m32_1 * NVIDIA V100",
        "lammps_run_command": "lmp -in in.lammps"
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = GlobalConfig::from_json_str(SAMPLE).unwrap();

        assert_eq!(config.platform, "ali");
        assert_eq!(config.image_pull_policy, "IfNotPresent");
        assert_eq!(config.program_id(), Some("1234".to_string()));
        assert_eq!(config.lookup("dpmd_image_name"), Some("deepmd:2.2"));
        assert_eq!(config.lookup("vasp_image_name"), None);
        assert_eq!(config.lookup("unknown_key"), None);
        assert_eq!(config.driver.poll_interval(), Duration::from_secs(4));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = GlobalConfig::from_json_str(SAMPLE).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_password_not_serialized() {
        let config = GlobalConfig::from_json_str(SAMPLE).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = GlobalConfig::load(file.path()).unwrap();
        assert_eq!(config.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GlobalConfig::load("/no/such/global.json").unwrap_err();
        assert!(matches!(err, ConfigurationError::Load { .. }));
    }

    #[test]
    fn test_invalid_driver_settings() {
        let err = GlobalConfig::from_json_str(r#"{"driver": {"poll_interval_seconds": -1.0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { .. }));
    }
}
