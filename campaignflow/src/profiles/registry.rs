//! Executor profile registry.

use super::{EngineDescriptor, GlobalConfig};
use crate::core::ResourceTier;
use crate::errors::ConfigurationError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Connection parameters for the remote dispatch backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchConnection {
    /// Batch system type.
    pub batch_type: String,
    /// Context (file transfer) type.
    pub context_type: String,
    /// Remote job type.
    pub job_type: String,
    /// Remote platform.
    pub platform: String,
    /// Remote machine class.
    pub resource_class: String,
    /// Account e-mail.
    pub email: Option<String>,
    /// Account password.
    #[serde(skip)]
    pub password: Option<String>,
    /// Program identifier.
    pub program_id: Option<String>,
}

impl fmt::Debug for DispatchConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchConnection")
            .field("batch_type", &self.batch_type)
            .field("platform", &self.platform)
            .field("resource_class", &self.resource_class)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("program_id", &self.program_id)
            .finish_non_exhaustive()
    }
}

/// How and where a Calculate stage executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutorProfile {
    /// Executor family, e.g. `dispatcher`.
    pub backend_kind: String,
    /// Resource tier.
    pub tier: ResourceTier,
    /// Compute image reference.
    pub compute_image: String,
    /// Image pull policy.
    pub image_pull_policy: String,
    /// Engine command line, if configured.
    pub run_command: Option<String>,
    /// Remote dispatch parameters.
    pub dispatch: DispatchConnection,
}

/// Read-only map from `(engine, tier)` to a shared executor profile.
///
/// Built once at start-up. Profiles are handed out as `Arc`s so every
/// Calculate stage on the same tier points at the same value.
#[derive(Debug, Clone, Default)]
pub struct ExecutorProfileRegistry {
    profiles: HashMap<(String, ResourceTier), Arc<ExecutorProfile>>,
    helper_image: Option<String>,
}

impl ExecutorProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a profile.
    #[must_use]
    pub fn with_profile(
        mut self,
        engine: impl Into<String>,
        tier: ResourceTier,
        profile: ExecutorProfile,
    ) -> Self {
        self.profiles
            .insert((engine.into().to_ascii_lowercase(), tier), Arc::new(profile));
        self
    }

    /// Sets the helper image used by Make and Post stages.
    #[must_use]
    pub fn with_helper_image(mut self, image: impl Into<String>) -> Self {
        self.helper_image = Some(image.into());
        self
    }

    /// Builds the registry from configuration.
    ///
    /// Registers one profile per engine and per tier whose machine class is
    /// configured. Engines without an image are left out and surface later
    /// as `UnknownProfile`.
    #[must_use]
    pub fn from_config(config: &GlobalConfig, engines: &[EngineDescriptor]) -> Self {
        let mut registry = Self::new();
        registry.helper_image = config.dpgen_image_name.clone();

        let tiers = [
            (ResourceTier::Cpu, config.cpu_scass_type.as_deref()),
            (ResourceTier::Gpu, config.gpu_scass_type.as_deref()),
        ];

        for engine in engines {
            let Some(image) = config.lookup(engine.image_key) else {
                debug!(engine = engine.id, key = engine.image_key, "No image configured");
                continue;
            };

            for (tier, resource_class) in tiers {
                let Some(resource_class) = resource_class else {
                    continue;
                };
                let profile = ExecutorProfile {
                    backend_kind: "dispatcher".to_string(),
                    tier,
                    compute_image: image.to_string(),
                    image_pull_policy: config.image_pull_policy.clone(),
                    run_command: config.lookup(engine.run_command_key).map(str::to_string),
                    dispatch: DispatchConnection {
                        batch_type: "Bohrium".to_string(),
                        context_type: "Bohrium".to_string(),
                        job_type: "container".to_string(),
                        platform: config.platform.clone(),
                        resource_class: resource_class.to_string(),
                        email: config.email.clone(),
                        password: config.password.clone(),
                        program_id: config.program_id(),
                    },
                };
                registry
                    .profiles
                    .insert((engine.id.to_string(), tier), Arc::new(profile));
            }
        }

        info!(profiles = registry.len(), "Executor profiles registered");
        registry
    }

    /// Resolves the profile for an engine and tier.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownProfile` if nothing is registered.
    pub fn resolve(
        &self,
        engine: &str,
        tier: ResourceTier,
    ) -> Result<Arc<ExecutorProfile>, ConfigurationError> {
        self.profiles
            .get(&(engine.to_ascii_lowercase(), tier))
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownProfile {
                engine: engine.to_string(),
                tier,
            })
    }

    /// Returns the helper image for Make and Post stages.
    #[must_use]
    pub fn helper_image(&self) -> Option<&str> {
        self.helper_image.as_deref()
    }

    /// Returns the number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if no profile is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{ABACUS, LAMMPS, VASP};
    use crate::testing::sample_config;

    #[test]
    fn test_from_config_registers_configured_engines() {
        let registry = ExecutorProfileRegistry::from_config(&sample_config(), &[LAMMPS, VASP]);

        let lammps = registry.resolve("lammps", ResourceTier::Gpu).unwrap();
        assert_eq!(lammps.compute_image, "deepmd:2.2");
        assert_eq!(lammps.dispatch.resource_class, "gpu-class");
        assert_eq!(lammps.run_command.as_deref(), Some("lmp -i in.lammps"));

        let vasp = registry.resolve("VASP", ResourceTier::Cpu).unwrap();
        assert_eq!(vasp.dispatch.resource_class, "cpu-class");
        assert_eq!(registry.helper_image(), Some("dpgen:latest"));
    }

    #[test]
    fn test_missing_image_is_unknown_profile() {
        let mut config = sample_config();
        config.abacus_image_name = None;
        let registry = ExecutorProfileRegistry::from_config(&config, &[ABACUS]);

        let err = registry.resolve("abacus", ResourceTier::Cpu).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownProfile { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_shares_profile() {
        let registry = ExecutorProfileRegistry::from_config(&sample_config(), &[LAMMPS]);
        let a = registry.resolve("lammps", ResourceTier::Gpu).unwrap();
        let b = registry.resolve("lammps", ResourceTier::Gpu).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concurrent_reads() {
        let registry = Arc::new(ExecutorProfileRegistry::from_config(&sample_config(), &[LAMMPS]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve("lammps", ResourceTier::Gpu).is_ok())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let registry = ExecutorProfileRegistry::from_config(&sample_config(), &[LAMMPS]);
        let profile = registry.resolve("lammps", ResourceTier::Gpu).unwrap();
        assert!(!format!("{profile:?}").contains("secret"));
    }
}
