//! Engine descriptor table.
//!
//! One row per simulation engine. The graph builder reads everything
//! engine-specific from here, so adding an engine is a table edit.

use crate::core::{FanOutMode, ResourceTier};
use crate::errors::ConfigurationError;
use serde::Serialize;

/// Static description of a simulation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineDescriptor {
    /// Identifier used on the command line and in the registry.
    pub id: &'static str,
    /// Label used in stage names and fan-out keys.
    pub label: &'static str,
    /// Tier Calculate stages run on.
    pub tier: ResourceTier,
    /// Configuration key holding the engine image.
    pub image_key: &'static str,
    /// Configuration key holding the engine command line.
    pub run_command_key: &'static str,
    /// How Make reports the fan-out width.
    pub fan_out: FanOutMode,
    /// Calculate input slot receiving one task directory.
    pub task_slot: &'static str,
    /// Calculate output slot holding one task result.
    pub result_slot: &'static str,
}

/// LAMMPS driven by a DeePMD potential.
pub const LAMMPS: EngineDescriptor = EngineDescriptor {
    id: "lammps",
    label: "LAMMPS",
    tier: ResourceTier::Gpu,
    image_key: "dpmd_image_name",
    run_command_key: "lammps_run_command",
    fan_out: FanOutMode::Count,
    task_slot: "input_lammps",
    result_slot: "output_lammps",
};

/// VASP.
pub const VASP: EngineDescriptor = EngineDescriptor {
    id: "vasp",
    label: "VASP",
    tier: ResourceTier::Cpu,
    image_key: "vasp_image_name",
    run_command_key: "vasp_run_command",
    fan_out: FanOutMode::NameList,
    task_slot: "task_path",
    result_slot: "backward_dir",
};

/// ABACUS.
pub const ABACUS: EngineDescriptor = EngineDescriptor {
    id: "abacus",
    label: "ABACUS",
    tier: ResourceTier::Cpu,
    image_key: "abacus_image_name",
    run_command_key: "abacus_run_command",
    fan_out: FanOutMode::Count,
    task_slot: "input_abacus",
    result_slot: "output_abacus",
};

const BUILTIN: [EngineDescriptor; 3] = [LAMMPS, VASP, ABACUS];

impl EngineDescriptor {
    /// Returns the built-in engine table.
    #[must_use]
    pub fn builtin() -> &'static [EngineDescriptor] {
        &BUILTIN
    }

    /// Finds a built-in engine by identifier, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownEngine` if no row matches.
    pub fn find(id: &str) -> Result<Self, ConfigurationError> {
        BUILTIN
            .iter()
            .find(|engine| engine.id.eq_ignore_ascii_case(id))
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownEngine {
                engine: id.to_string(),
            })
    }
}
