use std::fmt;

/// One stage of the equilibration chain, in execution order. Every repeat
/// and morph state runs the full chain before its transition simulations
/// can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Energy minimization with position restraints.
    Em,
    /// NVT equilibration, heavy atoms restrained.
    NvtPosre,
    /// NVT equilibration with softened restraints.
    NvtPosreSoft,
    /// Unrestrained NPT equilibration.
    Npt,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Em,
        Stage::NvtPosre,
        Stage::NvtPosreSoft,
        Stage::Npt,
    ];

    /// Directory name of the stage inside a repeat folder (the morph state
    /// suffix is appended by the job).
    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::Em => "em",
            Stage::NvtPosre => "nvt_posre",
            Stage::NvtPosreSoft => "nvt_posre_soft",
            Stage::Npt => "npt",
        }
    }

    /// The mdp parameter file of the stage, relative to the mdp root.
    pub fn mdp_file(&self) -> &'static str {
        match self {
            Stage::Em => "apo_protein/em_posre.mdp",
            Stage::NvtPosre => "apo_protein/eq_nvt_posre.mdp",
            Stage::NvtPosreSoft => "apo_protein/eq_nvt_posre_soft.mdp",
            Stage::Npt => "apo_protein/eq_npt.mdp",
        }
    }

    /// Cores requested from the batch scheduler. Minimization is cheap.
    pub fn default_cores(&self) -> usize {
        match self {
            Stage::Em => 2,
            _ => 4,
        }
    }

    pub fn prerequisite(&self) -> Option<Stage> {
        match self {
            Stage::Em => None,
            Stage::NvtPosre => Some(Stage::Em),
            Stage::NvtPosreSoft => Some(Stage::NvtPosre),
            Stage::Npt => Some(Stage::NvtPosreSoft),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
