use crate::engine::config::StudySettings;
use crate::engine::stage::Stage;
use std::path::PathBuf;

/// One concrete simulation: a (protein, repeat, morph state, stage) cell of
/// the study matrix, with the file layout the equilibration chain expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimJob {
    pub protein: String,
    pub repeat: usize,
    pub state: String,
    pub stage: Stage,
    /// The protein folder holding topologies, structures and repeats.
    pub folder: PathBuf,
}

impl SimJob {
    pub fn new(
        protein: impl Into<String>,
        repeat: usize,
        state: impl Into<String>,
        stage: Stage,
        folder: PathBuf,
    ) -> Self {
        Self {
            protein: protein.into(),
            repeat,
            state: state.into(),
            stage,
            folder,
        }
    }

    /// Directory the stage runs in: `{folder}/repeat{i}/{stage}{state}`.
    pub fn sim_dir(&self) -> PathBuf {
        self.folder
            .join(format!("repeat{}", self.repeat))
            .join(format!("{}{}", self.stage.dir_name(), self.state))
    }

    pub fn topology(&self) -> PathBuf {
        self.folder
            .join(format!("topol_ions{}_{}.top", self.repeat, self.state))
    }

    /// Solvated, ion-neutralized starting structure of the chain.
    pub fn ions_structure(&self) -> PathBuf {
        self.folder
            .join(format!("ions{}_{}.pdb", self.repeat, self.state))
    }

    /// Input coordinates: the ions structure for minimization, the previous
    /// stage's confout.gro afterwards.
    pub fn structure(&self) -> PathBuf {
        match self.stage.prerequisite() {
            None => self.ions_structure(),
            Some(prev) => self.with_stage(prev).confout(),
        }
    }

    /// Position-restraint reference coordinates.
    pub fn posre_reference(&self, settings: &StudySettings) -> PathBuf {
        if let Some(override_path) = &settings.posre_ref_override {
            return override_path.clone();
        }
        if settings.restrain_to_em && self.stage != Stage::Em {
            return self.with_stage(Stage::Em).confout();
        }
        self.ions_structure()
    }

    pub fn mdp(&self, settings: &StudySettings) -> PathBuf {
        settings.mdp_path.join(self.stage.mdp_file())
    }

    pub fn tpr(&self) -> PathBuf {
        self.sim_dir().join("topol.tpr")
    }

    pub fn confout(&self) -> PathBuf {
        self.sim_dir().join("confout.gro")
    }

    /// Batch job name, unique per cell of the study matrix.
    pub fn job_name(&self) -> String {
        format!(
            "fepflow_{}_p{}_{}_{}",
            self.stage.dir_name(),
            self.protein,
            self.repeat,
            self.state
        )
    }

    pub fn cores(&self) -> usize {
        self.stage.default_cores()
    }

    /// A finished stage leaves its confout.gro behind; its presence is the
    /// completion marker, making reruns idempotent.
    pub fn is_complete(&self) -> bool {
        self.confout().exists()
    }

    pub fn prerequisite(&self) -> Option<SimJob> {
        self.stage.prerequisite().map(|prev| self.with_stage(prev))
    }

    fn with_stage(&self, stage: Stage) -> SimJob {
        SimJob {
            stage,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::StudySettings;

    fn settings() -> StudySettings {
        StudySettings::builder()
            .base_path(PathBuf::from("/study"))
            .top_path(PathBuf::from("."))
            .mdp_path(PathBuf::from("/study/mdp"))
            .gmxlib(PathBuf::from("/data/mutff"))
            .mdrun("mdrun".to_string())
            .mdrun_double("mdrun".to_string())
            .mdrun_opts(String::new())
            .parallel_env("smp".to_string())
            .n_repeats(1)
            .states(vec!["A".to_string()])
            .build()
            .unwrap()
    }

    fn job(stage: Stage) -> SimJob {
        SimJob::new("lysozyme", 2, "A", stage, PathBuf::from("/study/lysozyme"))
    }

    #[test]
    fn sim_dir_encodes_repeat_stage_and_state() {
        assert_eq!(
            job(Stage::NvtPosre).sim_dir(),
            PathBuf::from("/study/lysozyme/repeat2/nvt_posreA")
        );
    }

    #[test]
    fn topology_and_ions_paths_encode_repeat_and_state() {
        let j = job(Stage::Em);
        assert_eq!(
            j.topology(),
            PathBuf::from("/study/lysozyme/topol_ions2_A.top")
        );
        assert_eq!(
            j.ions_structure(),
            PathBuf::from("/study/lysozyme/ions2_A.pdb")
        );
    }

    #[test]
    fn minimization_starts_from_the_ions_structure() {
        assert_eq!(job(Stage::Em).structure(), job(Stage::Em).ions_structure());
    }

    #[test]
    fn later_stages_start_from_the_previous_confout() {
        assert_eq!(
            job(Stage::Npt).structure(),
            PathBuf::from("/study/lysozyme/repeat2/nvt_posre_softA/confout.gro")
        );
    }

    #[test]
    fn posre_reference_defaults_to_the_ions_structure() {
        let s = settings();
        assert_eq!(
            job(Stage::NvtPosre).posre_reference(&s),
            job(Stage::Em).ions_structure()
        );
    }

    #[test]
    fn restrain_to_em_points_later_stages_at_the_minimized_structure() {
        let mut s = settings();
        s.restrain_to_em = true;
        assert_eq!(
            job(Stage::NvtPosre).posre_reference(&s),
            PathBuf::from("/study/lysozyme/repeat2/emA/confout.gro")
        );
        // The minimization itself still restrains to the ions structure.
        assert_eq!(
            job(Stage::Em).posre_reference(&s),
            job(Stage::Em).ions_structure()
        );
    }

    #[test]
    fn explicit_override_wins_over_everything() {
        let mut s = settings();
        s.restrain_to_em = true;
        s.posre_ref_override = Some(PathBuf::from("/study/custom_ref.pdb"));
        assert_eq!(
            job(Stage::Npt).posre_reference(&s),
            PathBuf::from("/study/custom_ref.pdb")
        );
    }

    #[test]
    fn job_name_is_unique_per_matrix_cell() {
        assert_eq!(job(Stage::Em).job_name(), "fepflow_em_plysozyme_2_A");
    }

    #[test]
    fn prerequisite_preserves_the_matrix_cell() {
        let prev = job(Stage::Npt).prerequisite().unwrap();
        assert_eq!(prev.stage, Stage::NvtPosreSoft);
        assert_eq!(prev.repeat, 2);
        assert_eq!(prev.state, "A");
        assert!(job(Stage::Em).prerequisite().is_none());
    }
}
