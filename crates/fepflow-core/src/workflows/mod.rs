pub mod analyze;
pub mod equil;
pub mod report;
