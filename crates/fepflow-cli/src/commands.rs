pub mod analyze;
pub mod equil;
