//! # fepflow Core Library
//!
//! A workflow engine for GROMACS absolute free energy studies. It drives the
//! staged equilibration chain (energy minimization, restrained NVT, soft
//! restrained NVT, NPT) for every repeat and morph state of a study, either
//! locally or through an SGE batch queue, and analyzes the resulting
//! fast-growth thermodynamic integration output with the Crooks Gaussian
//! Intersection, Bennett Acceptance Ratio, and Jarzynski estimators.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers with a strict dependency direction.
//!
//! - **[`core`]: The Foundation.** Stateless data types (work sets, energy
//!   units) and the I/O routines for `dgdl.xvg` and integrated-work files.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer: study settings,
//!   simulation stages and their file layout, GROMACS invocation assembly,
//!   and the local/SGE job runners.
//!
//! - **[`workflows`]: The Public API.** Ties the engine and core together
//!   into complete procedures: the equilibration pipeline ([`workflows::equil`])
//!   and the free-energy analysis ([`workflows::analyze`]).

pub mod core;
pub mod engine;
pub mod estimators;
pub mod workflows;
