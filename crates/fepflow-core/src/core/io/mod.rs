pub mod integ;
pub mod xvg;
