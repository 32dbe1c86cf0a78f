pub mod io;
pub mod units;
pub mod work;
