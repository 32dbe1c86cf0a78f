use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Boltzmann constant in kJ/(K*mol), matching the value GROMACS reports in.
pub const KB: f64 = 0.008_314_472_15;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown energy unit '{0}'; expected one of 'kJ', 'kcal', 'kT'")]
pub struct ParseUnitError(pub String);

/// Output unit for free energy results. Input work values are always kJ/mol,
/// as produced by GROMACS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    KiloJoule,
    KiloCalorie,
    Kt,
}

impl Unit {
    /// Conversion factor applied to a kJ/mol value at the given temperature.
    pub fn factor(&self, temperature: f64) -> f64 {
        match self {
            Unit::KiloJoule => 1.0,
            Unit::KiloCalorie => 1.0 / 4.184,
            Unit::Kt => 1.0 / (KB * temperature),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Unit::KiloJoule => "kJ/mol",
            Unit::KiloCalorie => "kcal/mol",
            Unit::Kt => "kT",
        }
    }
}

impl FromStr for Unit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kj" => Ok(Unit::KiloJoule),
            "kcal" => Ok(Unit::KiloCalorie),
            "kt" => Ok(Unit::Kt),
            other => Err(ParseUnitError(other.to_string())),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kilojoule_factor_is_identity() {
        assert_eq!(Unit::KiloJoule.factor(298.15), 1.0);
    }

    #[test]
    fn kilocalorie_factor_matches_thermochemical_calorie() {
        assert!((Unit::KiloCalorie.factor(298.15) - 1.0 / 4.184).abs() < 1e-12);
    }

    #[test]
    fn kt_factor_depends_on_temperature() {
        let t = 300.0;
        assert!((Unit::Kt.factor(t) - 1.0 / (KB * t)).abs() < 1e-12);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("kJ".parse::<Unit>().unwrap(), Unit::KiloJoule);
        assert_eq!("KCAL".parse::<Unit>().unwrap(), Unit::KiloCalorie);
        assert_eq!("kT".parse::<Unit>().unwrap(), Unit::Kt);
    }

    #[test]
    fn unknown_unit_is_rejected() {
        assert!("hartree".parse::<Unit>().is_err());
    }

    #[test]
    fn labels_are_human_readable() {
        assert_eq!(Unit::KiloJoule.to_string(), "kJ/mol");
        assert_eq!(Unit::Kt.to_string(), "kT");
    }
}
