//! Minimum-stability levels.
//!
//! Composer accepts `dev`, `alpha`, `beta`, `RC` and `stable`. When several
//! manifests declare a level, the consolidated manifest keeps the most
//! permissive one so no module's packages become unresolvable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A minimum-stability level.
///
/// Ordering follows permissiveness: `Stable < Rc < Beta < Alpha < Dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Stability {
    #[default]
    #[serde(rename = "stable")]
    Stable,
    #[serde(rename = "RC")]
    Rc,
    #[serde(rename = "beta")]
    Beta,
    #[serde(rename = "alpha")]
    Alpha,
    #[serde(rename = "dev")]
    Dev,
}

impl Stability {
    /// The spelling Composer expects in `minimum-stability`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::Rc => "RC",
            Stability::Beta => "beta",
            Stability::Alpha => "alpha",
            Stability::Dev => "dev",
        }
    }

    /// Return whichever of the two levels is more permissive.
    pub fn most_permissive(self, other: Stability) -> Stability {
        self.max(other)
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stable" => Ok(Stability::Stable),
            "rc" => Ok(Stability::Rc),
            "beta" => Ok(Stability::Beta),
            "alpha" => Ok(Stability::Alpha),
            "dev" => Ok(Stability::Dev),
            _ => Err(format!(
                "invalid minimum-stability '{}'; expected one of dev, alpha, beta, RC, stable",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissiveness_order() {
        assert!(Stability::Stable < Stability::Rc);
        assert!(Stability::Rc < Stability::Beta);
        assert!(Stability::Beta < Stability::Alpha);
        assert!(Stability::Alpha < Stability::Dev);
    }

    #[test]
    fn test_most_permissive() {
        assert_eq!(
            Stability::Beta.most_permissive(Stability::Alpha),
            Stability::Alpha
        );
        assert_eq!(
            Stability::Dev.most_permissive(Stability::Stable),
            Stability::Dev
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("RC".parse::<Stability>().unwrap(), Stability::Rc);
        assert_eq!("rc".parse::<Stability>().unwrap(), Stability::Rc);
        assert_eq!("Beta".parse::<Stability>().unwrap(), Stability::Beta);
        assert!("nightly".parse::<Stability>().is_err());
    }

    #[test]
    fn test_display_uses_composer_spelling() {
        assert_eq!(Stability::Rc.to_string(), "RC");
        assert_eq!(Stability::Dev.to_string(), "dev");
    }
}
