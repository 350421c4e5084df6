use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// The structural observable a sample set measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObservableKind {
    /// Pair distance between two bonded particles, in length units.
    Distance,
    /// Three-body angle at the central particle, in radians.
    Angle,
}

impl ObservableKind {
    /// Number of particle type labels that identify an interaction of this kind.
    pub fn arity(self) -> usize {
        match self {
            Self::Distance => 2,
            Self::Angle => 3,
        }
    }

    pub fn from_arity(arity: usize) -> Option<Self> {
        match arity {
            2 => Some(Self::Distance),
            3 => Some(Self::Angle),
            _ => None,
        }
    }

    /// Closed interval the observable can take, if bounded.
    pub fn domain(self) -> Option<(f64, f64)> {
        match self {
            Self::Distance => None,
            Self::Angle => Some((0.0, PI)),
        }
    }
}

impl fmt::Display for ObservableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Distance => "bond",
                Self::Angle => "angle",
            }
        )
    }
}
