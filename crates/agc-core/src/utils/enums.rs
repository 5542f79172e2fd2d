use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::AgcError;

/// The reconstructed object collections an [`Event`](crate::data::Event) carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Electron,
    Muon,
    Jet,
}

impl ObjectKind {
    /// The branch prefix used for this collection in NanoAOD-style files.
    pub fn prefix(&self) -> &'static str {
        match self {
            ObjectKind::Electron => "Electron",
            ObjectKind::Muon => "Muon",
            ObjectKind::Jet => "Jet",
        }
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

impl FromStr for ObjectKind {
    type Err = AgcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "electron" | "electrons" | "e" | "ele" => Ok(Self::Electron),
            "muon" | "muons" | "mu" => Ok(Self::Muon),
            "jet" | "jets" | "j" => Ok(Self::Jet),
            _ => Err(AgcError::ParseError {
                name: s.to_string(),
                object: "ObjectKind".to_string(),
            }),
        }
    }
}

/// Signal and control regions of the single-lepton ttbar selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    /// Exactly one lepton, at least four jets, exactly one b-tagged jet. Observable: $`H_T`$.
    FourJetsOneTag,
    /// Exactly one lepton, at least four jets, at least two b-tagged jets. Observable: the
    /// reconstructed top mass $`m_{bjj}`$.
    FourJetsTwoTags,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::FourJetsOneTag, Region::FourJetsTwoTags];
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::FourJetsOneTag => write!(f, "4j1b"),
            Region::FourJetsTwoTags => write!(f, "4j2b"),
        }
    }
}

impl FromStr for Region {
    type Err = AgcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "4j1b" | "4j_1b" => Ok(Self::FourJetsOneTag),
            "4j2b" | "4j_2b" => Ok(Self::FourJetsTwoTags),
            _ => Err(AgcError::ParseError {
                name: s.to_string(),
                object: "Region".to_string(),
            }),
        }
    }
}
