use phf::{Map, phf_map};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements supported by the embedding engine.
///
/// The set covers the main-group elements commonly found in organic reactants
/// plus the transition metals most often encountered in catalytic transition
/// states. Each element carries its single-bond covalent radius, which drives
/// both bond inference and the default docking distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Element {
    H,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Se,
    Br,
    Rh,
    Pd,
    Sn,
    I,
    Pt,
}

static ELEMENT_SYMBOLS: Map<&'static str, Element> = phf_map! {
    "h" => Element::H, "he" => Element::He, "li" => Element::Li, "be" => Element::Be,
    "b" => Element::B, "c" => Element::C, "n" => Element::N, "o" => Element::O,
    "f" => Element::F, "ne" => Element::Ne, "na" => Element::Na, "mg" => Element::Mg,
    "al" => Element::Al, "si" => Element::Si, "p" => Element::P, "s" => Element::S,
    "cl" => Element::Cl, "ar" => Element::Ar, "k" => Element::K, "ca" => Element::Ca,
    "fe" => Element::Fe, "co" => Element::Co, "ni" => Element::Ni, "cu" => Element::Cu,
    "zn" => Element::Zn, "se" => Element::Se, "br" => Element::Br, "rh" => Element::Rh,
    "pd" => Element::Pd, "sn" => Element::Sn, "i" => Element::I, "pt" => Element::Pt,
};

impl Element {
    /// Returns the IUPAC symbol of the element (e.g. `"Cl"`).
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::H => "H",
            Self::He => "He",
            Self::Li => "Li",
            Self::Be => "Be",
            Self::B => "B",
            Self::C => "C",
            Self::N => "N",
            Self::O => "O",
            Self::F => "F",
            Self::Ne => "Ne",
            Self::Na => "Na",
            Self::Mg => "Mg",
            Self::Al => "Al",
            Self::Si => "Si",
            Self::P => "P",
            Self::S => "S",
            Self::Cl => "Cl",
            Self::Ar => "Ar",
            Self::K => "K",
            Self::Ca => "Ca",
            Self::Fe => "Fe",
            Self::Co => "Co",
            Self::Ni => "Ni",
            Self::Cu => "Cu",
            Self::Zn => "Zn",
            Self::Se => "Se",
            Self::Br => "Br",
            Self::Rh => "Rh",
            Self::Pd => "Pd",
            Self::Sn => "Sn",
            Self::I => "I",
            Self::Pt => "Pt",
        }
    }

    /// Returns the single-bond covalent radius in Angstroms (Cordero et al., 2008).
    pub fn covalent_radius(&self) -> f64 {
        match self {
            Self::H => 0.31,
            Self::He => 0.28,
            Self::Li => 1.28,
            Self::Be => 0.96,
            Self::B => 0.84,
            Self::C => 0.76,
            Self::N => 0.71,
            Self::O => 0.66,
            Self::F => 0.57,
            Self::Ne => 0.58,
            Self::Na => 1.66,
            Self::Mg => 1.41,
            Self::Al => 1.21,
            Self::Si => 1.11,
            Self::P => 1.07,
            Self::S => 1.05,
            Self::Cl => 1.02,
            Self::Ar => 1.06,
            Self::K => 2.03,
            Self::Ca => 1.76,
            Self::Fe => 1.32,
            Self::Co => 1.26,
            Self::Ni => 1.24,
            Self::Cu => 1.32,
            Self::Zn => 1.22,
            Self::Se => 1.20,
            Self::Br => 1.20,
            Self::Rh => 1.42,
            Self::Pd => 1.39,
            Self::Sn => 1.39,
            Self::I => 1.39,
            Self::Pt => 1.36,
        }
    }

    /// Returns `true` for hydrogen, the only element excluded from heavy-atom selections.
    pub fn is_hydrogen(&self) -> bool {
        matches!(self, Self::H)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ELEMENT_SYMBOLS
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
