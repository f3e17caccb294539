use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The fixed set of display groupings a bound field can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DisplayGroup {
    General,
    IdentityData,
    Data,
    Text,
    Dimensions,
    Constraints,
    Construction,
    Materials,
    Graphics,
    Phasing,
    Structural,
    Mechanical,
    Electrical,
    Plumbing,
    Other,
}

const ALL: [DisplayGroup; 15] = [
    DisplayGroup::General,
    DisplayGroup::IdentityData,
    DisplayGroup::Data,
    DisplayGroup::Text,
    DisplayGroup::Dimensions,
    DisplayGroup::Constraints,
    DisplayGroup::Construction,
    DisplayGroup::Materials,
    DisplayGroup::Graphics,
    DisplayGroup::Phasing,
    DisplayGroup::Structural,
    DisplayGroup::Mechanical,
    DisplayGroup::Electrical,
    DisplayGroup::Plumbing,
    DisplayGroup::Other,
];

impl DisplayGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::IdentityData => "Identity Data",
            Self::Data => "Data",
            Self::Text => "Text",
            Self::Dimensions => "Dimensions",
            Self::Constraints => "Constraints",
            Self::Construction => "Construction",
            Self::Materials => "Materials and Finishes",
            Self::Graphics => "Graphics",
            Self::Phasing => "Phasing",
            Self::Structural => "Structural",
            Self::Mechanical => "Mechanical",
            Self::Electrical => "Electrical",
            Self::Plumbing => "Plumbing",
            Self::Other => "Other",
        }
    }

    /// Match a grouping label against the known groupings.
    ///
    /// Matching ignores case, punctuation, whitespace and the word "and", so
    /// "Identity Data", "identity_data" and "IdentityData" are the same label.
    /// `aliases` maps extra labels onto canonical grouping labels and is
    /// consulted first.
    pub fn resolve(label: &str, aliases: &BTreeMap<String, String>) -> Option<Self> {
        let key = normalize(label);
        if key.is_empty() {
            return None;
        }
        for (alias, target) in aliases {
            if normalize(alias) == key {
                return Self::lookup(&normalize(target));
            }
        }
        Self::lookup(&key)
    }

    fn lookup(key: &str) -> Option<Self> {
        if key == "materials" {
            return Some(Self::Materials);
        }
        ALL.iter().copied().find(|g| {
            normalize(g.as_str()) == key || normalize(&format!("{g:?}")) == key
        })
    }
}

impl fmt::Display for DisplayGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(label: &str) -> String {
    label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !w.eq_ignore_ascii_case("and"))
        .map(|w| w.to_lowercase())
        .collect()
}
