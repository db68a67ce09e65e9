//! License kinds and the catalog license-name lookup table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// License kinds understood by the curation platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseKind {
    #[serde(rename = "CC BY")]
    CcBy,
    #[serde(rename = "CC BY-SA")]
    CcBySa,
    #[serde(rename = "CC BY-ND")]
    CcByNd,
    #[serde(rename = "CC BY-NC")]
    CcByNc,
    #[serde(rename = "CC BY-NC-SA")]
    CcByNcSa,
    #[serde(rename = "CC BY-NC-ND")]
    CcByNcNd,
    #[serde(rename = "All Rights Reserved")]
    AllRightsReserved,
    #[serde(rename = "Public Domain")]
    PublicDomain,
    #[serde(rename = "Special Permissions")]
    SpecialPermissions,
}

impl LicenseKind {
    pub const ALL: [LicenseKind; 9] = [
        Self::CcBy,
        Self::CcBySa,
        Self::CcByNd,
        Self::CcByNc,
        Self::CcByNcSa,
        Self::CcByNcNd,
        Self::AllRightsReserved,
        Self::PublicDomain,
        Self::SpecialPermissions,
    ];

    /// Platform identifier for this license.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CcBy => "CC BY",
            Self::CcBySa => "CC BY-SA",
            Self::CcByNd => "CC BY-ND",
            Self::CcByNc => "CC BY-NC",
            Self::CcByNcSa => "CC BY-NC-SA",
            Self::CcByNcNd => "CC BY-NC-ND",
            Self::AllRightsReserved => "All Rights Reserved",
            Self::PublicDomain => "Public Domain",
            Self::SpecialPermissions => "Special Permissions",
        }
    }

    /// Parse a platform identifier.
    pub fn parse(kind: &str) -> ConfigResult<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(kind.trim()))
            .ok_or_else(|| ConfigError::UnknownLicenseKind { kind: kind.into() })
    }
}

impl std::fmt::Display for LicenseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog license names with a known platform license.
const LICENSE_MAPPING: &[(&str, LicenseKind)] = &[
    ("Creative Commons Attribution License", LicenseKind::CcBy),
    (
        "Creative Commons Attribution-NonCommercial-ShareAlike License",
        LicenseKind::CcByNcSa,
    ),
];

/// Licensing metadata attached to every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub kind: LicenseKind,
    pub description: String,
    pub copyright_holder: String,
}

/// Static license-name lookup, extendable from configuration.
#[derive(Debug, Clone)]
pub struct LicenseTable {
    entries: HashMap<String, LicenseKind>,
}

impl Default for LicenseTable {
    fn default() -> Self {
        Self {
            entries: LICENSE_MAPPING
                .iter()
                .map(|(name, kind)| (name.to_string(), *kind))
                .collect(),
        }
    }
}

impl LicenseTable {
    /// Built-in mapping plus extra `name = "kind"` entries from the config.
    pub fn with_extra(extra: &HashMap<String, String>) -> ConfigResult<Self> {
        let mut table = Self::default();
        for (name, kind) in extra {
            table.entries.insert(name.clone(), LicenseKind::parse(kind)?);
        }
        Ok(table)
    }

    /// Look up a catalog license name. Matching is exact after trimming.
    pub fn lookup(&self, license_name: &str) -> Option<LicenseKind> {
        self.entries.get(license_name.trim()).copied()
    }
}
