//! Storage variants and the table naming contract.

use serde::Serialize;
use std::fmt;

/// Marker inserted between the base table name and the variant suffix of
/// every derived table. Downstream readers look for it verbatim.
pub const LOCALISED_MARKER: &str = "_Localised";

/// One of the physical copies a record can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageVariant {
    /// The current (draft) row, always present
    Current,
    /// The published copy of a staged-live entity
    Live,
    /// The historical version log of a versioned entity
    Versions,
}

impl StorageVariant {
    /// All variants in migration order.
    pub const ALL: [StorageVariant; 3] = [
        StorageVariant::Current,
        StorageVariant::Live,
        StorageVariant::Versions,
    ];

    /// Table name suffix for this variant (`""`, `_Live`, `_Versions`).
    pub fn suffix(self) -> &'static str {
        match self {
            StorageVariant::Current => "",
            StorageVariant::Live => "_Live",
            StorageVariant::Versions => "_Versions",
        }
    }

    /// Whether rows are additionally keyed by version number.
    pub fn is_versioned(self) -> bool {
        matches!(self, StorageVariant::Versions)
    }

    /// Legacy flat-column table holding this variant of `base_table`.
    pub fn legacy_table(self, base_table: &str) -> String {
        format!("{}{}", base_table, self.suffix())
    }

    /// Derived table receiving localised rows for this variant of `base_table`.
    ///
    /// ```
    /// use lm_core::StorageVariant;
    /// assert_eq!(StorageVariant::Current.localised_table("SiteTree"), "SiteTree_Localised");
    /// assert_eq!(StorageVariant::Live.localised_table("SiteTree"), "SiteTree_Localised_Live");
    /// ```
    pub fn localised_table(self, base_table: &str) -> String {
        format!("{}{}{}", base_table, LOCALISED_MARKER, self.suffix())
    }
}

impl fmt::Display for StorageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageVariant::Current => write!(f, "current"),
            StorageVariant::Live => write!(f, "live"),
            StorageVariant::Versions => write!(f, "versions"),
        }
    }
}
