//! Typed results for model builders which may legitimately do nothing.
use crate::network::ComponentType;
use derive_more::Display;
use std::path::PathBuf;

/// Why a builder did not change the network or model
#[derive(Debug, Clone, PartialEq, Display)]
pub enum SkipReason {
    /// An optional input column is absent, so the feature does not apply
    #[display("{component} table has no {column} column")]
    MissingColumn {
        /// The table that was searched
        component: ComponentType,
        /// The column that was looked for
        column: String,
    },
    /// An optional input file is absent
    #[display("no {} file", _0.display())]
    MissingFile(PathBuf),
    /// The network for the previous study year could not be found
    #[display("no network found for the previous year at {}", _0.display())]
    PriorYearMissing(PathBuf),
    /// The model has no capacity variables for storage units this year
    #[display("model has no StorageUnit-p_nom variable")]
    NoStorageCapacityVariable,
    /// The reserve area column holds no reserve areas
    #[display("no reserve areas defined")]
    NoReserveAreas,
    /// There are no reserve level columns
    #[display("no reserve levels defined")]
    NoReserveLevels,
}

/// The result of a builder which may be skipped when its input data is absent
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The builder ran and changed something
    Applied(T),
    /// The builder did nothing, for the given reason
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    /// Whether the builder ran
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The builder's report, if it ran
    pub fn applied(&self) -> Option<&T> {
        match self {
            Self::Applied(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }

    /// The reason the builder was skipped, if it was
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Self::Applied(_) => None,
            Self::Skipped(reason) => Some(reason),
        }
    }
}

impl<T> From<SkipReason> for Outcome<T> {
    fn from(reason: SkipReason) -> Self {
        Self::Skipped(reason)
    }
}

/// A pair of assets which were not coupled, and why
#[derive(Debug, Clone, PartialEq, Display)]
#[display("{left} and {right}: {reason}")]
pub struct SkippedPair {
    /// The asset holding the reference
    pub left: String,
    /// The referenced asset
    pub right: String,
    /// Why the pair was skipped
    pub reason: String,
}
