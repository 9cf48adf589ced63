//! Reserved marker columns, extraction modes, and the required-column contract.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

pub const PROJECT_SINGLE_NAME: &str = "dst_proj_single";
pub const STACK_SINGLE_NAME: &str = "dst_stack_single";
pub const PROJECT_COMPANY_NAME: &str = "dst_proj_company";
pub const STACK_COMPANY_NAME: &str = "dst_stack_company";
pub const PROJECT_ACTIVITY_CENTER_NAME: &str = "dst_proj_ac";
pub const STACK_ACTIVITY_CENTER_NAME: &str = "dst_stack_ac";
pub const INCREMENTAL_NAME: &str = "dst_timestamp";

/// Every marker column, in contract order.
pub const ALL_MARKER_COLUMNS: [&str; 7] = [
    PROJECT_SINGLE_NAME,
    STACK_SINGLE_NAME,
    PROJECT_COMPANY_NAME,
    STACK_COMPANY_NAME,
    PROJECT_ACTIVITY_CENTER_NAME,
    STACK_ACTIVITY_CENTER_NAME,
    INCREMENTAL_NAME,
];

/// Tenant-scoping scheme selecting which marker pair filters rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ExtractionMode {
    #[default]
    Project,
    Organization,
    ActivityCenter,
}

/// The (tenant, stack) marker column pair of one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerColumns {
    pub tenant: &'static str,
    pub stack: &'static str,
}

const PROJECT_MARKERS: MarkerColumns = MarkerColumns {
    tenant: PROJECT_SINGLE_NAME,
    stack: STACK_SINGLE_NAME,
};

const ORGANIZATION_MARKERS: MarkerColumns = MarkerColumns {
    tenant: PROJECT_COMPANY_NAME,
    stack: STACK_COMPANY_NAME,
};

const ACTIVITY_CENTER_MARKERS: MarkerColumns = MarkerColumns {
    tenant: PROJECT_ACTIVITY_CENTER_NAME,
    stack: STACK_ACTIVITY_CENTER_NAME,
};

impl ExtractionMode {
    /// Config-file spelling of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Organization => "organization",
            Self::ActivityCenter => "activity_center",
        }
    }

    /// Marker columns filtering rows in this mode.
    #[must_use]
    pub fn markers(self) -> MarkerColumns {
        match self {
            Self::Project => PROJECT_MARKERS,
            Self::Organization => ORGANIZATION_MARKERS,
            Self::ActivityCenter => ACTIVITY_CENTER_MARKERS,
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMode {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "organization" => Ok(Self::Organization),
            "activity_center" => Ok(Self::ActivityCenter),
            other => Err(ExtractError::config(
                "UNKNOWN_MODE",
                format!(
                    "unknown extraction mode '{other}', expected one of: project, organization, activity_center"
                ),
            )),
        }
    }
}

impl TryFrom<String> for ExtractionMode {
    type Error = ExtractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Which marker columns a table must carry to be exportable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractScope {
    /// Every marker column of every mode.
    #[default]
    AllModes,
    /// Only the active mode's pair plus the incremental column.
    ActiveMode,
}

/// Ordered set of column names every exportable table must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredColumns {
    names: Vec<&'static str>,
}

impl RequiredColumns {
    /// Contract covering all marker columns across all modes.
    #[must_use]
    pub fn all_modes() -> Self {
        Self {
            names: ALL_MARKER_COLUMNS.to_vec(),
        }
    }

    /// Contract narrowed to the marker pair used by `mode`.
    #[must_use]
    pub fn for_mode(mode: ExtractionMode) -> Self {
        let markers = mode.markers();
        Self {
            names: vec![markers.tenant, markers.stack, INCREMENTAL_NAME],
        }
    }

    #[must_use]
    pub fn resolve(scope: ContractScope, mode: ExtractionMode) -> Self {
        match scope {
            ContractScope::AllModes => Self::all_modes(),
            ContractScope::ActiveMode => Self::for_mode(mode),
        }
    }

    #[must_use]
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Required names absent from `present`, in contract order.
    pub fn missing_from<'a, I>(&self, present: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: Vec<&str> = present.into_iter().collect();
        self.names
            .iter()
            .filter(|required| !present.contains(required))
            .map(|required| (*required).to_string())
            .collect()
    }
}
