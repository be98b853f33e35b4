use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::task::TaskCategory;

/// Opaque catalog identifier for a degree program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(String);

impl ProgramId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProgramId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Catalog record. Read-only: nothing in this crate mutates a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub school_name: String,
    pub program_name: String,
    pub application_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub gre_required: bool,
    #[serde(default)]
    pub ccrn_required: bool,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl Program {
    /// Whether this program's requirement flag for the given exam category is set.
    pub fn requires(&self, category: TaskCategory) -> bool {
        match category {
            TaskCategory::Gre => self.gre_required,
            TaskCategory::Ccrn => self.ccrn_required,
        }
    }
}
