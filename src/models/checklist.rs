use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Custom (non-default) items allowed per relationship.
pub const MAX_CUSTOM_ITEMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenReason {
    SchoolNotRequired,
    UserHidden,
}

impl HiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HiddenReason::SchoolNotRequired => "school_not_required",
            HiddenReason::UserHidden => "user_hidden",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "school_not_required" => Some(HiddenReason::SchoolNotRequired),
            "user_hidden" => Some(HiddenReason::UserHidden),
            _ => None,
        }
    }
}

/// A checklist entry belonging to exactly one target relationship.
///
/// Default items share stable ids across all relationships so one real-world
/// event ("took the GRE") can address the same item everywhere; custom items
/// get uuid ids. Hidden items stay mutable but are excluded from progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    pub completed: bool,
    pub is_default: bool,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hidden_reason: Option<HiddenReason>,
}

impl ChecklistItem {
    pub fn custom(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            completed: false,
            is_default: false,
            hidden: false,
            hidden_reason: None,
        }
    }

    pub fn visible(&self) -> bool {
        !self.hidden
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChecklistItemRequest {
    pub label: String,
}
