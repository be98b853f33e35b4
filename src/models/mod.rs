pub mod checklist;
pub mod program;
pub mod relationship;
pub mod support;
pub mod task;

pub use checklist::{ChecklistItem, HiddenReason, MAX_CUSTOM_ITEMS, NewChecklistItemRequest};
pub use program::{Program, ProgramId};
pub use relationship::{ApplicationStatus, ProgramRelationship, UpdateRelationshipRequest};
pub use support::{
    ApplicationDocument, LetterStatus, NewDocumentRequest, NewLetterRequest, RecommendationLetter,
};
pub use task::{
    DashboardTask, DeadlineSource, GlobalTask, GlobalTaskTemplate, TaskCategory, TaskStatus,
};
