use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::program::ProgramId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Researching,
    InProgress,
    Submitted,
    InterviewInvite,
    InterviewComplete,
    Waitlisted,
    Denied,
    Accepted,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Researching => "researching",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::InterviewInvite => "interview_invite",
            ApplicationStatus::InterviewComplete => "interview_complete",
            ApplicationStatus::Waitlisted => "waitlisted",
            ApplicationStatus::Denied => "denied",
            ApplicationStatus::Accepted => "accepted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "researching" => Some(ApplicationStatus::Researching),
            "in_progress" => Some(ApplicationStatus::InProgress),
            "submitted" => Some(ApplicationStatus::Submitted),
            "interview_invite" => Some(ApplicationStatus::InterviewInvite),
            "interview_complete" => Some(ApplicationStatus::InterviewComplete),
            "waitlisted" => Some(ApplicationStatus::Waitlisted),
            "denied" => Some(ApplicationStatus::Denied),
            "accepted" => Some(ApplicationStatus::Accepted),
            _ => None,
        }
    }
}

impl Default for ApplicationStatus {
    fn default() -> Self {
        ApplicationStatus::Researching
    }
}

/// One tracked program per user. Checklist, letter and document sub-records
/// exist only while `is_target` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRelationship {
    pub program_id: ProgramId,
    pub is_target: bool,
    pub status: ApplicationStatus,
    pub notes: String,
    pub progress: u8,
    pub saved_at: DateTime<Utc>,
}

impl ProgramRelationship {
    pub fn saved(program_id: ProgramId) -> Self {
        Self {
            program_id,
            is_target: false,
            status: ApplicationStatus::default(),
            notes: String::new(),
            progress: 0,
            saved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRelationshipRequest {
    pub status: Option<ApplicationStatus>,
    pub notes: Option<String>,
}
