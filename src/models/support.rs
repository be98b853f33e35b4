use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::program::ProgramId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterStatus {
    Requested,
    Received,
}

impl LetterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterStatus::Requested => "requested",
            LetterStatus::Received => "received",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(LetterStatus::Requested),
            "received" => Some(LetterStatus::Received),
            _ => None,
        }
    }
}

/// Letter of recommendation tracked against one target relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationLetter {
    pub id: String,
    pub program_id: ProgramId,
    pub recommender_name: String,
    pub recommender_email: Option<String>,
    pub status: LetterStatus,
    pub requested_at: DateTime<Utc>,
}

impl RecommendationLetter {
    pub fn requested(program_id: ProgramId, req: NewLetterRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            program_id,
            recommender_name: req.recommender_name,
            recommender_email: req.recommender_email,
            status: LetterStatus::Requested,
            requested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLetterRequest {
    pub recommender_name: String,
    pub recommender_email: Option<String>,
}

/// Uploaded application document reference (transcript, resume, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDocument {
    pub id: String,
    pub program_id: ProgramId,
    pub name: String,
    pub kind: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ApplicationDocument {
    pub fn new(program_id: ProgramId, req: NewDocumentRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            program_id,
            name: req.name,
            kind: req.kind,
            uploaded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDocumentRequest {
    pub name: String,
    pub kind: String,
}
