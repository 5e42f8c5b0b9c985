use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::error::StoreError;
use crate::ids::RecordId;

/// Outcome of an interview process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    #[default]
    Awaiting,
    Accepted,
    Rejected,
}

impl Verdict {
    pub const NAMES: &'static [&'static str] = &["awaiting", "accepted", "rejected"];

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Awaiting => "awaiting",
            Verdict::Accepted => "accepted",
            Verdict::Rejected => "rejected",
        }
    }
}

impl FromStr for Verdict {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting" => Ok(Verdict::Awaiting),
            "accepted" => Ok(Verdict::Accepted),
            "rejected" => Ok(Verdict::Rejected),
            other => Err(StoreError::Corrupt(format!("unknown verdict {other:?}"))),
        }
    }
}

/// A stored interview experience. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: RecordId,
    pub company: String,
    pub role: String,
    pub year: i32,
    pub verdict: Verdict,
    pub rounds: Vec<String>,
    pub problem_links: Vec<String>,
    pub tips: String,
    pub anonymous: bool,
    pub author_id: RecordId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated client input for a new experience.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExperience {
    pub company: String,
    pub role: String,
    pub year: i32,
    pub verdict: Verdict,
    pub rounds: Vec<String>,
    pub problem_links: Vec<String>,
    pub tips: String,
    pub anonymous: bool,
}

impl NewExperience {
    /// Assign id, timestamp and author. Timestamps are kept at microsecond
    /// precision so they survive a Postgres round trip unchanged.
    pub fn into_experience(self, author_id: RecordId) -> Experience {
        let now = OffsetDateTime::now_utc();
        let now = now
            .replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now);
        Experience {
            id: RecordId::generate_at(now),
            company: self.company,
            role: self.role,
            year: self.year,
            verdict: self.verdict,
            rounds: self.rounds,
            problem_links: self.problem_links,
            tips: self.tips,
            anonymous: self.anonymous,
            author_id,
            created_at: now,
        }
    }
}

/// Author reference embedded in read projections. No credential fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: RecordId,
    pub name: String,
    pub email: String,
}

/// Public read projection of an experience.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceView {
    pub id: RecordId,
    pub company: String,
    pub role: String,
    pub year: i32,
    pub verdict: Verdict,
    pub rounds: Vec<String>,
    pub problem_links: Vec<String>,
    pub tips: String,
    pub anonymous: bool,
    pub author: AuthorRef,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ExperienceView {
    pub fn new(e: Experience, author: AuthorRef) -> Self {
        Self {
            id: e.id,
            company: e.company,
            role: e.role,
            year: e.year,
            verdict: e.verdict,
            rounds: e.rounds,
            problem_links: e.problem_links,
            tips: e.tips,
            anonymous: e.anonymous,
            author,
            created_at: e.created_at,
        }
    }
}

/// Row of `experiences` joined with its author's public columns.
#[derive(Debug, FromRow)]
pub struct ExperienceViewRow {
    pub id: RecordId,
    pub company: String,
    pub role: String,
    pub year: i32,
    pub verdict: String,
    pub rounds: Vec<String>,
    pub problem_links: Vec<String>,
    pub tips: String,
    pub anonymous: bool,
    pub author_id: RecordId,
    pub author_name: String,
    pub author_email: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ExperienceViewRow> for ExperienceView {
    type Error = StoreError;

    fn try_from(r: ExperienceViewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            company: r.company,
            role: r.role,
            year: r.year,
            verdict: r.verdict.parse()?,
            rounds: r.rounds,
            problem_links: r.problem_links,
            tips: r.tips,
            anonymous: r.anonymous,
            author: AuthorRef {
                id: r.author_id,
                name: r.author_name,
                email: r.author_email,
            },
            created_at: r.created_at,
        })
    }
}
