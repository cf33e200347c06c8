//! Domain types for occurrence management with strong typing.
//!
//! The status catalog, profile roles and point classifications are stored as
//! reference rows in the database, but every decision in the code base is
//! taken over the closed enumerations defined here. Catalog rows are mapped to
//! these enums by name at the repository boundary.

pub mod lifecycle;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use lifecycle::{
    BLOCK_THRESHOLD, FieldChange, RejectionNotice, Reputation, TransitionError, TransitionPlan,
    plan_transition,
};

/// Lifecycle state of an occurrence.
///
/// The Portuguese names are the wire contract shared with the frontend and
/// the seeded `status_ocorrencia` rows; they must match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccurrenceStatus {
    #[serde(rename = "Registrada")]
    Registered,
    #[serde(rename = "Em andamento")]
    InProgress,
    #[serde(rename = "Fechada com solução")]
    ClosedSolved,
    #[serde(rename = "Fechada sem solução")]
    ClosedUnsolved,
    #[serde(rename = "Recusada")]
    Rejected,
}

impl OccurrenceStatus {
    pub const ALL: [Self; 5] = [
        Self::InProgress,
        Self::ClosedUnsolved,
        Self::ClosedSolved,
        Self::Rejected,
        Self::Registered,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Registered => "Registrada",
            Self::InProgress => "Em andamento",
            Self::ClosedSolved => "Fechada com solução",
            Self::ClosedUnsolved => "Fechada sem solução",
            Self::Rejected => "Recusada",
        }
    }

    /// Fixed catalog id used when seeding `status_ocorrencia`.
    #[must_use]
    pub const fn seed_id(self) -> i32 {
        match self {
            Self::InProgress => 1,
            Self::ClosedUnsolved => 2,
            Self::ClosedSolved => 3,
            Self::Rejected => 4,
            Self::Registered => 5,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Whether an occurrence in this status carries a finalization date.
    #[must_use]
    pub const fn is_finalized(self) -> bool {
        matches!(self, Self::ClosedSolved | Self::Rejected)
    }

    /// Statuses shown on the public map.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Registered | Self::InProgress)
    }
}

impl fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access profile of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Usuario")]
    User,
    #[serde(rename = "Moderador")]
    Moderator,
    #[serde(rename = "Administrador")]
    Administrator,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::User, Self::Moderator, Self::Administrator];

    /// Roles allowed to triage occurrences.
    pub const STAFF: [Self; 2] = [Self::Moderator, Self::Administrator];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::User => "Usuario",
            Self::Moderator => "Moderador",
            Self::Administrator => "Administrador",
        }
    }

    #[must_use]
    pub const fn seed_id(self) -> i32 {
        match self {
            Self::User => 1,
            Self::Moderator => 2,
            Self::Administrator => 3,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }

    #[must_use]
    pub fn from_seed_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.seed_id() == id)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why points were awarded for an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    Solved,
    Validated,
}

impl PointType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solved => "solved",
            Self::Validated => "validated",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "solved" => Some(Self::Solved),
            "validated" => Some(Self::Validated),
            _ => None,
        }
    }
}
