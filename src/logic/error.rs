// Error taxonomy shared by every component.
use thiserror::Error;

use crate::logic::{competition::{Stage, checker::Violation, placeholder::Placeholder}, types::MatchId};

#[derive(Error, Debug)]
pub enum Error {
    /// An entity invariant would be violated. Nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// A placeholder cannot be resolved yet. Reported, not thrown, by the resolver.
    #[error("match {match_id}: {placeholder} is unresolved, {reason}")]
    UnresolvedDependency {
        match_id: MatchId,
        placeholder: Placeholder,
        reason: String,
    },

    /// The caller asked for a schedule that cannot be built. Nothing was written.
    #[error("invalid schedule: {0}")]
    InvalidScheduleSpec(String),

    /// A repair ran but the re-check still found violations. The repair was rolled back.
    #[error("repair of {stage} incomplete, {} violation(s) remain", .remaining.len())]
    RepairIncomplete {
        stage: Stage,
        remaining: Vec<Violation>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0} did not finish before the deadline")]
    Timeout(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
