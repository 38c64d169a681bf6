use serde::Serialize;
use sqlx::FromRow;

use crate::logic::{error::{Error, Result}, types::{GroupId, TeamId}};

#[derive(Debug, Default, Clone, PartialEq)]
#[derive(Serialize)]
#[derive(FromRow)]
pub struct Team {
    pub id: TeamId,
    pub full_name: String,
    pub group_id: GroupId,
    // Draw position within the group, 1..=team_count.
    pub position: u8,
}

impl Team {
    pub fn build(name: &str, group_id: GroupId, position: u8) -> Self {
        Self {
            full_name: name.trim().to_string(),
            group_id,
            position,
            ..Default::default()
        }
    }

    pub fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::Validation("team name cannot be empty".to_string()));
        }
        Ok(())
    }
}
