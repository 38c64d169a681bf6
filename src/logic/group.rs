// Groups of the group stage.
use serde::Serialize;

use crate::logic::{error::{Error, Result}, types::GroupId};

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize)]
pub struct Group {
    pub id: GroupId,
    pub label: char,
    // How many teams the group holds once populated.
    pub team_count: u8,
}

impl Group {
    pub fn build(label: char, team_count: u8) -> Self {
        Self {
            id: GroupId::default(),
            label,
            team_count,
        }
    }

    // Check the group's own invariants.
    pub fn validate(&self) -> Result<()> {
        if !self.label.is_ascii_uppercase() {
            return Err(Error::Validation(format!("group label '{}' must be a single letter A-Z", self.label)));
        }
        if !(4..=5).contains(&self.team_count) {
            return Err(Error::Validation(format!("group {} must expect 4 or 5 teams, not {}", self.label, self.team_count)));
        }
        Ok(())
    }

    // Matches in a full single round robin of the group.
    pub fn expected_matches(&self) -> usize {
        let n = usize::from(self.team_count);
        n * (n - 1) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_sizes_are_checked() {
        assert!(Group::build('A', 4).validate().is_ok());
        assert!(Group::build('H', 5).validate().is_ok());
        assert!(matches!(Group::build('a', 4).validate(), Err(Error::Validation(_))));
        assert!(matches!(Group::build('1', 4).validate(), Err(Error::Validation(_))));
        assert!(matches!(Group::build('B', 6).validate(), Err(Error::Validation(_))));
        assert!(matches!(Group::build('B', 3).validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn round_robin_size() {
        assert_eq!(Group::build('A', 4).expected_matches(), 6);
        assert_eq!(Group::build('A', 5).expected_matches(), 10);
    }
}
