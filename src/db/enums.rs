use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict for a single probe, stored in `monitor_checks.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "check_status_enum")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    #[sea_orm(string_value = "HEALTHY")]
    Healthy,
    #[sea_orm(string_value = "DEGRADED")]
    Degraded,
    #[sea_orm(string_value = "DOWN")]
    Down,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Healthy => "HEALTHY",
            CheckStatus::Degraded => "DEGRADED",
            CheckStatus::Down => "DOWN",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ActiveEnum, Iterable};

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&CheckStatus::Degraded).unwrap(),
            "\"DEGRADED\""
        );
        let parsed: CheckStatus = serde_json::from_str("\"DOWN\"").unwrap();
        assert_eq!(parsed, CheckStatus::Down);
    }

    #[test]
    fn test_status_db_value_matches_display() {
        for status in CheckStatus::iter() {
            assert_eq!(status.to_value(), status.to_string());
        }
    }
}
