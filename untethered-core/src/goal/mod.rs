//! Monthly and weekly goal records.

mod store;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::backend::{Document, from_document, to_document, validate_key};
use crate::constants::WEEKS_PER_MONTH;
use crate::error::{UntetheredResult, ValidationError};
use crate::period::{Period, WeekIndex};

pub use store::GoalStore;

/// Composite key of a goal record: one per member per month.
///
/// Serialized as `{uid}_{MM}_{YYYY}`. Parsing splits from the right, so a
/// uid that itself contains underscores still round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GoalKey {
    pub uid: String,
    pub period: Period,
}

impl GoalKey {
    pub fn new(uid: impl Into<String>, period: Period) -> Self {
        GoalKey {
            uid: uid.into(),
            period,
        }
    }

    pub fn to_document_key(&self) -> String {
        format!(
            "{}_{:02}_{:04}",
            self.uid,
            self.period.month(),
            self.period.year()
        )
    }

    pub fn parse(key: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidGoalKey(key.to_string());

        let mut parts = key.rsplitn(3, '_');
        let year = parts.next().ok_or_else(invalid)?;
        let month = parts.next().ok_or_else(invalid)?;
        let uid = parts.next().filter(|uid| !uid.is_empty()).ok_or_else(invalid)?;

        let period: Period = format!("{month}/{year}").parse().map_err(|_| invalid())?;
        validate_key(uid).map_err(|_| invalid())?;

        Ok(GoalKey::new(uid, period))
    }
}

impl fmt::Display for GoalKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_document_key())
    }
}

/// One week's goal and free-form note. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub goal: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub note: String,
}

impl WeekEntry {
    pub fn has_goal(&self) -> bool {
        !self.goal.trim().is_empty()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

static EMPTY_WEEK: WeekEntry = WeekEntry {
    goal: String::new(),
    note: String::new(),
};

/// A member's goals for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_goal: Option<String>,
    #[serde(default)]
    pub weekly_goals: Vec<WeekEntry>,
}

impl Default for GoalRecord {
    fn default() -> Self {
        GoalRecord {
            monthly_goal: None,
            weekly_goals: vec![WeekEntry::default(); WEEKS_PER_MONTH],
        }
    }
}

impl GoalRecord {
    /// Decode a stored record, padding legacy week arrays to four entries.
    pub fn from_document(document: Document) -> UntetheredResult<Self> {
        let mut record: GoalRecord = from_document(document)?;
        record.pad_weeks();
        Ok(record)
    }

    pub fn to_document(&self) -> UntetheredResult<Document> {
        to_document(self)
    }

    pub fn pad_weeks(&mut self) {
        if self.weekly_goals.len() < WEEKS_PER_MONTH {
            self.weekly_goals.resize(WEEKS_PER_MONTH, WeekEntry::default());
        }
    }

    /// Set means present and non-blank; a blank monthly goal can still be written.
    pub fn has_monthly_goal(&self) -> bool {
        self.monthly_goal
            .as_deref()
            .is_some_and(|goal| !goal.trim().is_empty())
    }

    /// A week missing from a short array reads as empty.
    pub fn week(&self, index: WeekIndex) -> &WeekEntry {
        self.weekly_goals.get(index.get()).unwrap_or(&EMPTY_WEEK)
    }

    pub(crate) fn week_mut(&mut self, index: WeekIndex) -> &mut WeekEntry {
        self.pad_weeks();
        &mut self.weekly_goals[index.get()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn period(key: &str) -> Period {
        key.parse().unwrap()
    }

    #[test]
    fn test_goal_key_serialization() {
        let key = GoalKey::new("u1", period("03/2025"));
        assert_eq!(key.to_document_key(), "u1_03_2025");
        assert_eq!(GoalKey::parse("u1_03_2025").unwrap(), key);
    }

    #[test]
    fn test_goal_key_uid_with_underscores() {
        let key = GoalKey::new("team_lead_7", period("11/2024"));
        let serialized = key.to_document_key();
        assert_eq!(serialized, "team_lead_7_11_2024");
        assert_eq!(GoalKey::parse(&serialized).unwrap(), key);
    }

    #[test]
    fn test_goal_key_rejects_malformed() {
        for bad in ["u1", "u1_03", "_03_2025", "u1_3_2025", "u1_03_25", "u1_13_2025", "03_2025"] {
            assert!(GoalKey::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_default_record_shape() {
        let record = GoalRecord::default();
        assert_eq!(record.monthly_goal, None);
        assert_eq!(record.weekly_goals.len(), 4);
        assert!(record.weekly_goals.iter().all(|w| w.goal.is_empty() && w.note.is_empty()));
    }

    #[test]
    fn test_from_document_pads_legacy_weeks() {
        let doc = to_document(&json!({
            "monthlyGoal": "run a 10k",
            "weeklyGoals": [{ "goal": "5k", "note": null }]
        }))
        .unwrap();

        let record = GoalRecord::from_document(doc).unwrap();
        assert_eq!(record.monthly_goal.as_deref(), Some("run a 10k"));
        assert_eq!(record.weekly_goals.len(), 4);
        assert_eq!(record.weekly_goals[0].goal, "5k");
        assert_eq!(record.weekly_goals[0].note, "");
    }

    #[test]
    fn test_from_document_without_weeks() {
        let record = GoalRecord::from_document(Document::new()).unwrap();
        assert_eq!(record, GoalRecord::default());
    }

    #[test]
    fn test_week_on_unpadded_record() {
        let record = GoalRecord {
            monthly_goal: None,
            weekly_goals: vec![],
        };
        let last = WeekIndex::new(3).unwrap();
        assert_eq!(record.week(last), &WeekEntry::default());
        assert!(!record.week(last).has_goal());
    }

    #[test]
    fn test_blank_monthly_goal_is_not_set() {
        let record = GoalRecord {
            monthly_goal: Some("  ".into()),
            ..GoalRecord::default()
        };
        assert!(!record.has_monthly_goal());
    }

    #[test]
    fn test_stored_field_names() {
        let record = GoalRecord {
            monthly_goal: Some("read".into()),
            ..GoalRecord::default()
        };
        let doc = record.to_document().unwrap();
        assert!(doc.contains_key("monthlyGoal"));
        assert_eq!(doc["weeklyGoals"][0], json!({ "goal": "", "note": "" }));
    }
}
