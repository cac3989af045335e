//! Month-scoped access to goal records and member profiles.

use std::sync::Arc;

use serde_json::Value;

use super::{GoalKey, GoalRecord, WeekEntry};
use crate::backend::{Document, DocumentStore};
use crate::constants::{GOALS_COLLECTION, MEMBERS_COLLECTION};
use crate::error::{UntetheredError, UntetheredResult};
use crate::member::Member;
use crate::period::{self, Direction, Period, WeekIndex};

/// Read/modify/write facade over the `goals` and `users` collections.
///
/// Writes are read-modify-write without transactions. Two writers touching
/// different weeks of the same record can lose one update, because each
/// rewrites the whole `weeklyGoals` array. Callers refetch after writing.
pub struct GoalStore<B> {
    backend: Arc<B>,
}

impl<B> Clone for GoalStore<B> {
    fn clone(&self) -> Self {
        GoalStore {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: DocumentStore> GoalStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        GoalStore { backend }
    }

    /// Every registered member, in no particular order.
    pub async fn list_members(&self) -> UntetheredResult<Vec<Member>> {
        self.backend
            .scan(MEMBERS_COLLECTION)
            .await?
            .into_iter()
            .map(|(uid, document)| Member::from_document(&uid, document))
            .collect()
    }

    pub async fn member(&self, uid: &str) -> UntetheredResult<Option<Member>> {
        self.backend
            .get(MEMBERS_COLLECTION, uid)
            .await?
            .map(|document| Member::from_document(uid, document))
            .transpose()
    }

    pub fn current_period_key(&self) -> String {
        period::current_period_key()
    }

    pub fn adjacent_period_key(&self, key: &str, direction: Direction) -> UntetheredResult<String> {
        Ok(period::adjacent_period_key(key, direction)?)
    }

    /// Periods with a stored record for `uid`, most recent first.
    pub async fn list_periods(&self, uid: &str) -> UntetheredResult<Vec<Period>> {
        let mut periods: Vec<Period> = self
            .backend
            .scan(GOALS_COLLECTION)
            .await?
            .into_iter()
            .filter_map(|(key, _)| GoalKey::parse(&key).ok())
            .filter(|key| key.uid == uid)
            .map(|key| key.period)
            .collect();

        periods.sort_unstable_by(|a, b| b.cmp(a));
        periods.dedup();
        Ok(periods)
    }

    /// Same as [`list_periods`](Self::list_periods), formatted as "MM/YYYY".
    pub async fn list_periods_for_member(&self, uid: &str) -> UntetheredResult<Vec<String>> {
        Ok(self
            .list_periods(uid)
            .await?
            .into_iter()
            .map(|p| p.to_string())
            .collect())
    }

    /// The record for `uid` in `period` (default: current month).
    /// A missing record yields the empty default shape.
    pub async fn get_goal_record(
        &self,
        uid: &str,
        period: Option<Period>,
    ) -> UntetheredResult<GoalRecord> {
        let key = Self::key(uid, period);
        Ok(self.load(&key).await?.unwrap_or_default())
    }

    /// Write the monthly goal once. Fails with `AlreadySet` if the record
    /// already carries a non-empty monthly goal.
    pub async fn set_monthly_goal(
        &self,
        uid: &str,
        text: &str,
        period: Option<Period>,
    ) -> UntetheredResult<()> {
        let key = Self::key(uid, period);
        let document_key = key.to_document_key();

        match self.load(&key).await? {
            Some(record) if record.has_monthly_goal() => {
                return Err(UntetheredError::AlreadySet(document_key));
            }
            Some(_) => {
                let mut fields = Document::new();
                fields.insert("monthlyGoal".into(), Value::String(text.to_string()));
                self.backend
                    .update(GOALS_COLLECTION, &document_key, fields)
                    .await?;
            }
            None => {
                let record = GoalRecord {
                    monthly_goal: Some(text.to_string()),
                    ..GoalRecord::default()
                };
                self.backend
                    .set(GOALS_COLLECTION, &document_key, record.to_document()?)
                    .await?;
            }
        }

        tracing::info!(key = %document_key, "monthly goal set");
        Ok(())
    }

    /// Replace one week's goal, keeping its note. Does not check whether the
    /// goal was already set; that is the caller's contract.
    pub async fn set_weekly_goal(
        &self,
        uid: &str,
        week: WeekIndex,
        text: &str,
        period: Option<Period>,
    ) -> UntetheredResult<()> {
        self.update_week(Self::key(uid, period), week, |entry| {
            entry.goal = text.to_string();
        })
        .await
    }

    /// Replace one week's note, keeping its goal.
    pub async fn set_weekly_note(
        &self,
        uid: &str,
        week: WeekIndex,
        text: &str,
        period: Option<Period>,
    ) -> UntetheredResult<()> {
        self.update_week(Self::key(uid, period), week, |entry| {
            entry.note = text.to_string();
        })
        .await
    }

    fn key(uid: &str, period: Option<Period>) -> GoalKey {
        GoalKey::new(uid, period.unwrap_or_else(Period::current))
    }

    async fn load(&self, key: &GoalKey) -> UntetheredResult<Option<GoalRecord>> {
        self.backend
            .get(GOALS_COLLECTION, &key.to_document_key())
            .await?
            .map(GoalRecord::from_document)
            .transpose()
    }

    async fn update_week(
        &self,
        key: GoalKey,
        week: WeekIndex,
        apply: impl FnOnce(&mut WeekEntry),
    ) -> UntetheredResult<()> {
        let document_key = key.to_document_key();
        let existing = self.load(&key).await?;
        let exists = existing.is_some();

        let mut record = existing.unwrap_or_default();
        apply(record.week_mut(week));

        if exists {
            let mut fields = Document::new();
            fields.insert(
                "weeklyGoals".into(),
                serde_json::to_value(&record.weekly_goals)?,
            );
            self.backend
                .update(GOALS_COLLECTION, &document_key, fields)
                .await?;
        } else {
            self.backend
                .set(GOALS_COLLECTION, &document_key, record.to_document()?)
                .await?;
        }

        tracing::info!(key = %document_key, week = week.get(), "week updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    fn store() -> (Arc<MemoryBackend>, GoalStore<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), GoalStore::new(backend))
    }

    fn period(key: &str) -> Option<Period> {
        Some(key.parse().unwrap())
    }

    fn week(i: usize) -> WeekIndex {
        WeekIndex::new(i).unwrap()
    }

    #[tokio::test]
    async fn test_missing_record_is_default_shape() {
        let (_, store) = store();
        let record = store.get_goal_record("u1", period("03/2025")).await.unwrap();
        assert_eq!(record.monthly_goal, None);
        assert_eq!(record.weekly_goals, vec![WeekEntry::default(); 4]);
    }

    #[tokio::test]
    async fn test_monthly_goal_is_write_once() {
        let (_, store) = store();
        store.set_monthly_goal("u1", "A", period("03/2025")).await.unwrap();

        let second = store.set_monthly_goal("u1", "B", period("03/2025")).await;
        assert!(matches!(second, Err(UntetheredError::AlreadySet(ref k)) if k == "u1_03_2025"));

        let record = store.get_goal_record("u1", period("03/2025")).await.unwrap();
        assert_eq!(record.monthly_goal.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_monthly_goal_on_existing_record_keeps_weeks() {
        let (_, store) = store();
        store
            .set_weekly_goal("u1", week(1), "stretch", period("03/2025"))
            .await
            .unwrap();
        store.set_monthly_goal("u1", "move more", period("03/2025")).await.unwrap();

        let record = store.get_goal_record("u1", period("03/2025")).await.unwrap();
        assert_eq!(record.monthly_goal.as_deref(), Some("move more"));
        assert_eq!(record.weekly_goals[1].goal, "stretch");
    }

    #[tokio::test]
    async fn test_weekly_goal_and_note_touch_one_index() {
        let (_, store) = store();
        store.set_monthly_goal("u1", "fitness", period("03/2025")).await.unwrap();
        store
            .set_weekly_goal("u1", week(2), "run", period("03/2025"))
            .await
            .unwrap();
        store
            .set_weekly_note("u1", week(2), "felt good", period("03/2025"))
            .await
            .unwrap();

        let record = store.get_goal_record("u1", period("03/2025")).await.unwrap();
        assert_eq!(
            record.weekly_goals[2],
            WeekEntry {
                goal: "run".into(),
                note: "felt good".into()
            }
        );
        for i in [0, 1, 3] {
            assert_eq!(record.weekly_goals[i], WeekEntry::default());
        }
        assert_eq!(record.monthly_goal.as_deref(), Some("fitness"));
    }

    #[tokio::test]
    async fn test_weekly_note_is_idempotent() {
        let (_, store) = store();
        store
            .set_weekly_note("u1", week(0), "steady", period("03/2025"))
            .await
            .unwrap();
        let once = store.get_goal_record("u1", period("03/2025")).await.unwrap();

        store
            .set_weekly_note("u1", week(0), "steady", period("03/2025"))
            .await
            .unwrap();
        let twice = store.get_goal_record("u1", period("03/2025")).await.unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_weekly_goal_without_prior_record() {
        let (_, store) = store();
        let before = store.get_goal_record("u1", period("03/2025")).await.unwrap();
        assert_eq!(before, GoalRecord::default());

        store
            .set_weekly_goal("u1", week(0), "read 1 book", period("03/2025"))
            .await
            .unwrap();

        let record = store.get_goal_record("u1", period("03/2025")).await.unwrap();
        assert_eq!(record.monthly_goal, None);
        assert_eq!(record.weekly_goals[0].goal, "read 1 book");
        assert_eq!(record.weekly_goals[0].note, "");
    }

    #[tokio::test]
    async fn test_store_overwrites_weekly_goal_when_called_directly() {
        let (_, store) = store();
        store
            .set_weekly_goal("u1", week(3), "first", period("03/2025"))
            .await
            .unwrap();
        store
            .set_weekly_goal("u1", week(3), "second", period("03/2025"))
            .await
            .unwrap();
        let record = store.get_goal_record("u1", period("03/2025")).await.unwrap();
        assert_eq!(record.weekly_goals[3].goal, "second");
    }

    #[tokio::test]
    async fn test_legacy_short_week_array_is_padded_on_write() {
        let (backend, store) = store();
        let legacy = crate::backend::to_document(&json!({
            "monthlyGoal": "old",
            "weeklyGoals": [{ "goal": "a", "note": "b" }]
        }))
        .unwrap();
        backend.set(GOALS_COLLECTION, "u1_01_2024", legacy).await.unwrap();

        store
            .set_weekly_note("u1", week(3), "late", period("01/2024"))
            .await
            .unwrap();

        let stored = backend.get(GOALS_COLLECTION, "u1_01_2024").await.unwrap().unwrap();
        let weeks = stored["weeklyGoals"].as_array().unwrap();
        assert_eq!(weeks.len(), 4);
        assert_eq!(weeks[0], json!({ "goal": "a", "note": "b" }));
        assert_eq!(weeks[3], json!({ "goal": "", "note": "late" }));
    }

    #[tokio::test]
    async fn test_list_periods_sorted_descending_and_scoped_to_member() {
        let (_, store) = store();
        for (uid, key) in [
            ("u1", "03/2025"),
            ("u1", "12/2024"),
            ("u1", "01/2025"),
            ("u1", "11/2025"),
            ("u1_x", "02/2025"),
            ("u2", "04/2025"),
        ] {
            store.set_weekly_note(uid, week(0), "n", period(key)).await.unwrap();
        }

        let periods = store.list_periods_for_member("u1").await.unwrap();
        assert_eq!(periods, vec!["11/2025", "03/2025", "01/2025", "12/2024"]);

        let parsed: Vec<Period> = periods.iter().map(|p| p.parse().unwrap()).collect();
        assert!(parsed.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn test_list_members() {
        let (backend, store) = store();
        backend
            .set(
                MEMBERS_COLLECTION,
                "u1",
                crate::backend::to_document(&json!({ "displayName": "Ada" })).unwrap(),
            )
            .await
            .unwrap();

        let members = store.list_members().await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].uid, "u1");
        assert_eq!(members[0].label(), "Ada");

        assert!(store.member("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_members_propagates_backend_failure() {
        let (backend, store) = store();
        backend.fail_next(1);
        assert!(matches!(
            store.list_members().await,
            Err(UntetheredError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_default_period_is_current_month() {
        let (_, store) = store();
        store.set_monthly_goal("u1", "now", None).await.unwrap();
        let periods = store.list_periods_for_member("u1").await.unwrap();
        assert_eq!(periods, vec![store.current_period_key()]);
    }

    #[test]
    fn test_adjacent_period_key_via_store() {
        let (_, store) = store();
        assert_eq!(
            store.adjacent_period_key("12/2024", Direction::Next).unwrap(),
            "01/2025"
        );
        assert!(store.adjacent_period_key("bogus", Direction::Next).is_err());
    }
}
