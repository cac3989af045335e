//! Goal tracker: the interactive state behind the monthly goal view.
//!
//! Holds the selected member and period, the loaded record, per-week input
//! buffers and a page of goal history. Backend failures never escape; they
//! become [`Notification`]s.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::time::{Interval, MissedTickBehavior};

use crate::backend::DocumentStore;
use crate::constants::{DEFAULT_HISTORY_PAGE_SIZE, WEEKS_PER_MONTH};
use crate::error::{UntetheredError, UntetheredResult, ValidationError};
use crate::goal::{GoalRecord, GoalStore};
use crate::period::{Direction, Period, WeekIndex};

/// Source of "today", injectable so rollover can be tested.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A user-facing message produced by a tracker action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

pub struct GoalTracker<B> {
    store: GoalStore<B>,
    clock: Arc<dyn Clock>,
    viewer: Option<String>,
    selected: Option<String>,
    period: Period,
    pinned_to_current: bool,
    record: GoalRecord,
    monthly_input: String,
    goal_inputs: [String; WEEKS_PER_MONTH],
    note_inputs: [String; WEEKS_PER_MONTH],
    saving_week: Option<WeekIndex>,
    history: Vec<Period>,
    page: usize,
    page_size: usize,
    notifications: Vec<Notification>,
}

impl<B: DocumentStore> GoalTracker<B> {
    /// A tracker pinned to the current month, showing the viewer's own goals.
    /// Nothing is fetched until [`load`](Self::load).
    pub fn new(store: GoalStore<B>, viewer: Option<String>, clock: Arc<dyn Clock>) -> Self {
        let period = Period::containing(clock.today());
        GoalTracker {
            store,
            clock,
            selected: viewer.clone(),
            viewer,
            period,
            pinned_to_current: true,
            record: GoalRecord::default(),
            monthly_input: String::new(),
            goal_inputs: Default::default(),
            note_inputs: Default::default(),
            saving_week: None,
            history: Vec::new(),
            page: 1,
            page_size: DEFAULT_HISTORY_PAGE_SIZE,
            notifications: Vec::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    // ACCESSORS:

    pub fn viewer(&self) -> Option<&str> {
        self.viewer.as_deref()
    }

    pub fn selected_member(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn is_pinned_to_current(&self) -> bool {
        self.pinned_to_current
    }

    pub fn record(&self) -> &GoalRecord {
        &self.record
    }

    pub fn monthly_input(&self) -> &str {
        &self.monthly_input
    }

    pub fn goal_input(&self, week: WeekIndex) -> &str {
        &self.goal_inputs[week.get()]
    }

    pub fn note_input(&self, week: WeekIndex) -> &str {
        &self.note_inputs[week.get()]
    }

    pub fn saving_week(&self) -> Option<WeekIndex> {
        self.saving_week
    }

    pub fn current_period(&self) -> Period {
        Period::containing(self.clock.today())
    }

    pub fn current_week(&self) -> WeekIndex {
        WeekIndex::for_date(self.clock.today())
    }

    /// Drain pending notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // EDITABILITY:

    fn viewing_own_current(&self) -> bool {
        self.viewer.is_some()
            && self.viewer == self.selected
            && self.period == self.current_period()
    }

    pub fn can_edit_monthly(&self) -> bool {
        self.viewing_own_current() && !self.record.has_monthly_goal()
    }

    /// Only the current week of the viewer's own current month, and only
    /// once a monthly goal exists.
    pub fn can_edit_week(&self, week: WeekIndex) -> bool {
        self.viewing_own_current()
            && week == self.current_week()
            && self.record.has_monthly_goal()
    }

    /// A week's goal is writable until it has been set once.
    pub fn can_edit_week_goal(&self, week: WeekIndex) -> bool {
        self.can_edit_week(week) && !self.record.week(week).has_goal()
    }

    // SELECTION + NAVIGATION:

    /// Fetch the record and history for the current selection.
    pub async fn load(&mut self) {
        self.page = 1;
        self.refresh_record().await;

        let Some(uid) = self.selected.clone() else {
            self.history.clear();
            return;
        };
        match self.store.list_periods(&uid).await {
            Ok(history) => self.history = history,
            Err(e) => {
                self.history.clear();
                self.notify_error(format!("Failed to load goal history: {e}"));
            }
        }
    }

    pub fn set_viewer(&mut self, viewer: Option<String>) {
        if self.selected.is_none() {
            self.selected = viewer.clone();
        }
        self.viewer = viewer;
    }

    pub async fn select_member(&mut self, uid: impl Into<String>) {
        self.selected = Some(uid.into());
        self.load().await;
    }

    pub async fn select_period(&mut self, period: Period) {
        self.period = period;
        self.pinned_to_current = period == self.current_period();
        self.load().await;
    }

    /// Move one month. At the edge of the representable range the view
    /// stays put and an error is queued.
    pub async fn navigate(&mut self, direction: Direction) {
        match self.period.adjacent(direction) {
            Ok(period) => self.select_period(period).await,
            Err(e) => self.notify_failure(e.into()),
        }
    }

    pub async fn next_period(&mut self) {
        self.navigate(Direction::Next).await;
    }

    pub async fn previous_period(&mut self) {
        self.navigate(Direction::Previous).await;
    }

    pub async fn jump_to_current(&mut self) {
        self.select_period(self.current_period()).await;
    }

    /// Re-pin to the new month if the real month rolled over while the view
    /// was pinned to "current". Returns whether it re-pinned.
    pub async fn check_rollover(&mut self) -> bool {
        let current = self.current_period();
        if !self.pinned_to_current || self.period == current {
            return false;
        }

        tracing::info!(from = %self.period, to = %current, "month rolled over");
        self.select_period(current).await;
        true
    }

    // INPUT BUFFERS:

    pub fn edit_monthly_input(&mut self, text: impl Into<String>) {
        self.monthly_input = text.into();
    }

    pub fn edit_goal_input(&mut self, week: WeekIndex, text: impl Into<String>) {
        self.goal_inputs[week.get()] = text.into();
    }

    pub fn edit_note_input(&mut self, week: WeekIndex, text: impl Into<String>) {
        self.note_inputs[week.get()] = text.into();
    }

    // SAVING:

    /// Save the monthly goal buffer. Returns whether it was written.
    pub async fn set_monthly_goal(&mut self) -> bool {
        if !self.can_edit_monthly() {
            self.notify_error("The monthly goal can no longer be edited".into());
            return false;
        }
        let text = self.monthly_input.trim().to_string();
        if text.is_empty() {
            self.notify_failure(ValidationError::Required("Monthly goal").into());
            return false;
        }
        let Some(uid) = self.viewer.clone() else {
            return false;
        };

        match self.store.set_monthly_goal(&uid, &text, Some(self.period)).await {
            Ok(()) => {
                self.record.monthly_goal = Some(text);
                self.monthly_input.clear();
                if !self.history.contains(&self.period) {
                    self.history.push(self.period);
                    self.history.sort_unstable_by(|a, b| b.cmp(a));
                }
                self.notify_success("Monthly goal set".into());
                true
            }
            Err(e) => {
                self.notify_failure(e);
                false
            }
        }
    }

    /// Save one week: the goal if it was not set yet and the buffer has
    /// text, then always the note, so an empty note clears it. Refetches
    /// afterwards so the buffers match what was actually stored.
    pub async fn save_week(&mut self, week: WeekIndex) -> bool {
        if !self.can_edit_week(week) {
            self.notify_error(format!("{week} is read-only"));
            return false;
        }
        let goal = self.goal_inputs[week.get()].trim().to_string();
        let note = self.note_inputs[week.get()].clone();
        let Some(uid) = self.viewer.clone() else {
            return false;
        };

        self.saving_week = Some(week);
        let write_goal = !self.record.week(week).has_goal() && !goal.is_empty();
        let result: UntetheredResult<()> = async {
            if write_goal {
                self.store
                    .set_weekly_goal(&uid, week, &goal, Some(self.period))
                    .await?;
            }
            self.store
                .set_weekly_note(&uid, week, &note, Some(self.period))
                .await
        }
        .await;
        self.saving_week = None;

        match result {
            Ok(()) => {
                self.notify_success(format!("{week} saved"));
                self.refresh_record().await;
                true
            }
            Err(e) => {
                self.notify_failure(e);
                false
            }
        }
    }

    // HISTORY PAGINATION:

    pub fn history(&self) -> &[Period] {
        &self.history
    }

    /// 1-based page index.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.history.len().div_ceil(self.page_size).max(1)
    }

    pub fn history_page(&self) -> &[Period] {
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.history.len());
        self.history.get(start..end).unwrap_or(&[])
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.page_count());
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.page + 1);
    }

    pub fn previous_page(&mut self) {
        self.go_to_page(self.page.saturating_sub(1));
    }

    // INTERNAL:

    async fn refresh_record(&mut self) {
        let Some(uid) = self.selected.clone() else {
            self.record = GoalRecord::default();
            self.reseed_inputs();
            return;
        };

        self.record = match self.store.get_goal_record(&uid, Some(self.period)).await {
            Ok(record) => record,
            Err(e) => {
                self.notify_error(format!("Failed to load goals: {e}"));
                GoalRecord::default()
            }
        };
        self.reseed_inputs();
    }

    fn reseed_inputs(&mut self) {
        for week in WeekIndex::all() {
            let entry = self.record.week(week);
            self.goal_inputs[week.get()] = entry.goal.clone();
            self.note_inputs[week.get()] = entry.note.clone();
        }
    }

    fn notify_success(&mut self, message: String) {
        self.notifications.push(Notification {
            level: NotificationLevel::Success,
            message,
        });
    }

    fn notify_error(&mut self, message: String) {
        tracing::warn!("{message}");
        self.notifications.push(Notification {
            level: NotificationLevel::Error,
            message,
        });
    }

    fn notify_failure(&mut self, error: UntetheredError) {
        self.notify_error(error.to_string());
    }
}

/// Ticker for rollover checks. Missed ticks are delayed, not bunched.
pub fn rollover_interval(every: Duration) -> Interval {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
