//! Core of the untethered community app.
//!
//! - `backend`: the document/identity/blob collaborator traits plus a local
//!   filesystem backend and an in-memory one
//! - `goal`: goal records keyed per member per month, and `GoalStore`
//! - `tracker`: the goal-tracker view state machine
//! - `calendar` and `resource`: the shared calendar and resource library

pub mod auth;
pub mod backend;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod goal;
pub mod member;
pub mod period;
pub mod resource;
pub mod tracker;

pub use error::{UntetheredError, UntetheredResult, ValidationError};
pub use goal::{GoalKey, GoalRecord, GoalStore, WeekEntry};
pub use period::{Direction, Period, WeekIndex};
