//! Habit tracking domain
//!
//! Models, the per-day completion ledger, streak and completion-rate
//! calculators, storage ports and the services that tie them together.
//! Persistence adapters live with the services; this crate ships an
//! in-memory store that the tests run against.

pub mod calendar;
pub mod completion;
pub mod error;
pub mod groups;
pub mod habits;
pub mod memory;
pub mod models;
pub mod progress;
pub mod service;
pub mod stats;
pub mod store;
pub mod streak;

pub use calendar::{Clock, DayRange, FixedClock, SystemClock};
pub use error::{TrackerError, TrackerResult};
pub use memory::InMemoryStore;
pub use models::{
    Frequency, Group, Habit, NewGroup, NewHabit, ProgressEntry, RecordCompletion, UpdateGroup,
    UpdateHabit, User,
};
pub use service::Tracker;
pub use stats::{HabitStats, MemberStats};
pub use store::{GroupStore, HabitStore, ProgressStore, Store, UserStore};
