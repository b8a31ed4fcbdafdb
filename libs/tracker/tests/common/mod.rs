#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracker::calendar::start_of_day;
use tracker::{Clock, FixedClock, InMemoryStore, NewHabit, Store, Tracker, User};
use uuid::Uuid;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()
}

pub fn days_ago(n: i64) -> NaiveDate {
    today() - Duration::days(n)
}

pub struct Harness {
    pub store: InMemoryStore,
    pub tracker: Tracker,
}

impl Harness {
    /// Tracker whose clock sits at noon on `today()`
    pub fn new() -> Self {
        Self::at(Arc::new(FixedClock::on(today())))
    }

    pub fn at(clock: Arc<dyn Clock>) -> Self {
        let store = InMemoryStore::new();
        let tracker = Tracker::with_clock(Arc::new(store.clone()), clock);
        Harness { store, tracker }
    }

    pub fn over(store: Arc<dyn Store>, backing: InMemoryStore) -> Self {
        let tracker = Tracker::with_clock(store, Arc::new(FixedClock::on(today())));
        Harness {
            store: backing,
            tracker,
        }
    }

    pub async fn user(&self, username: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.store
            .insert_user(User {
                id,
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: Some("hash".to_string()),
                google_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        id
    }

    /// Habit created `age` days before `today()`
    pub async fn habit_aged(&self, creator: Uuid, age: i64, duration_days: u32) -> Uuid {
        let created = start_of_day(days_ago(age));
        let backdated = Tracker::with_clock(
            Arc::new(self.store.clone()),
            Arc::new(FixedClock(created)),
        );
        backdated
            .create_habit(
                creator,
                NewHabit {
                    name: "Meditate".to_string(),
                    description: String::new(),
                    frequency: Default::default(),
                    duration_days,
                    target_value: 10.0,
                    unit: "minutes".to_string(),
                },
            )
            .await
            .unwrap()
            .id
    }
}
