use std::sync::Arc;

use crate::config::Config;
use crate::model::availability::AvailabilitySlot;
use crate::model::class::YogaClass;
use crate::model::custom_session::CustomSession;
use crate::model::event::Event;
use crate::model::mood::Mood;
use crate::model::teacher::Teacher;
use crate::model::tracker::Tracker;
use crate::model::user::User;
use crate::service::meetings::MeetingProvider;
use crate::store::{Collection, DocumentStore};
use crate::utils::contact_index::ContactIndex;

/// Shared per-process state handed to every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub users: Collection<User>,
    pub teachers: Collection<Teacher>,
    pub classes: Collection<YogaClass>,
    pub events: Collection<Event>,
    pub sessions: Collection<CustomSession>,
    pub moods: Collection<Mood>,
    pub trackers: Collection<Tracker>,
    pub availability: Collection<AvailabilitySlot>,
    pub contacts: Arc<ContactIndex>,
    pub meetings: Arc<dyn MeetingProvider>,
    /// What the weekly stats report for a day without attendance.
    pub weekly_empty_day_default: i64,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        meetings: Arc<dyn MeetingProvider>,
        config: &Config,
    ) -> Self {
        let retries = config.store_write_retries;
        Self {
            users: Collection::new("users", store.clone(), retries),
            teachers: Collection::new("teachers", store.clone(), retries),
            classes: Collection::new("classes", store.clone(), retries),
            events: Collection::new("events", store.clone(), retries),
            sessions: Collection::new("custom_sessions", store.clone(), retries),
            moods: Collection::new("moods", store.clone(), retries),
            trackers: Collection::new("trackers", store.clone(), retries),
            availability: Collection::new("availability", store, retries),
            contacts: Arc::new(ContactIndex::new()),
            meetings,
            weekly_empty_day_default: config.weekly_empty_day_default,
        }
    }
}
