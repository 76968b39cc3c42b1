//! Ending live meetings for classes, events and custom sessions.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::AppError;
use crate::model::class::YogaClass;
use crate::model::custom_session::{CustomSession, SessionStatus};
use crate::model::event::Event;
use crate::store::{Collection, Record};

/// Video-meeting backend. Removing a meeting is best effort.
#[async_trait]
pub trait MeetingProvider: Send + Sync {
    async fn delete_meeting(&self, token: &str, meeting_id: &str) -> anyhow::Result<()>;
}

/// Zoom-compatible REST client: `DELETE {base}/meetings/{id}`.
pub struct HttpMeetingProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMeetingProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn meeting_url(&self, meeting_id: &str) -> String {
        format!("{}/meetings/{}", self.base_url, meeting_id)
    }
}

#[async_trait]
impl MeetingProvider for HttpMeetingProvider {
    async fn delete_meeting(&self, token: &str, meeting_id: &str) -> anyhow::Result<()> {
        self.client
            .delete(self.meeting_url(meeting_id))
            .bearer_auth(token)
            .header(USER_AGENT, "Zoom-api-Jwt-Request")
            .send()
            .await
            .context("meeting API unreachable")?
            .error_for_status()
            .context("meeting API rejected the delete")?;
        Ok(())
    }
}

/// Anything that can host a live meeting.
pub trait MeetingHost {
    const NOUN: &'static str;

    /// Clears the meeting number and marks the meeting as no longer live.
    fn end_meeting(&mut self);
}

impl MeetingHost for YogaClass {
    const NOUN: &'static str = "Class";

    fn end_meeting(&mut self) {
        self.meeting_number.clear();
        self.status = false;
    }
}

impl MeetingHost for Event {
    const NOUN: &'static str = "Event";

    fn end_meeting(&mut self) {
        self.meeting_number.clear();
        self.status = false;
    }
}

impl MeetingHost for CustomSession {
    const NOUN: &'static str = "Session";

    fn end_meeting(&mut self) {
        self.meeting_number.clear();
        self.status = SessionStatus::Completed;
    }
}

/// Credentials for removing the meeting on the provider's side.
#[derive(Debug, Clone)]
pub struct ExternalMeeting {
    pub token: String,
    pub meeting_id: String,
}

/// Ends the meeting of document `id`, then asks the provider to delete the
/// external meeting. Provider failures are logged and otherwise ignored.
pub async fn end_meeting<T>(
    hosts: &Collection<T>,
    provider: &dyn MeetingProvider,
    id: u64,
    external: Option<ExternalMeeting>,
) -> Result<Record<T>, AppError>
where
    T: MeetingHost + Serialize + DeserializeOwned,
{
    let (record, ()) = hosts
        .update_with(id, |host| {
            host.end_meeting();
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", T::NOUN)))?;

    info!(collection = hosts.name(), id, "Meeting ended");

    if let Some(external) = external {
        if let Err(e) = provider
            .delete_meeting(&external.token, &external.meeting_id)
            .await
        {
            warn!(error = %e, meeting_id = %external.meeting_id, "Failed to remove external meeting");
        }
    }

    Ok(record)
}
