//! Join/leave bookkeeping for classes.
//!
//! Per (participant, class) the states are not joined, joined and left.
//! Joining is idempotent; leaving again recomputes duration and calories
//! from the original join time. There is no way back to "not joined".

use chrono::NaiveDateTime;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, Attendee, KCAL_PER_MINUTE};
use crate::model::class::YogaClass;
use crate::store::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(NaiveDateTime),
    AlreadyJoined(NaiveDateTime),
}

impl JoinOutcome {
    pub fn joined_at(self) -> NaiveDateTime {
        match self {
            JoinOutcome::Joined(at) | JoinOutcome::AlreadyJoined(at) => at,
        }
    }
}

pub fn join(log: &mut Vec<AttendanceRecord>, class_id: u64, now: NaiveDateTime) -> JoinOutcome {
    if let Some(existing) = log.iter().find(|r| r.class_id == class_id) {
        return JoinOutcome::AlreadyJoined(existing.joined_at);
    }
    log.push(AttendanceRecord::joined(class_id, now));
    JoinOutcome::Joined(now)
}

/// Completes the record for `class_id`; `None` when it was never joined.
pub fn leave(
    log: &mut [AttendanceRecord],
    class_id: u64,
    now: NaiveDateTime,
) -> Option<AttendanceRecord> {
    let record = log.iter_mut().find(|r| r.class_id == class_id)?;

    let elapsed_ms = (now - record.joined_at).num_milliseconds();
    let minutes = (elapsed_ms as f64 / 60_000.0).round() as i64;

    record.left_at = Some(now);
    record.duration_minutes = Some(minutes);
    record.kcal_burned = Some(minutes * KCAL_PER_MINUTE);
    Some(record.clone())
}

fn owner_not_found<T: Attendee>() -> AppError {
    AppError::not_found(format!("{} not found", T::KIND.title()))
}

pub async fn join_class<T>(
    owners: &Collection<T>,
    classes: &Collection<YogaClass>,
    owner_id: u64,
    class_id: u64,
    now: NaiveDateTime,
) -> Result<JoinOutcome, AppError>
where
    T: Attendee + Serialize + DeserializeOwned,
{
    let owner = owners.get(owner_id).await?.ok_or_else(owner_not_found::<T>)?;

    if classes.get(class_id).await?.is_none() {
        return Err(AppError::not_found("Class not found"));
    }

    if let Some(existing) = owner.doc.attendance().iter().find(|r| r.class_id == class_id) {
        return Ok(JoinOutcome::AlreadyJoined(existing.joined_at));
    }

    let (_, outcome) = owners
        .update_with(owner_id, |doc| {
            let outcome = join(doc.attendance_mut(), class_id, now);
            if matches!(outcome, JoinOutcome::Joined(_)) {
                doc.touch(now);
            }
            Ok::<_, AppError>(outcome)
        })
        .await?
        .ok_or_else(owner_not_found::<T>)?;

    if let JoinOutcome::Joined(at) = outcome {
        let kind = T::KIND;
        info!(%kind, owner_id, class_id, joined_at = %at, "Joined class");
    }
    Ok(outcome)
}

pub async fn leave_class<T>(
    owners: &Collection<T>,
    owner_id: u64,
    class_id: u64,
    now: NaiveDateTime,
) -> Result<AttendanceRecord, AppError>
where
    T: Attendee + Serialize + DeserializeOwned,
{
    let (_, record) = owners
        .update_with(owner_id, |doc| {
            let record = leave(doc.attendance_mut(), class_id, now).ok_or_else(|| {
                AppError::not_found(format!("{} did not join this class", T::KIND.title()))
            })?;
            doc.touch(now);
            Ok::<_, AppError>(record)
        })
        .await?
        .ok_or_else(owner_not_found::<T>)?;

    let kind = T::KIND;
    info!(
        %kind,
        owner_id,
        class_id,
        duration_minutes = record.duration_minutes,
        "Left class"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::User;
    use crate::store::{DocumentStore, MemoryStore};
    use chrono::{Duration, NaiveDate};
    use serde_json::json;
    use std::sync::Arc;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 20)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    struct Fixture {
        users: Collection<User>,
        classes: Collection<YogaClass>,
        user_id: u64,
        class_id: u64,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let users = Collection::<User>::new("users", store.clone(), 3);
        let classes = Collection::<YogaClass>::new("classes", store, 3);

        let user: User = serde_json::from_value(json!({
            "name": "Mira",
            "companyId": "ACME",
            "createdAt": "2025-04-01T00:00:00",
            "updatedAt": "2025-04-01T00:00:00"
        }))
        .unwrap();
        let user_id = users.insert(user).await.unwrap().id;

        let class: YogaClass = serde_json::from_value(json!({
            "title": "Sun Salutation Flow",
            "startTime": "07:00",
            "endTime": "08:15",
            "schedule": "2025-04-20"
        }))
        .unwrap();
        let class_id = classes.insert(class).await.unwrap().id;

        Fixture {
            users,
            classes,
            user_id,
            class_id,
        }
    }

    #[actix_web::test]
    async fn joining_twice_keeps_first_join_time() {
        let f = fixture().await;

        let first = join_class(&f.users, &f.classes, f.user_id, f.class_id, at(7, 0, 0))
            .await
            .unwrap();
        assert_eq!(first, JoinOutcome::Joined(at(7, 0, 0)));

        let second = join_class(&f.users, &f.classes, f.user_id, f.class_id, at(7, 10, 0))
            .await
            .unwrap();
        assert_eq!(second, JoinOutcome::AlreadyJoined(at(7, 0, 0)));

        let user = f.users.get(f.user_id).await.unwrap().unwrap();
        assert_eq!(user.doc.attendance.len(), 1);
    }

    #[actix_web::test]
    async fn half_hour_class_burns_150_kcal() {
        let f = fixture().await;
        join_class(&f.users, &f.classes, f.user_id, f.class_id, at(7, 0, 0))
            .await
            .unwrap();

        let record = leave_class(&f.users, f.user_id, f.class_id, at(7, 30, 0))
            .await
            .unwrap();
        assert_eq!(record.duration_minutes, Some(30));
        assert_eq!(record.kcal_burned, Some(150));
        assert_eq!(record.left_at, Some(at(7, 30, 0)));
    }

    #[actix_web::test]
    async fn leaving_again_recomputes_from_join() {
        let f = fixture().await;
        join_class(&f.users, &f.classes, f.user_id, f.class_id, at(7, 0, 0))
            .await
            .unwrap();
        leave_class(&f.users, f.user_id, f.class_id, at(7, 30, 0))
            .await
            .unwrap();

        let again = leave_class(&f.users, f.user_id, f.class_id, at(7, 45, 0))
            .await
            .unwrap();
        assert_eq!(again.duration_minutes, Some(45));
        assert_eq!(again.kcal_burned, Some(225));

        let user = f.users.get(f.user_id).await.unwrap().unwrap();
        assert_eq!(user.doc.attendance.len(), 1);
        assert_eq!(user.doc.updated_at, at(7, 45, 0));
    }

    #[actix_web::test]
    async fn missing_participants_and_classes_are_not_found() {
        let f = fixture().await;

        let no_user = join_class(&f.users, &f.classes, 999, f.class_id, at(7, 0, 0)).await;
        assert!(matches!(no_user, Err(AppError::NotFound(m)) if m == "User not found"));

        let no_class = join_class(&f.users, &f.classes, f.user_id, 999, at(7, 0, 0)).await;
        assert!(matches!(no_class, Err(AppError::NotFound(m)) if m == "Class not found"));

        let never_joined = leave_class(&f.users, f.user_id, f.class_id, at(8, 0, 0)).await;
        assert!(matches!(never_joined, Err(AppError::NotFound(_))));
    }

    #[test]
    fn duration_rounds_to_nearest_minute() {
        let mut log = vec![AttendanceRecord::joined(1, at(7, 0, 0))];

        let rounded_up = leave(&mut log, 1, at(7, 0, 0) + Duration::seconds(90)).unwrap();
        assert_eq!(rounded_up.duration_minutes, Some(2));

        let rounded_down = leave(&mut log, 1, at(7, 0, 0) + Duration::seconds(89)).unwrap();
        assert_eq!(rounded_down.duration_minutes, Some(1));

        assert!(leave(&mut log, 2, at(8, 0, 0)).is_none());
    }
}
