//! Teacher availability slots.
//!
//! Active slots of one teacher on one date never intersect as half-open
//! intervals `[startTime, endTime)`. Every write re-checks that against the
//! stored slots before persisting.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info};

use crate::error::AppError;
use crate::model::availability::{AvailabilitySlot, SlotStatus};
use crate::model::teacher::Teacher;
use crate::store::{Collection, Filter, Record, StoreError};

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub teacher_id: u64,
    pub session: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub availability_for: String,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct SlotChanges {
    pub session: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub availability_for: Option<String>,
    pub status: Option<SlotStatus>,
}

/// Half-open interval intersection. Abutting intervals do not overlap.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

fn check_window(start: NaiveTime, end: NaiveTime) -> Result<(), AppError> {
    if start < end {
        Ok(())
    } else {
        Err(AppError::validation("startTime must be before endTime"))
    }
}

fn overlap_conflict() -> AppError {
    AppError::conflict("Time slot overlaps with existing availability")
}

fn slot_not_found() -> AppError {
    AppError::not_found("Availability not found")
}

/// True when an active slot of `teacher_id` on `date`, other than
/// `exclude_id`, intersects `[start, end)`.
pub async fn has_overlap(
    slots: &Collection<AvailabilitySlot>,
    teacher_id: u64,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_id: Option<u64>,
) -> Result<bool, StoreError> {
    let same_day = Filter::new()
        .eq("teacherId", teacher_id)
        .eq("date", date.to_string())
        .eq("isActive", true);

    Ok(slots.find(&same_day).await?.iter().any(|slot| {
        Some(slot.id) != exclude_id
            && intervals_overlap(slot.doc.start_time, slot.doc.end_time, start, end)
    }))
}

pub async fn create(
    slots: &Collection<AvailabilitySlot>,
    teachers: &Collection<Teacher>,
    input: NewSlot,
    now: NaiveDateTime,
) -> Result<Record<AvailabilitySlot>, AppError> {
    check_window(input.start_time, input.end_time)?;

    if teachers.get(input.teacher_id).await?.is_none() {
        return Err(AppError::not_found("Teacher not found"));
    }

    if has_overlap(
        slots,
        input.teacher_id,
        input.date,
        input.start_time,
        input.end_time,
        None,
    )
    .await?
    {
        return Err(overlap_conflict());
    }

    let record = slots
        .insert(AvailabilitySlot {
            teacher_id: input.teacher_id,
            session: input.session,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            availability_for: input.availability_for,
            status: SlotStatus::Available,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;

    info!(slot_id = record.id, teacher_id = input.teacher_id, date = %input.date, "Availability created");
    Ok(record)
}

/// Applies `changes`, checking the merged date and times for overlap with
/// the teacher's other active slots.
pub async fn update(
    slots: &Collection<AvailabilitySlot>,
    id: u64,
    changes: SlotChanges,
    now: NaiveDateTime,
) -> Result<Record<AvailabilitySlot>, AppError> {
    let current = slots.get(id).await?.ok_or_else(slot_not_found)?;

    let date = changes.date.unwrap_or(current.doc.date);
    let start = changes.start_time.unwrap_or(current.doc.start_time);
    let end = changes.end_time.unwrap_or(current.doc.end_time);
    check_window(start, end)?;

    if has_overlap(slots, current.doc.teacher_id, date, start, end, Some(id)).await? {
        return Err(overlap_conflict());
    }

    let (record, ()) = slots
        .update_with(id, |slot| {
            slot.date = date;
            slot.start_time = start;
            slot.end_time = end;
            if let Some(session) = &changes.session {
                slot.session = session.clone();
            }
            if let Some(purpose) = &changes.availability_for {
                slot.availability_for = purpose.clone();
            }
            if let Some(status) = changes.status {
                slot.status = status;
            }
            slot.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(slot_not_found)?;

    debug!(slot_id = id, "Availability updated");
    Ok(record)
}

/// Soft delete: the slot stays stored with `isActive = false`.
pub async fn delete(
    slots: &Collection<AvailabilitySlot>,
    id: u64,
    now: NaiveDateTime,
) -> Result<Record<AvailabilitySlot>, AppError> {
    let (record, ()) = slots
        .update_with(id, |slot| {
            slot.is_active = false;
            slot.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(slot_not_found)?;

    info!(slot_id = id, "Availability deactivated");
    Ok(record)
}

/// Soft-deletes every active slot of a teacher. Returns how many changed.
pub async fn deactivate_for_teacher(
    slots: &Collection<AvailabilitySlot>,
    teacher_id: u64,
    now: NaiveDateTime,
) -> Result<usize, AppError> {
    let active = list_for_teacher(slots, teacher_id, None, None).await?;
    for slot in &active {
        delete(slots, slot.id, now).await?;
    }
    Ok(active.len())
}

/// Bookable slots of a teacher on `date`, earliest first.
pub async fn available_slots(
    slots: &Collection<AvailabilitySlot>,
    teacher_id: u64,
    date: NaiveDate,
    availability_for: Option<&str>,
) -> Result<Vec<Record<AvailabilitySlot>>, StoreError> {
    let mut filter = Filter::new()
        .eq("teacherId", teacher_id)
        .eq("date", date.to_string())
        .eq("status", SlotStatus::Available.as_ref())
        .eq("isActive", true);
    if let Some(purpose) = availability_for {
        filter = filter.eq("availabilityFor", purpose);
    }

    slots.find_sorted(&filter, &["startTime"]).await
}

/// All active slots of a teacher, by date then start time.
pub async fn list_for_teacher(
    slots: &Collection<AvailabilitySlot>,
    teacher_id: u64,
    date: Option<NaiveDate>,
    status: Option<SlotStatus>,
) -> Result<Vec<Record<AvailabilitySlot>>, StoreError> {
    let mut filter = Filter::new()
        .eq("teacherId", teacher_id)
        .eq("isActive", true);
    if let Some(date) = date {
        filter = filter.eq("date", date.to_string());
    }
    if let Some(status) = status {
        filter = filter.eq("status", status.as_ref());
    }

    slots.find_sorted(&filter, &["date", "startTime"]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore};
    use std::sync::Arc;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        day(1).and_hms_opt(9, 0, 0).unwrap()
    }

    struct Fixture {
        slots: Collection<AvailabilitySlot>,
        teachers: Collection<Teacher>,
        teacher_id: u64,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let teachers = Collection::<Teacher>::new("teachers", store.clone(), 3);
        let teacher = teachers
            .insert(Teacher {
                name: "Asha".into(),
                email: None,
                mobile: None,
                password: String::new(),
                gender: None,
                description: None,
                experience: None,
                qualification: vec![],
                additional_courses: vec![],
                attendance: vec![],
                status: true,
                created_at: now(),
                updated_at: now(),
            })
            .await
            .unwrap();

        Fixture {
            slots: Collection::new("availability", store, 3),
            teachers,
            teacher_id: teacher.id,
        }
    }

    fn slot(teacher_id: u64, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> NewSlot {
        NewSlot {
            teacher_id,
            session: "morning".into(),
            date,
            start_time: start,
            end_time: end,
            availability_for: "custom-session".into(),
        }
    }

    #[test]
    fn overlap_is_half_open_and_symmetric() {
        let cases = [
            ((hm(9, 0), hm(10, 0)), (hm(10, 0), hm(11, 0)), false),
            ((hm(9, 0), hm(10, 30)), (hm(10, 0), hm(11, 0)), true),
            ((hm(9, 0), hm(12, 0)), (hm(10, 0), hm(11, 0)), true),
            ((hm(9, 0), hm(10, 0)), (hm(9, 0), hm(10, 0)), true),
        ];
        for ((a0, a1), (b0, b1), expected) in cases {
            assert_eq!(intervals_overlap(a0, a1, b0, b1), expected);
            assert_eq!(intervals_overlap(b0, b1, a0, a1), expected);
        }
    }

    #[actix_web::test]
    async fn overlapping_create_conflicts_and_abutting_is_accepted() {
        let f = fixture().await;
        let t = f.teacher_id;

        create(&f.slots, &f.teachers, slot(t, day(20), hm(8, 0), hm(9, 0)), now())
            .await
            .unwrap();

        let clash = create(&f.slots, &f.teachers, slot(t, day(20), hm(8, 30), hm(9, 30)), now()).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let next = create(&f.slots, &f.teachers, slot(t, day(20), hm(9, 0), hm(10, 0)), now())
            .await
            .unwrap();
        assert_eq!(next.doc.status, SlotStatus::Available);
        assert!(next.doc.is_active);

        // same times on another day are fine
        create(&f.slots, &f.teachers, slot(t, day(21), hm(8, 30), hm(9, 30)), now())
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn create_validates_window_and_teacher() {
        let f = fixture().await;

        let inverted =
            create(&f.slots, &f.teachers, slot(f.teacher_id, day(20), hm(10, 0), hm(9, 0)), now()).await;
        assert!(matches!(inverted, Err(AppError::Validation(_))));

        let unknown = create(&f.slots, &f.teachers, slot(999, day(20), hm(8, 0), hm(9, 0)), now()).await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn slot_never_overlaps_itself_on_update() {
        let f = fixture().await;
        let t = f.teacher_id;
        let first = create(&f.slots, &f.teachers, slot(t, day(20), hm(8, 0), hm(9, 0)), now())
            .await
            .unwrap();
        create(&f.slots, &f.teachers, slot(t, day(20), hm(10, 0), hm(11, 0)), now())
            .await
            .unwrap();

        assert!(has_overlap(&f.slots, t, day(20), hm(8, 0), hm(9, 0), None).await.unwrap());
        assert!(!has_overlap(&f.slots, t, day(20), hm(8, 0), hm(9, 0), Some(first.id)).await.unwrap());

        let widened = update(
            &f.slots,
            first.id,
            SlotChanges {
                end_time: Some(hm(9, 45)),
                ..SlotChanges::default()
            },
            now(),
        )
        .await
        .unwrap();
        assert_eq!(widened.doc.start_time, hm(8, 0));
        assert_eq!(widened.doc.end_time, hm(9, 45));

        let clash = update(
            &f.slots,
            first.id,
            SlotChanges {
                end_time: Some(hm(10, 30)),
                ..SlotChanges::default()
            },
            now(),
        )
        .await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let stored = f.slots.get(first.id).await.unwrap().unwrap();
        assert_eq!(stored.doc.end_time, hm(9, 45));
    }

    #[actix_web::test]
    async fn update_uses_merged_date() {
        let f = fixture().await;
        let t = f.teacher_id;
        let moving = create(&f.slots, &f.teachers, slot(t, day(20), hm(8, 0), hm(9, 0)), now())
            .await
            .unwrap();
        create(&f.slots, &f.teachers, slot(t, day(21), hm(8, 30), hm(9, 30)), now())
            .await
            .unwrap();

        let result = update(
            &f.slots,
            moving.id,
            SlotChanges {
                date: Some(day(21)),
                ..SlotChanges::default()
            },
            now(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let missing = update(&f.slots, 4242, SlotChanges::default(), now()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn soft_deleted_slots_free_their_time() {
        let f = fixture().await;
        let t = f.teacher_id;
        let gone = create(&f.slots, &f.teachers, slot(t, day(20), hm(8, 0), hm(9, 0)), now())
            .await
            .unwrap();

        let deleted = delete(&f.slots, gone.id, now()).await.unwrap();
        assert!(!deleted.doc.is_active);
        assert!(f.slots.get(gone.id).await.unwrap().is_some());

        create(&f.slots, &f.teachers, slot(t, day(20), hm(8, 30), hm(9, 30)), now())
            .await
            .unwrap();

        let missing = delete(&f.slots, 4242, now()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn available_slots_sorted_and_filtered() {
        let f = fixture().await;
        let t = f.teacher_id;
        for (start, end) in [(hm(14, 0), hm(15, 0)), (hm(7, 0), hm(8, 0)), (hm(10, 0), hm(11, 0))] {
            create(&f.slots, &f.teachers, slot(t, day(20), start, end), now())
                .await
                .unwrap();
        }
        let booked = create(&f.slots, &f.teachers, slot(t, day(20), hm(16, 0), hm(17, 0)), now())
            .await
            .unwrap();
        update(
            &f.slots,
            booked.id,
            SlotChanges {
                status: Some(SlotStatus::Booked),
                ..SlotChanges::default()
            },
            now(),
        )
        .await
        .unwrap();
        let mut other = slot(t, day(20), hm(18, 0), hm(19, 0));
        other.availability_for = "class".into();
        create(&f.slots, &f.teachers, other, now()).await.unwrap();

        let starts: Vec<_> = available_slots(&f.slots, t, day(20), Some("custom-session"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.doc.start_time)
            .collect();
        assert_eq!(starts, vec![hm(7, 0), hm(10, 0), hm(14, 0)]);

        let all = available_slots(&f.slots, t, day(20), None).await.unwrap();
        assert_eq!(all.len(), 4);

        let listed = list_for_teacher(&f.slots, t, None, Some(SlotStatus::Booked))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, booked.id);
    }
}
