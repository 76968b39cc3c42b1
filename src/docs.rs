use crate::api::availability::{CreateSlot, UpdateSlot};
use crate::api::classes::EndMeetingRequest;
use crate::api::events::RegisterRequest;
use crate::api::moods::{AddMood, MoodHistory};
use crate::api::sessions::{ApproveSession, CreateSession};
use crate::api::trackers::{InitializeTracker, RecordEntry, UpdateGoal};
use crate::api::users::{
    AchievementRequest, AssessmentFormRequest, AssessmentRequest, ClassRef, EmailRequest,
    JoinResponse, MobileRequest, NotificationTokenRequest, StatsQuery,
};
use crate::api::MessageResponse;
use crate::auth::handlers::{LoginRequest, LoginResponse};
use crate::model::availability::{AvailabilitySlot, SlotStatus};
use crate::model::class::YogaClass;
use crate::model::custom_session::SessionStatus;
use crate::model::event::Event;
use crate::model::mood::Mood;
use crate::model::owner::{Owner, OwnerKind};
use crate::model::tracker::{DailySummary, Entry, Metric, Tracker};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wellness API",
        version = "1.0.0",
        description = r#"
## Yoga & Wellness Platform

Backend for a yoga and wellness app: students join live classes and events,
teachers publish their availability, and both keep daily habit trackers.

### 🔹 Key Features
- **Users & Teachers**
  - Sign up, log in, profiles, achievements and assessments
- **Classes & Events**
  - Scheduling, enrollment, joining and leaving live sessions, ending meetings
- **Custom Sessions**
  - One-to-one sessions requested by users and approved by staff
- **Trackers**
  - Daily steps and water intake with goals, history and ranges
- **Availability**
  - Teacher time slots with overlap protection
- **Moods**
  - Mood journal with history

### 🔐 Security
Everything under `/api/v1` requires a **JWT Bearer** token from
`/auth/user/login` or `/auth/teacher/login`.

### 📦 Response Format
- `{"status": "success", "data": ...}` on success
- `{"status": "fail", "message": ...}` on client errors

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::user_login,
        crate::auth::handlers::teacher_login,

        crate::api::users::create_user,
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::find_by_mobile,
        crate::api::users::update_user,
        crate::api::users::delete_user,
        crate::api::users::check_mobile,
        crate::api::users::check_email,
        crate::api::users::update_notification_token,
        crate::api::users::add_achievement,
        crate::api::users::add_assessment,
        crate::api::users::submit_assessment_form,
        crate::api::users::join_class,
        crate::api::users::leave_class,
        crate::api::users::user_stats,
        crate::api::users::weekly_stats,
        crate::api::contacts::check_mobile_both,

        crate::api::teachers::create_teacher,
        crate::api::teachers::list_teachers,
        crate::api::teachers::get_teacher,
        crate::api::teachers::update_teacher,
        crate::api::teachers::delete_teacher,
        crate::api::teachers::check_mobile,
        crate::api::teachers::join_class,
        crate::api::teachers::leave_class,
        crate::api::teachers::weekly_stats,

        crate::api::classes::create_class,
        crate::api::classes::add_predefined_classes,
        crate::api::classes::list_classes,
        crate::api::classes::upcoming_classes,
        crate::api::classes::get_class,
        crate::api::classes::update_class,
        crate::api::classes::delete_class,
        crate::api::classes::classes_by_teacher,
        crate::api::classes::student_classes,
        crate::api::classes::student_upcoming_classes,
        crate::api::classes::enroll_student,
        crate::api::classes::remove_student,
        crate::api::classes::is_enrolled,
        crate::api::classes::assign_teacher,
        crate::api::classes::end_meeting,

        crate::api::events::create_event,
        crate::api::events::list_events,
        crate::api::events::upcoming_events,
        crate::api::events::get_event,
        crate::api::events::update_event,
        crate::api::events::delete_event,
        crate::api::events::end_meeting,
        crate::api::events::register_user,
        crate::api::events::event_students,
        crate::api::events::user_events,
        crate::api::events::user_upcoming_events,

        crate::api::sessions::create_session,
        crate::api::sessions::list_sessions,
        crate::api::sessions::get_session,
        crate::api::sessions::update_session,
        crate::api::sessions::delete_session,
        crate::api::sessions::approve_session,
        crate::api::sessions::user_sessions,
        crate::api::sessions::user_upcoming_sessions,
        crate::api::sessions::user_session_detail,
        crate::api::sessions::teacher_sessions,
        crate::api::sessions::end_meeting,

        crate::api::trackers::initialize,
        crate::api::trackers::update_goal,
        crate::api::trackers::record_entry,
        crate::api::trackers::today,
        crate::api::trackers::history,
        crate::api::trackers::range,

        crate::api::availability::create_availability,
        crate::api::availability::update_availability,
        crate::api::availability::delete_availability,
        crate::api::availability::list_teacher_availability,
        crate::api::availability::available_slots,

        crate::api::moods::add_mood,
        crate::api::moods::mood_history,
        crate::api::moods::latest_mood,
        crate::api::moods::delete_mood
    ),
    components(
        schemas(
            MessageResponse,
            LoginRequest,
            LoginResponse,
            ClassRef,
            NotificationTokenRequest,
            AchievementRequest,
            AssessmentRequest,
            AssessmentFormRequest,
            StatsQuery,
            JoinResponse,
            MobileRequest,
            EmailRequest,
            EndMeetingRequest,
            YogaClass,
            RegisterRequest,
            Event,
            CreateSession,
            ApproveSession,
            SessionStatus,
            InitializeTracker,
            UpdateGoal,
            RecordEntry,
            Tracker,
            Entry,
            DailySummary,
            Metric,
            Owner,
            OwnerKind,
            CreateSlot,
            UpdateSlot,
            AvailabilitySlot,
            SlotStatus,
            AddMood,
            Mood,
            MoodHistory
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login APIs"),
        (name = "Users", description = "User profile and attendance APIs"),
        (name = "Teachers", description = "Teacher profile and attendance APIs"),
        (name = "Classes", description = "Class scheduling and enrollment APIs"),
        (name = "Events", description = "Event APIs"),
        (name = "Sessions", description = "Custom one-to-one session APIs"),
        (name = "Trackers", description = "Step and water intake tracking APIs"),
        (name = "Availability", description = "Teacher availability APIs"),
        (name = "Moods", description = "Mood journal APIs"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme the protected paths refer to.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
