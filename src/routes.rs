use crate::{
    api::{
        availability, classes, contacts, events, moods, sessions, teachers,
        trackers::{self, TrackerRoute},
        users,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{Scope, middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let burst = requests_per_min.max(1);
        let per_ms = (60_000 / burst as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_else(GovernorConfig::default);
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Malformed bodies, queries and path segments answer like any other
    // validation failure.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    );

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/user/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::user_login)),
            )
            .service(
                web::resource("/teacher/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::teacher_login)),
            )
            .service(
                web::resource("/signup")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(users::create_user)),
            )
            .service(
                web::resource("/check-mobile")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(users::check_mobile)),
            )
            .service(
                web::resource("/check-email")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(users::check_email)),
            )
            .service(
                web::resource("/check-mobile-both")
                    .wrap(login_limiter)
                    .route(web::post().to(contacts::check_mobile_both)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/users")
                    .service(web::resource("").route(web::get().to(users::list_users)))
                    .service(
                        web::resource("/find/{mobile}").route(web::get().to(users::find_by_mobile)),
                    )
                    // /users/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(users::get_user))
                            .route(web::patch().to(users::update_user))
                            .route(web::delete().to(users::delete_user)),
                    )
                    .service(
                        web::resource("/{id}/update-token")
                            .route(web::post().to(users::update_notification_token)),
                    )
                    .service(
                        web::resource("/{id}/add-achievement")
                            .route(web::put().to(users::add_achievement)),
                    )
                    .service(
                        web::resource("/{id}/add-assessment")
                            .route(web::put().to(users::add_assessment)),
                    )
                    .service(
                        web::resource("/{id}/submit-assessment-form")
                            .route(web::post().to(users::submit_assessment_form)),
                    )
                    .service(web::resource("/{id}/join").route(web::post().to(users::join_class)))
                    .service(web::resource("/{id}/leave").route(web::post().to(users::leave_class)))
                    .service(web::resource("/{id}/stats").route(web::get().to(users::user_stats)))
                    .service(
                        web::resource("/{id}/weekly-stats").route(web::get().to(users::weekly_stats)),
                    ),
            )
            .service(
                web::scope("/teachers")
                    .service(
                        web::resource("")
                            .route(web::post().to(teachers::create_teacher))
                            .route(web::get().to(teachers::list_teachers)),
                    )
                    .service(
                        web::resource("/check-mobile").route(web::post().to(teachers::check_mobile)),
                    )
                    // /teachers/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(teachers::get_teacher))
                            .route(web::patch().to(teachers::update_teacher))
                            .route(web::delete().to(teachers::delete_teacher)),
                    )
                    .service(web::resource("/{id}/join").route(web::post().to(teachers::join_class)))
                    .service(
                        web::resource("/{id}/leave").route(web::post().to(teachers::leave_class)),
                    )
                    .service(
                        web::resource("/{id}/weekly-stats")
                            .route(web::get().to(teachers::weekly_stats)),
                    ),
            )
            .service(
                web::scope("/classes")
                    .service(
                        web::resource("")
                            .route(web::post().to(classes::create_class))
                            .route(web::get().to(classes::list_classes)),
                    )
                    .service(
                        web::resource("/predefined")
                            .route(web::post().to(classes::add_predefined_classes)),
                    )
                    .service(
                        web::resource("/upcoming").route(web::get().to(classes::upcoming_classes)),
                    )
                    .service(
                        web::resource("/teacher/{teacherId}")
                            .route(web::get().to(classes::classes_by_teacher)),
                    )
                    .service(
                        web::resource("/student/{studentId}")
                            .route(web::get().to(classes::student_classes)),
                    )
                    .service(
                        web::resource("/student/{studentId}/upcoming")
                            .route(web::get().to(classes::student_upcoming_classes)),
                    )
                    // /classes/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(classes::get_class))
                            .route(web::patch().to(classes::update_class))
                            .route(web::delete().to(classes::delete_class)),
                    )
                    .service(
                        web::resource("/{id}/students/{studentId}")
                            .route(web::post().to(classes::enroll_student))
                            .route(web::delete().to(classes::remove_student))
                            .route(web::get().to(classes::is_enrolled)),
                    )
                    .service(
                        web::resource("/{id}/teacher/{teacherId}")
                            .route(web::put().to(classes::assign_teacher)),
                    )
                    .service(
                        web::resource("/{id}/end-meeting").route(web::post().to(classes::end_meeting)),
                    ),
            )
            .service(
                web::scope("/events")
                    .service(
                        web::resource("")
                            .route(web::post().to(events::create_event))
                            .route(web::get().to(events::list_events)),
                    )
                    .service(
                        web::resource("/upcoming").route(web::get().to(events::upcoming_events)),
                    )
                    .service(
                        web::resource("/user/{userId}").route(web::get().to(events::user_events)),
                    )
                    .service(
                        web::resource("/user/{userId}/upcoming")
                            .route(web::get().to(events::user_upcoming_events)),
                    )
                    // /events/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(events::get_event))
                            .route(web::patch().to(events::update_event))
                            .route(web::delete().to(events::delete_event)),
                    )
                    .service(
                        web::resource("/{id}/end-meeting").route(web::post().to(events::end_meeting)),
                    )
                    .service(
                        web::resource("/{id}/register").route(web::post().to(events::register_user)),
                    )
                    .service(
                        web::resource("/{id}/students").route(web::get().to(events::event_students)),
                    ),
            )
            .service(
                web::scope("/sessions")
                    .service(
                        web::resource("")
                            .route(web::post().to(sessions::create_session))
                            .route(web::get().to(sessions::list_sessions)),
                    )
                    .service(
                        web::resource("/user/{userId}").route(web::get().to(sessions::user_sessions)),
                    )
                    .service(
                        web::resource("/user/{userId}/upcoming")
                            .route(web::get().to(sessions::user_upcoming_sessions)),
                    )
                    .service(
                        web::resource("/user/{userId}/{sessionId}")
                            .route(web::get().to(sessions::user_session_detail)),
                    )
                    .service(
                        web::resource("/teacher/{teacherId}")
                            .route(web::get().to(sessions::teacher_sessions)),
                    )
                    // /sessions/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(sessions::get_session))
                            .route(web::patch().to(sessions::update_session))
                            .route(web::delete().to(sessions::delete_session)),
                    )
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(sessions::approve_session)),
                    )
                    .service(
                        web::resource("/{id}/end-meeting")
                            .route(web::post().to(sessions::end_meeting)),
                    ),
            )
            .service(tracker_scope("/step-tracker", TrackerRoute::USER_STEPS, "steps"))
            .service(tracker_scope("/water-intake", TrackerRoute::USER_WATER, "intake"))
            .service(tracker_scope(
                "/teacher-water-intake",
                TrackerRoute::TEACHER_WATER,
                "intake",
            ))
            .service(
                web::scope("/availability")
                    .service(
                        web::resource("").route(web::post().to(availability::create_availability)),
                    )
                    .service(
                        web::resource("/teacher/{teacherId}")
                            .route(web::get().to(availability::list_teacher_availability)),
                    )
                    .service(
                        web::resource("/available-slots/{teacherId}/{date}")
                            .route(web::get().to(availability::available_slots)),
                    )
                    // /availability/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::patch().to(availability::update_availability))
                            .route(web::delete().to(availability::delete_availability)),
                    ),
            )
            .service(
                web::scope("/moods")
                    .service(web::resource("").route(web::post().to(moods::add_mood)))
                    .service(
                        web::resource("/{userId}/history").route(web::get().to(moods::mood_history)),
                    )
                    .service(
                        web::resource("/{userId}/latest").route(web::get().to(moods::latest_mood)),
                    )
                    .service(web::resource("/{moodId}").route(web::delete().to(moods::delete_mood))),
            ),
    );
}

/// One tracker scope; `entry_alias` is the metric's own name for
/// `/{ownerId}/entries` (`steps`, `intake`).
fn tracker_scope(path: &str, route: TrackerRoute, entry_alias: &str) -> Scope {
    web::scope(path)
        .app_data(web::Data::new(route))
        .service(web::resource("/initialize").route(web::post().to(trackers::initialize)))
        .service(web::resource("/{ownerId}/goal").route(web::patch().to(trackers::update_goal)))
        .service(web::resource("/{ownerId}/entries").route(web::post().to(trackers::record_entry)))
        .service(
            web::resource(format!("/{{ownerId}}/{entry_alias}"))
                .route(web::post().to(trackers::record_entry)),
        )
        .service(web::resource("/{ownerId}/today").route(web::get().to(trackers::today)))
        .service(web::resource("/{ownerId}/history").route(web::get().to(trackers::history)))
        .service(web::resource("/{ownerId}/range").route(web::get().to(trackers::range)))
}
