pub mod availability;
pub mod classes;
pub mod contacts;
pub mod events;
pub mod moods;
pub mod sessions;
pub mod teachers;
pub mod trackers;
pub mod users;

use actix_web::HttpResponse;
use serde::Serialize;
use utoipa::ToSchema;

/// Success body: `{"status": "success", "data": ...}`.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        status: "success",
        data,
    })
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope {
        status: "success",
        data,
    })
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    pub message: String,
}

pub fn message(text: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse {
        status: "success",
        message: text.into(),
    })
}
