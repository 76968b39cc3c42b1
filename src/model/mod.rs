pub mod attendance;
pub mod availability;
pub mod class;
pub mod custom_session;
pub mod event;
pub mod mood;
pub mod owner;
pub mod role;
pub mod teacher;
pub mod tracker;
pub mod user;
