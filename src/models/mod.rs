pub mod attendance;
pub mod clothing;
pub mod event;
pub mod profile_request;
pub mod role;
pub mod user;
