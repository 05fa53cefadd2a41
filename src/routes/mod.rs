use axum::routing::{delete, get, post};
use axum::Router;

pub mod attendance;
pub mod auth;
pub mod clothing;
pub mod events;
pub mod profile;
pub mod roles;
pub mod users;

pub fn router() -> Router {
    Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/password", post(auth::change_password))
        .route("/api/events", get(events::all).post(events::create))
        .route(
            "/api/events/:id",
            get(events::detail)
                .patch(events::update)
                .delete(events::remove),
        )
        .route(
            "/api/attendance",
            get(attendance::upcoming_for_self).post(attendance::submit),
        )
        .route("/api/admin/attendance", get(attendance::overview))
        .route("/api/users", get(users::all).post(users::create))
        .route(
            "/api/users/:id",
            get(users::detail)
                .patch(users::update)
                .delete(users::remove),
        )
        .route("/api/users/:id/history", get(users::history))
        .route("/api/roles", get(roles::all).post(roles::create))
        .route(
            "/api/roles/:id",
            get(roles::detail)
                .patch(roles::update)
                .delete(roles::remove),
        )
        .route(
            "/api/clothing",
            get(clothing::for_self).post(clothing::create),
        )
        .route("/api/clothing/:id", delete(clothing::remove))
        .route(
            "/api/profile/requests",
            get(profile::pending)
                .post(profile::submit)
                .patch(profile::decide),
        )
}
