pub mod auth;
pub mod family;
pub mod finance;
pub mod health;
pub mod media;
pub mod metrics;
pub mod photos;
pub mod trips;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

/// Every API route. Authentication is enforced per handler by its extractors.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/resend-verification", post(auth::resend_verification))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/me", get(auth::me))
        // Family tree
        .route("/family/members", get(family::list_members).post(family::create_member))
        .route(
            "/family/members/{id}",
            get(family::get_member).put(family::update_member).delete(family::delete_member),
        )
        .route("/family/members/{id}/relations", get(family::member_relations))
        .route("/family/members/{id}/picture", post(family::upload_picture))
        .route("/family/members/{id}/move", post(family::move_member))
        .route("/family/roots", get(family::list_roots))
        .route("/family/tree", get(family::family_tree))
        .route("/family/duplicates", get(family::list_duplicates))
        // Gallery
        .route("/photos", get(photos::list_photos).post(photos::upload_photo))
        .route("/photos/{id}", put(photos::update_caption).delete(photos::delete_photo))
        .route("/photos/{id}/reactions", post(photos::toggle_reaction))
        // Trips
        .route("/trips", get(trips::list_trips).post(trips::create_trip))
        .route("/trips/{id}", put(trips::update_trip).delete(trips::delete_trip))
        .route("/trips/{id}/photos", get(trips::list_trip_photos).post(trips::upload_trip_photo))
        .route(
            "/trips/{id}/photos/{photo_id}",
            put(trips::update_trip_photo_caption).delete(trips::delete_trip_photo),
        )
        .route(
            "/trips/{id}/photos/{photo_id}/reactions",
            post(trips::toggle_trip_photo_reaction),
        )
        // Finance (admin only)
        .route(
            "/finance/transactions",
            get(finance::list_transactions).post(finance::create_transaction),
        )
        .route(
            "/finance/transactions/{id}",
            put(finance::update_transaction).delete(finance::delete_transaction),
        )
        .route("/finance/assets", get(finance::list_assets).post(finance::create_asset))
        .route(
            "/finance/assets/{id}",
            put(finance::update_asset).delete(finance::delete_asset),
        )
        .route("/finance/report", get(finance::report))
        .route("/finance/net-worth", get(finance::net_worth))
        // Stored objects
        .route("/media/files/{*path}", get(media::serve_media))
}
