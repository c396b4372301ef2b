use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::AuthenticatedUser,
        photo::{Photo, PhotoCollection, ToggleReactionRequest, UpdateCaptionRequest},
        trip::{CreateTripRequest, Trip, TripDeletion, UpdateTripRequest},
    },
    services::{media::read_upload, photos::PhotoService, trips::TripService},
    AppState,
};

pub async fn list_trips(State(state): State<AppState>, _user: AuthenticatedUser) -> AppResult<Json<Vec<Trip>>> {
    Ok(Json(TripService::list(&state.db).await?))
}

pub async fn create_trip(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateTripRequest>,
) -> AppResult<(StatusCode, Json<Trip>)> {
    let trip = TripService::create(&state.db, &user.email, &body).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

pub async fn update_trip(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTripRequest>,
) -> AppResult<Json<Trip>> {
    TripService::update(&state.db, id, &body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Trip"))
}

pub async fn delete_trip(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TripDeletion>> {
    let outcome = TripService::delete(&state.db, &state.storage, id).await?;
    Ok(Json(outcome))
}

pub async fn list_trip_photos(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Photo>>> {
    TripService::require(&state.db, id).await?;
    Ok(Json(PhotoService::list(&state.db, PhotoCollection::Trip(id)).await?))
}

pub async fn upload_trip_photo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Photo>)> {
    TripService::require(&state.db, id).await?;
    let upload = read_upload(multipart).await?;
    let photo =
        PhotoService::upload(&state.db, &state.storage, PhotoCollection::Trip(id), &user.email, upload).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

pub async fn update_trip_photo_caption(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateCaptionRequest>,
) -> AppResult<Json<Photo>> {
    PhotoService::update_caption(&state.db, PhotoCollection::Trip(id), photo_id, &body.caption)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Trip photo"))
}

pub async fn toggle_trip_photo_reaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ToggleReactionRequest>,
) -> AppResult<Json<Photo>> {
    PhotoService::toggle_reaction(&state.db, PhotoCollection::Trip(id), photo_id, &body.emoji, &user.email)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Trip photo"))
}

pub async fn delete_trip_photo(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    if PhotoService::delete(&state.db, &state.storage, PhotoCollection::Trip(id), photo_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Trip photo"))
    }
}
