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
    },
    services::{media::read_upload, photos::PhotoService},
    AppState,
};

const GALLERY: PhotoCollection = PhotoCollection::Gallery;

pub async fn list_photos(State(state): State<AppState>, _user: AuthenticatedUser) -> AppResult<Json<Vec<Photo>>> {
    Ok(Json(PhotoService::list(&state.db, GALLERY).await?))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Photo>)> {
    let upload = read_upload(multipart).await?;
    let photo = PhotoService::upload(&state.db, &state.storage, GALLERY, &user.email, upload).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

pub async fn update_caption(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCaptionRequest>,
) -> AppResult<Json<Photo>> {
    PhotoService::update_caption(&state.db, GALLERY, id, &body.caption)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Photo"))
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ToggleReactionRequest>,
) -> AppResult<Json<Photo>> {
    PhotoService::toggle_reaction(&state.db, GALLERY, id, &body.emoji, &user.email)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Photo"))
}

pub async fn delete_photo(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if PhotoService::delete(&state.db, &state.storage, GALLERY, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Photo"))
    }
}
