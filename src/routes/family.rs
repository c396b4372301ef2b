use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    family::{find_duplicates, tree_view, FamilyGraph, TreeView},
    models::{
        auth::AuthenticatedUser,
        person::{CreatePersonRequest, MoveMemberRequest, Person, Relations, UpdatePersonRequest},
    },
    services::{media::read_upload, persons::PersonService},
    AppState,
};

fn to_json<T: Serialize>(value: &T) -> AppResult<Json<Value>> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| AppError::Internal(e.into()))
}

pub async fn list_members(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Vec<Person>>> {
    Ok(Json(PersonService::list(&state.db).await?))
}

pub async fn get_member(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Person>> {
    PersonService::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Family member"))
}

pub async fn create_member(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePersonRequest>,
) -> AppResult<(StatusCode, Json<Person>)> {
    let person = PersonService::create(&state.db, &user.email, &body).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

pub async fn update_member(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePersonRequest>,
) -> AppResult<Json<Person>> {
    PersonService::update(&state.db, id, &body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Family member"))
}

pub async fn delete_member(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if PersonService::delete(&state.db, &state.storage, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Family member"))
    }
}

pub async fn member_relations(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Relations>> {
    let members = PersonService::list(&state.db).await?;
    let graph = FamilyGraph::new(&members);
    let person = graph.get(id).ok_or(AppError::NotFound("Family member"))?;

    let owned = |people: Vec<&Person>| people.into_iter().cloned().collect::<Vec<_>>();
    Ok(Json(Relations {
        parents: owned(graph.parents_of(person)),
        children: owned(graph.children_of(person.id)),
        siblings: owned(graph.siblings_of(person)),
        spouse: graph.spouse_of(person).cloned(),
    }))
}

pub async fn upload_picture(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<Person>> {
    let upload = read_upload(multipart).await?;
    let person = PersonService::set_profile_picture(&state.db, &state.storage, id, upload).await?;
    Ok(Json(person))
}

pub async fn move_member(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MoveMemberRequest>,
) -> AppResult<Json<Value>> {
    let changes = PersonService::move_member(&state.db, id, body.direction)
        .await?
        .ok_or(AppError::NotFound("Family member"))?;
    Ok(Json(json!({ "changes": changes })))
}

pub async fn list_roots(State(state): State<AppState>, _user: AuthenticatedUser) -> AppResult<Json<Value>> {
    let members = PersonService::list(&state.db).await?;
    let graph = FamilyGraph::new(&members);
    to_json(&graph.root_members())
}

#[derive(Serialize)]
struct TreeResponse<'a> {
    /// Generation rows, unreached members last.
    generations: Vec<Vec<&'a Person>>,
    tree: TreeView<'a>,
}

pub async fn family_tree(State(state): State<AppState>, _user: AuthenticatedUser) -> AppResult<Json<Value>> {
    let members = PersonService::list(&state.db).await?;
    let graph = FamilyGraph::new(&members);
    let layout = graph.layout();
    let tree = tree_view(&layout);
    if !tree.hidden_ids.is_empty() {
        tracing::debug!("{} member(s) too deep for the tree view", tree.hidden_ids.len());
    }
    to_json(&TreeResponse {
        generations: layout.into_generations(),
        tree,
    })
}

pub async fn list_duplicates(State(state): State<AppState>, _user: AuthenticatedUser) -> AppResult<Json<Value>> {
    let members = PersonService::list(&state.db).await?;
    to_json(&find_duplicates(&members))
}
