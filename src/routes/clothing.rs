use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::models::clothing::{ClothingItem, NewClothingItem};
use crate::state::AppState;

pub async fn for_self(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Vec<ClothingItem>>> {
    Ok(Json(ClothingItem::for_user(claims.sub, &state.pool).await?))
}

pub async fn create(
    Session(claims): Session,
    Extension(state): Extension<AppState>,
    Json(new_item): Json<NewClothingItem>,
) -> ApiResult<Json<ClothingItem>> {
    let item = ClothingItem::create(claims.sub, new_item, &state.pool).await?;

    Ok(Json(item))
}

pub async fn remove(
    Session(claims): Session,
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
) -> ApiResult<StatusCode> {
    ClothingItem::delete(id, claims.sub, &state.pool).await?;

    Ok(StatusCode::NO_CONTENT)
}
