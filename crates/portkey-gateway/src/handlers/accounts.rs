use crate::extract::Requester;
use crate::model::CurrentUserResponse;
use axum::Json;

pub async fn current_user_handler(Requester(identity): Requester) -> Json<CurrentUserResponse> {
    Json(identity.into())
}
