use portkey_core::{Identity, OwnerId};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: OwnerId,
}

impl From<Option<Identity>> for CurrentUserResponse {
    fn from(identity: Option<Identity>) -> Self {
        Self {
            user: identity.map(|identity| UserSummary {
                id: identity.owner_id,
            }),
        }
    }
}
