use crate::{
    client::Client,
    errors::{RepoError, ValidationError},
    models::{Restaurant, RestaurantInput, RestaurantPatch, User, UserPatch},
};

/// Only restaurant owners and admins may own a restaurant.
async fn ensure_owner(client: &Client, owner_id: &str) -> Result<(), RepoError> {
    let owner = client.collection::<User>().get_or_error(owner_id).await?;
    if owner.role.can_own_restaurants() {
        Ok(())
    } else {
        Err(ValidationError::single(
            "owner_id",
            "validation.role",
            "owner must have role restaurant_owner or admin",
        )
        .into())
    }
}

pub async fn create_restaurant(client: &Client, input: RestaurantInput) -> Result<Restaurant, RepoError> {
    ensure_owner(client, &input.owner_id).await?;
    client.collection::<Restaurant>().create(input).await
}

pub async fn update_restaurant(client: &Client, id: &str, patch: RestaurantPatch) -> Result<Restaurant, RepoError> {
    if let Some(owner_id) = &patch.owner_id {
        ensure_owner(client, owner_id).await?;
    }
    client.collection::<Restaurant>().update(id, patch).await
}

/// A user who still owns restaurants keeps a role that may own them.
pub async fn update_user(client: &Client, id: &str, patch: UserPatch) -> Result<User, RepoError> {
    let demoted = patch.role.is_some_and(|role| !role.can_own_restaurants());
    if demoted {
        let owned = client.collection::<Restaurant>().count_related("owner", id).await?;
        if owned > 0 {
            return Err(RepoError::Restricted {
                collection: "users".into(),
                entity_id: id.to_string(),
                dependents: "restaurants".into(),
            });
        }
    }
    client.collection::<User>().update(id, patch).await
}
