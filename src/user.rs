use crate::orm::users;
use chrono::Utc;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use serde::Serialize;

/// The authenticated caller, as resolved for a single request.
#[derive(Clone, Debug, Serialize)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub is_admin: bool,
}

impl From<users::Model> for Profile {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            is_admin: user.is_admin,
        }
    }
}

impl Profile {
    /// Returns the profile for `name`, if such a user exists.
    pub async fn get_by_name<C>(db: &C, name: &str) -> Result<Option<Self>, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(users::Entity::find()
            .filter(users::Column::Name.eq(name))
            .one(db)
            .await?
            .map(Self::from))
    }

    /// Returns the profile for `name`, creating the user row if it is missing.
    pub async fn get_or_provision<C>(db: &C, name: &str) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(profile) = Self::get_by_name(db, name).await? {
            return Ok(profile);
        }

        let user = users::ActiveModel {
            name: Set(name.to_owned()),
            is_admin: Set(false),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        match user.insert(db).await {
            Ok(model) => {
                log::info!("Provisioned user {} ({})", model.name, model.id);
                Ok(model.into())
            }
            // Another request provisioned the same name first.
            Err(e) if crate::db::is_unique_violation(&e) => Self::get_by_name(db, name)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(format!("user {}", name))),
            Err(e) => Err(e),
        }
    }
}

/// Maps user ids to names, for decorating listings.
pub async fn get_names<C>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<std::collections::HashMap<i32, String>, DbErr>
where
    C: ConnectionTrait,
{
    let mut ids: Vec<i32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(Default::default());
    }

    Ok(users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}
