use crate::domain_model::*;
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::mysql::MySqlRow;
use uuid::Uuid;

pub fn store_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[inline]
pub fn uid_as_bytes(id: &UserId) -> &[u8] {
    id.0.as_bytes()
}

#[inline]
pub fn uid_from_bytes(id: &[u8]) -> Result<UserId, StoreError> {
    Ok(UserId(
        Uuid::from_slice(id).map_err(|e| StoreError::Database(e.to_string()))?,
    ))
}

pub fn row_to_user(row: MySqlRow) -> Result<User, StoreError> {
    let user_id_bytes: Vec<u8> = row.try_get("user_id").map_err(store_err)?;
    let user_id = uid_from_bytes(&user_id_bytes)?;

    let username: String = row.try_get("username").map_err(store_err)?;
    let authority: String = row.try_get("authority").map_err(store_err)?;
    let email: Option<String> = row.try_get("email").map_err(store_err)?;
    let is_activated: bool = row.try_get("is_activated").map_err(store_err)?;
    let sidebar_tutorial_dismissed: bool =
        row.try_get("sidebar_tutorial_dismissed").map_err(store_err)?;
    let registered_date: DateTime<Utc> = row.try_get("registered_date").map_err(store_err)?;

    Ok(User {
        user_id,
        username,
        authority,
        email,
        is_activated,
        sidebar_tutorial_dismissed,
        registered_date,
    })
}
