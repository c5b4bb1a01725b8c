use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::schema::{ownership, selections};

#[derive(Debug, Insertable)]
#[diesel(table_name = ownership)]
pub struct NewOwnership<'a> {
    pub user_id: &'a str,
    pub item_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = selections)]
pub struct NewSelection<'a> {
    pub channel_id: &'a str,
    pub user_id: &'a str,
    pub item_id: Uuid,
    pub updated_at: DateTime<Utc>,
}
