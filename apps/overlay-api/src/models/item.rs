use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::schema::items;

/// A cosmetic a viewer can own and select for their avatar.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize, ToSchema)]
#[diesel(table_name = items)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    /// Image shown on the overlay when this item is selected.
    pub image: String,
    /// Shown for viewers with no selection. Usable without ownership.
    pub is_default: bool,
}

impl Item {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            image: image.into(),
            is_default: false,
        }
    }

    pub fn default_item(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            is_default: true,
            ..Self::new(name, image)
        }
    }
}
