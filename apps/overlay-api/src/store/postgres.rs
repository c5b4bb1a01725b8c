use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use overlay_common::{ChannelId, ViewerId};
use uuid::Uuid;

use crate::adapters::{ItemCatalog, OverlayIdVerifier, SelectedItemLookup};
use crate::db::pool::DbPool;
use crate::db::schema::{channels, items, ownership, selections};
use crate::error::ApiError;
use crate::models::item::Item;
use crate::models::ownership::{NewOwnership, NewSelection};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SelectedItemLookup for PgStore {
    async fn selected_image(&self, channel: &ChannelId, viewer: &ViewerId) -> Result<Option<String>, ApiError> {
        let mut conn = self.pool.get().await?;

        let selected: Option<String> = diesel_async::RunQueryDsl::get_result(
            selections::table
                .inner_join(items::table)
                .filter(selections::channel_id.eq(channel.as_str()))
                .filter(selections::user_id.eq(viewer.as_str()))
                .select(items::image),
            &mut conn,
        )
        .await
        .optional()?;

        if selected.is_some() {
            return Ok(selected);
        }

        let fallback: Option<String> = diesel_async::RunQueryDsl::get_result(
            items::table
                .filter(items::is_default.eq(true))
                .select(items::image),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(fallback)
    }
}

#[async_trait]
impl ItemCatalog for PgStore {
    async fn item_by_name(&self, name: &str) -> Result<Option<Item>, ApiError> {
        let mut conn = self.pool.get().await?;
        let item = diesel_async::RunQueryDsl::get_result(
            items::table
                .filter(items::name.eq(name))
                .select(Item::as_select()),
            &mut conn,
        )
        .await
        .optional()?;
        Ok(item)
    }

    async fn item_by_id(&self, id: Uuid) -> Result<Option<Item>, ApiError> {
        let mut conn = self.pool.get().await?;
        let item = diesel_async::RunQueryDsl::get_result(
            items::table.find(id).select(Item::as_select()),
            &mut conn,
        )
        .await
        .optional()?;
        Ok(item)
    }

    async fn select_item(&self, channel: &ChannelId, viewer: &ViewerId, item_id: Uuid) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now();

        diesel_async::RunQueryDsl::execute(
            diesel::insert_into(selections::table)
                .values(NewSelection {
                    channel_id: channel.as_str(),
                    user_id: viewer.as_str(),
                    item_id,
                    updated_at: now,
                })
                .on_conflict((selections::channel_id, selections::user_id))
                .do_update()
                .set((
                    selections::item_id.eq(item_id),
                    selections::updated_at.eq(now),
                )),
            &mut conn,
        )
        .await?;
        Ok(())
    }

    async fn grant_item(&self, viewer: &ViewerId, item_id: Uuid) -> Result<(), ApiError> {
        let mut conn = self.pool.get().await?;

        diesel_async::RunQueryDsl::execute(
            diesel::insert_into(ownership::table)
                .values(NewOwnership {
                    user_id: viewer.as_str(),
                    item_id,
                    granted_at: Utc::now(),
                })
                .on_conflict_do_nothing(),
            &mut conn,
        )
        .await?;
        Ok(())
    }

    async fn owns_item(&self, viewer: &ViewerId, item_id: Uuid) -> Result<bool, ApiError> {
        let mut conn = self.pool.get().await?;

        let owned: bool = diesel_async::RunQueryDsl::get_result(
            diesel::select(diesel::dsl::exists(
                ownership::table
                    .filter(ownership::user_id.eq(viewer.as_str()))
                    .filter(ownership::item_id.eq(item_id)),
            )),
            &mut conn,
        )
        .await?;
        Ok(owned)
    }
}

#[async_trait]
impl OverlayIdVerifier for PgStore {
    async fn verify(&self, channel: &ChannelId, overlay_id: &Uuid) -> Result<bool, ApiError> {
        let mut conn = self.pool.get().await?;

        let bound: Option<Uuid> = diesel_async::RunQueryDsl::get_result(
            channels::table
                .find(channel.as_str())
                .select(channels::overlay_id),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(bound.as_ref() == Some(overlay_id))
    }
}
