use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
};

use crate::{
    entity,
    models::{NewUser, User},
    store::{StoreError, StoreResult, UserOrder, UserStore},
};

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    db: DatabaseConnection,
}

impl PgUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn map_db_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::UniqueViolation(detail),
        _ => StoreError::Database(err.to_string()),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let model = entity::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_error)?;

        Ok(model.map(Into::into))
    }

    async fn find_page(
        &self,
        offset: u64,
        limit: u64,
        order: UserOrder,
    ) -> StoreResult<Vec<User>> {
        let query = match order {
            UserOrder::NewestFirst => entity::Entity::find()
                .order_by_desc(entity::Column::CreatedAt)
                .order_by_desc(entity::Column::Id),
            UserOrder::OldestFirst => entity::Entity::find()
                .order_by_asc(entity::Column::CreatedAt)
                .order_by_asc(entity::Column::Id),
        };

        let models = query
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_error)?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count_all(&self) -> StoreResult<u64> {
        entity::Entity::find()
            .count(&self.db)
            .await
            .map_err(map_db_error)
    }

    async fn exists_by_email(&self, email: &str, exclude_id: Option<i64>) -> StoreResult<bool> {
        let mut query = entity::Entity::find().filter(entity::Column::Email.eq(email));

        if let Some(id) = exclude_id {
            query = query.filter(entity::Column::Id.ne(id));
        }

        let exists = query
            .one(&self.db)
            .await
            .map_err(map_db_error)?
            .is_some();

        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let active_model: entity::ActiveModel = user.into();

        let model = active_model.insert(&self.db).await.map_err(map_db_error)?;

        tracing::info!(user_id = model.id, "Created user");
        Ok(model.into())
    }

    async fn update(&self, user: User) -> StoreResult<Option<User>> {
        let id = user.id;
        let active_model: entity::ActiveModel = user.into();

        match active_model.update(&self.db).await {
            Ok(model) => {
                tracing::info!(user_id = id, "Updated user");
                Ok(Some(model.into()))
            }
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(err) => Err(map_db_error(err)),
        }
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = entity::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected > 0 {
            tracing::info!(user_id = id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
