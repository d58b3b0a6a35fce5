use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string_len(Users::FirstName, 255))
                    .col(string_len(Users::LastName, 255))
                    .col(string_len_uniq(Users::Email, 255))
                    .col(string_len(Users::Role, 16))
                    .col(string_len(Users::Status, 16).default("pending"))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .col(timestamp_with_time_zone(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Restrict role and status to their known values
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                ALTER TABLE users
                    ADD CONSTRAINT users_role_check
                        CHECK (role IN ('admin', 'manager', 'user')),
                    ADD CONSTRAINT users_status_check
                        CHECK (status IN ('active', 'inactive', 'pending'))
                "#,
            )
            .await?;

        // Newest-first listing
        manager
            .create_index(
                Index::create()
                    .name("idx_users_created_at_id")
                    .table(Users::Table)
                    .col((Users::CreatedAt, IndexOrder::Desc))
                    .col((Users::Id, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Role,
    Status,
    CreatedAt,
    UpdatedAt,
}
