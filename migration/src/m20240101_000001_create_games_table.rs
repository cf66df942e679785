use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Games::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Games::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Games::RoomCode).string().not_null())
                    .col(ColumnDef::new(Games::GameMode).string().not_null())
                    .col(ColumnDef::new(Games::WordMode).string().not_null())
                    .col(ColumnDef::new(Games::Word).string())
                    .col(
                        ColumnDef::new(Games::PlayerCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Games::EndedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Room codes are reused across room lifetimes, so index rather than
        // constrain.
        manager
            .create_index(
                Index::create()
                    .name("idx_games_room_code")
                    .table(Games::Table)
                    .col(Games::RoomCode)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Games::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Games {
    Table,
    Id,
    RoomCode,
    GameMode,
    WordMode,
    Word,
    PlayerCount,
    StartedAt,
    EndedAt,
}
