use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_games_table::Games;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GameResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameResults::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GameResults::GameId).uuid().not_null())
                    .col(ColumnDef::new(GameResults::PlayerName).string().not_null())
                    .col(ColumnDef::new(GameResults::PlayerEmail).string())
                    .col(ColumnDef::new(GameResults::Won).boolean().not_null())
                    .col(ColumnDef::new(GameResults::GuessCount).integer().not_null())
                    .col(ColumnDef::new(GameResults::SolveTimeMs).big_integer())
                    .col(ColumnDef::new(GameResults::Score).integer())
                    .col(ColumnDef::new(GameResults::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_results_game_id")
                            .from(GameResults::Table, GameResults::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DailyCompletions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyCompletions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DailyCompletions::DailyNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DailyCompletions::Word).string().not_null())
                    .col(
                        ColumnDef::new(DailyCompletions::PlayerEmail)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DailyCompletions::Won).boolean().not_null())
                    .col(
                        ColumnDef::new(DailyCompletions::GuessCount)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DailyCompletions::SolveTimeMs).big_integer())
                    .col(
                        ColumnDef::new(DailyCompletions::CompletedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_daily_completions_email_number")
                    .table(DailyCompletions::Table)
                    .col(DailyCompletions::PlayerEmail)
                    .col(DailyCompletions::DailyNumber)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DailyCompletions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GameResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GameResults {
    Table,
    Id,
    GameId,
    PlayerName,
    PlayerEmail,
    Won,
    GuessCount,
    SolveTimeMs,
    Score,
    Position,
}

#[derive(DeriveIden)]
enum DailyCompletions {
    Table,
    Id,
    DailyNumber,
    Word,
    PlayerEmail,
    Won,
    GuessCount,
    SolveTimeMs,
    CompletedAt,
}
