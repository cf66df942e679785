use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "daily_completions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub daily_number: i32,
    pub word: String,
    pub player_email: String,
    pub won: bool,
    pub guess_count: i32,
    pub solve_time_ms: Option<i64>,
    pub completed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
