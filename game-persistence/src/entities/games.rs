use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub room_code: String,
    pub game_mode: String,
    pub word_mode: String,
    /// Shared target word; null for sabotage games, which have one word per
    /// player.
    pub word: Option<String>,
    pub player_count: i32,
    pub started_at: DateTimeWithTimeZone,
    pub ended_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::guesses::Entity")]
    Guesses,
    #[sea_orm(has_many = "super::game_results::Entity")]
    GameResults,
}

impl Related<super::guesses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guesses.def()
    }
}

impl Related<super::game_results::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GameResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
