use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "game_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub game_id: Uuid,
    pub player_name: String,
    pub player_email: Option<String>,
    pub won: bool,
    pub guess_count: i32,
    pub solve_time_ms: Option<i64>,
    pub score: Option<i32>,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::games::Entity",
        from = "Column::GameId",
        to = "super::games::Column::Id"
    )]
    Games,
}

impl Related<super::games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Games.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
