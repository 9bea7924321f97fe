use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// Must reference a commander owned by the same user; enforced at the
    /// application boundary on every write, not just by the FK.
    pub commander_id: i32,

    /// Calendar date of the session, not a timestamp.
    pub date: Date,

    pub player_count: i32,

    pub won: bool,

    pub starting_player_won: bool,

    pub sol_ring_turn_one_won: bool,

    pub rounds: Option<i32>,

    pub notes: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::commanders::Entity",
        from = "Column::CommanderId",
        to = "super::commanders::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Commanders,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::commanders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commanders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
