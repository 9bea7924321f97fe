use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored lower-cased, so the unique index doubles as the
    /// case-insensitive uniqueness backstop.
    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: Option<String>,

    /// Argon2id password hash
    pub password_hash: String,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::commanders::Entity")]
    Commanders,
    #[sea_orm(has_many = "super::games::Entity")]
    Games,
}

impl Related<super::commanders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commanders.def()
    }
}

impl Related<super::games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Games.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
