//! SeaORM Entity for petition_votes table
//!
//! (petition_id, voter_id) is unique; see `db::migrate`.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "petition_votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub petition_id: i32,
    pub voter_id: i32,
    /// True for an upvote, false for a downvote.
    pub vote_type: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::movie_petitions::Entity",
        from = "Column::PetitionId",
        to = "super::movie_petitions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Petition,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::VoterId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Voter,
}

impl Related<super::movie_petitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Petition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
