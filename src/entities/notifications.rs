use sea_orm::entity::prelude::*;

/// Notification history entry for an occurrence.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub message: String,
    pub sent_at: String,
    pub recipient_email: Option<String>,
    pub occurrence_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::occurrences::Entity",
        from = "Column::OccurrenceId",
        to = "super::occurrences::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Occurrences,
}

impl Related<super::occurrences::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Occurrences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
