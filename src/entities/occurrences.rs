use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "occurrences")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub address: String,
    pub registered_on: Date,
    /// Set iff the status is solved or rejected.
    pub finalized_on: Option<Date>,
    pub status_id: i32,
    pub user_id: i32,
    pub agency_id: Option<i32>,
    pub coordinate_id: Option<i32>,
    /// `crate::domain::PointType` as text.
    pub point_type: Option<String>,
    /// Set iff the status is rejected.
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_justification: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::occurrence_statuses::Entity",
        from = "Column::StatusId",
        to = "super::occurrence_statuses::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    OccurrenceStatuses,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::agencies::Entity",
        from = "Column::AgencyId",
        to = "super::agencies::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Agencies,
    #[sea_orm(
        belongs_to = "super::coordinates::Entity",
        from = "Column::CoordinateId",
        to = "super::coordinates::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Coordinates,
    #[sea_orm(has_many = "super::images::Entity")]
    Images,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::occurrence_statuses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OccurrenceStatuses.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::agencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agencies.def()
    }
}

impl Related<super::coordinates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coordinates.def()
    }
}

impl Related<super::images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
