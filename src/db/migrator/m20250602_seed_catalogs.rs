use crate::domain::{OccurrenceStatus, Role};
use crate::entities::{occurrence_statuses, prelude::*, profiles};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut roles = Query::insert()
            .into_table(Profiles)
            .columns([profiles::Column::Id, profiles::Column::Name])
            .to_owned();
        for role in Role::ALL {
            roles.values_panic([role.seed_id().into(), role.name().into()]);
        }
        manager.exec_stmt(roles).await?;

        let mut statuses = Query::insert()
            .into_table(OccurrenceStatuses)
            .columns([
                occurrence_statuses::Column::Id,
                occurrence_statuses::Column::Name,
            ])
            .to_owned();
        for status in OccurrenceStatus::ALL {
            statuses.values_panic([status.seed_id().into(), status.name().into()]);
        }
        manager.exec_stmt(statuses).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(OccurrenceStatuses).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Profiles).to_owned())
            .await?;
        Ok(())
    }
}
