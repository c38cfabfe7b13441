use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240301_000001_create_repair_jobs_table::Migration)]
    }
}

// Migration implementations

mod m20240301_000001_create_repair_jobs_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_repair_jobs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // One row per job document; quotes and notes live in JSON columns
            manager
                .create_table(
                    Table::create()
                        .table(RepairJobs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RepairJobs::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(RepairJobs::ItemModel).string().not_null())
                        .col(ColumnDef::new(RepairJobs::SerialNumber).string().null())
                        .col(
                            ColumnDef::new(RepairJobs::ProblemDescription)
                                .text()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RepairJobs::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(RepairJobs::DateReceived)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RepairJobs::LastUpdated)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(RepairJobs::CustomerId).string().not_null())
                        .col(ColumnDef::new(RepairJobs::CustomerName).string().not_null())
                        .col(ColumnDef::new(RepairJobs::Quotes).json().not_null())
                        .col(ColumnDef::new(RepairJobs::Notes).json().not_null())
                        .col(
                            ColumnDef::new(RepairJobs::Version)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("idx_repair_jobs_customer_id", RepairJobs::CustomerId),
                ("idx_repair_jobs_serial_number", RepairJobs::SerialNumber),
                ("idx_repair_jobs_status", RepairJobs::Status),
                ("idx_repair_jobs_date_received", RepairJobs::DateReceived),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(RepairJobs::Table)
                            .col(column)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RepairJobs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum RepairJobs {
        Table,
        Id,
        ItemModel,
        SerialNumber,
        ProblemDescription,
        Status,
        DateReceived,
        LastUpdated,
        CustomerId,
        CustomerName,
        Quotes,
        Notes,
        Version,
    }
}
