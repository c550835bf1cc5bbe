// migration: create_realtime_documents
use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202501150001_create_realtime_documents"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per child of a top-level collection, e.g. sessions/{key}.
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("realtime_documents"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("collection"))
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("doc_key")).string().not_null())
                    .col(ColumnDef::new(Alias::new("body")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .primary_key(
                        Index::create()
                            .col(Alias::new("collection"))
                            .col(Alias::new("doc_key")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("realtime_documents"))
                    .to_owned(),
            )
            .await
    }
}
