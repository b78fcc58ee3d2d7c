//! Movements ledger schema.
//!
//! A single flat table: every relation (type, category, currency, wallet,
//! project, counterparties) is stored denormalized as its display value, so a
//! projected `SELECT` never needs a join.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Movements {
    Table,
    Id,
    OrganizationId,
    MovementDate,
    Amount,
    TypeName,
    CategoryName,
    SubcategoryName,
    CurrencyCode,
    CurrencySymbol,
    ExchangeRate,
    WalletName,
    ProjectName,
    Partner,
    Subcontract,
    SubcontractContact,
    Personnel,
    Client,
    Member,
    Indirect,
    GeneralCost,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Movements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Movements::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Movements::MovementDate).date().not_null())
                    .col(ColumnDef::new(Movements::Amount).double().not_null())
                    .col(ColumnDef::new(Movements::TypeName).string())
                    .col(ColumnDef::new(Movements::CategoryName).string())
                    .col(ColumnDef::new(Movements::SubcategoryName).string())
                    .col(ColumnDef::new(Movements::CurrencyCode).string())
                    .col(ColumnDef::new(Movements::CurrencySymbol).string())
                    .col(ColumnDef::new(Movements::ExchangeRate).double())
                    .col(ColumnDef::new(Movements::WalletName).string())
                    .col(ColumnDef::new(Movements::ProjectName).string())
                    .col(ColumnDef::new(Movements::Partner).string())
                    .col(ColumnDef::new(Movements::Subcontract).string())
                    .col(ColumnDef::new(Movements::SubcontractContact).string())
                    .col(ColumnDef::new(Movements::Personnel).string())
                    .col(ColumnDef::new(Movements::Client).string())
                    .col(ColumnDef::new(Movements::Member).string())
                    .col(ColumnDef::new(Movements::Indirect).string())
                    .col(ColumnDef::new(Movements::GeneralCost).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-movements-organization_id-movement_date")
                    .table(Movements::Table)
                    .col(Movements::OrganizationId)
                    .col(Movements::MovementDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Movements::Table).to_owned())
            .await
    }
}
