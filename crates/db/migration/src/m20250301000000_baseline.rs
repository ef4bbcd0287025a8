use sea_orm_migration::{prelude::*, sea_orm::DatabaseBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Integrations::Table)
                    .col(pk_id_col(manager, Integrations::Id))
                    .col(uuid_col(Integrations::Uuid))
                    .col(
                        ColumnDef::new(Integrations::TenantId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::Platform)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("inactive")),
                    )
                    .col(
                        ColumnDef::new(Integrations::IsActive)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(ColumnDef::new(Integrations::Credentials).text())
                    .col(ColumnDef::new(Integrations::Configuration).json().not_null())
                    .col(ColumnDef::new(Integrations::Metadata).json().not_null())
                    .col(ColumnDef::new(Integrations::ActivatedAt).timestamp())
                    .col(ColumnDef::new(Integrations::LastSyncAt).timestamp())
                    .col(timestamp_col(Integrations::CreatedAt))
                    .col(timestamp_col(Integrations::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_integrations_uuid")
                    .table(Integrations::Table)
                    .col(Integrations::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // One integration per (tenant, platform); configuration saves upsert
        // against this index.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_integrations_tenant_platform")
                    .table(Integrations::Table)
                    .col(Integrations::TenantId)
                    .col(Integrations::Platform)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Items::Table)
                    .col(pk_id_col(manager, Items::Id))
                    .col(ColumnDef::new(Items::OutletId).big_integer().not_null())
                    .col(ColumnDef::new(Items::Sku).string_len(64))
                    .col(ColumnDef::new(Items::Name).string().not_null())
                    .col(
                        ColumnDef::new(Items::Price)
                            .double()
                            .not_null()
                            .default(Expr::val(0.0)),
                    )
                    .col(timestamp_col(Items::CreatedAt))
                    .col(timestamp_col(Items::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_items_outlet_id")
                    .table(Items::Table)
                    .col(Items::OutletId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Transactions::Table)
                    .col(pk_id_col(manager, Transactions::Id))
                    .col(uuid_col(Transactions::Uuid))
                    .col(
                        ColumnDef::new(Transactions::TransactionNumber)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::OrderType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CustomerName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::CustomerPhone).string_len(32))
                    .col(money_col(Transactions::Subtotal))
                    .col(money_col(Transactions::DiscountAmount))
                    .col(money_col(Transactions::TaxAmount))
                    .col(money_col(Transactions::ServiceCharge))
                    .col(money_col(Transactions::Total))
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::OutletId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Notes).text())
                    .col(ColumnDef::new(Transactions::CompletedAt).timestamp())
                    .col(timestamp_col(Transactions::CreatedAt))
                    .col(timestamp_col(Transactions::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_uuid")
                    .table(Transactions::Table)
                    .col(Transactions::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Correctness invariant, not an optimization: concurrent deliveries of
        // the same external order must not create two transactions. The
        // reconciler relies on this unique index to turn a lost insert race
        // into a status update.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transactions_transaction_number")
                    .table(Transactions::Table)
                    .col(Transactions::TransactionNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TransactionItems::Table)
                    .col(pk_id_col(manager, TransactionItems::Id))
                    .col(
                        ColumnDef::new(TransactionItems::TransactionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionItems::ItemId).big_integer())
                    .col(
                        ColumnDef::new(TransactionItems::ItemName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::Quantity)
                            .double()
                            .not_null()
                            .default(Expr::val(1.0)),
                    )
                    .col(money_col(TransactionItems::UnitPrice))
                    .col(money_col(TransactionItems::Subtotal))
                    .col(money_col(TransactionItems::DiscountAmount))
                    .col(ColumnDef::new(TransactionItems::Notes).text())
                    .col(timestamp_col(TransactionItems::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_items_transaction_id")
                            .from(TransactionItems::Table, TransactionItems::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transaction_items_transaction_id")
                    .table(TransactionItems::Table)
                    .col(TransactionItems::TransactionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Payments::Table)
                    .col(pk_id_col(manager, Payments::Id))
                    .col(uuid_col(Payments::Uuid))
                    .col(
                        ColumnDef::new(Payments::TransactionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Method).string_len(32).not_null())
                    .col(money_col(Payments::Amount))
                    .col(money_col(Payments::ChangeAmount))
                    .col(ColumnDef::new(Payments::ReferenceNumber).string_len(128))
                    .col(
                        ColumnDef::new(Payments::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("pending")),
                    )
                    .col(timestamp_col(Payments::CreatedAt))
                    .col(timestamp_col(Payments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_transaction_id")
                            .from(Payments::Table, Payments::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payments_uuid")
                    .table(Payments::Table)
                    .col(Payments::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payments_reference_number")
                    .table(Payments::Table)
                    .col(Payments::ReferenceNumber)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Integrations::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

fn money_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .double()
        .not_null()
        .default(Expr::val(0.0))
        .to_owned()
}

#[derive(Iden)]
enum Integrations {
    Table,
    Id,
    Uuid,
    TenantId,
    Platform,
    Status,
    IsActive,
    Credentials,
    Configuration,
    Metadata,
    ActivatedAt,
    LastSyncAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Items {
    Table,
    Id,
    OutletId,
    Sku,
    Name,
    Price,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Uuid,
    TransactionNumber,
    OrderType,
    CustomerName,
    CustomerPhone,
    Subtotal,
    DiscountAmount,
    TaxAmount,
    ServiceCharge,
    Total,
    Status,
    OutletId,
    Notes,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TransactionItems {
    Table,
    Id,
    TransactionId,
    ItemId,
    ItemName,
    Quantity,
    UnitPrice,
    Subtotal,
    DiscountAmount,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    Uuid,
    TransactionId,
    Method,
    Amount,
    ChangeAmount,
    ReferenceNumber,
    Status,
    CreatedAt,
    UpdatedAt,
}
