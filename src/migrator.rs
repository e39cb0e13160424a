use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_date_dim_table::Migration),
            Box::new(m20240101_000002_create_loan_fact_table::Migration),
            Box::new(m20240101_000003_create_sales_fact_table::Migration),
            Box::new(m20240101_000004_create_purchase_fact_table::Migration),
            Box::new(m20240101_000005_create_reservation_fact_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_date_dim_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_date_dim_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Aligned with entities::date_dim Model
            manager
                .create_table(
                    Table::create()
                        .table(DateDim::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DateDim::DateKey)
                                .integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DateDim::CalDate).date().not_null())
                        .col(ColumnDef::new(DateDim::AcademicPhase).string().not_null())
                        .col(
                            ColumnDef::new(DateDim::HolidayInd)
                                .string_len(1)
                                .not_null()
                                .default("N"),
                        )
                        .col(ColumnDef::new(DateDim::FestiveEvent).string_len(50).null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_date_dim_cal_date")
                        .table(DateDim::Table)
                        .col(DateDim::CalDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DateDim::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DateDim {
        Table,
        DateKey,
        CalDate,
        AcademicPhase,
        HolidayInd,
        FestiveEvent,
    }
}

mod m20240101_000002_create_loan_fact_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_loan_fact_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LoanFact::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LoanFact::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(LoanFact::MemberKey).big_integer().not_null())
                        .col(ColumnDef::new(LoanFact::BookKey).big_integer().not_null())
                        .col(ColumnDef::new(LoanFact::StaffKey).big_integer().not_null())
                        .col(ColumnDef::new(LoanFact::DateKey).big_integer().not_null())
                        .col(ColumnDef::new(LoanFact::LoanId).string_len(20).not_null())
                        .col(ColumnDef::new(LoanFact::LoanDuration).big_integer().not_null())
                        .col(ColumnDef::new(LoanFact::OverdueDays).big_integer().not_null())
                        .col(ColumnDef::new(LoanFact::LoanStatus).string_len(20).not_null())
                        .col(
                            ColumnDef::new(LoanFact::TotalFine)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LoanFact::FinePaidFlag)
                                .small_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LoanFact::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LoanFact {
        Table,
        Id,
        MemberKey,
        BookKey,
        StaffKey,
        DateKey,
        LoanId,
        LoanDuration,
        OverdueDays,
        LoanStatus,
        TotalFine,
        FinePaidFlag,
    }
}

mod m20240101_000003_create_sales_fact_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_sales_fact_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesFact::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesFact::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SalesFact::DateKey).big_integer().not_null())
                        .col(ColumnDef::new(SalesFact::MemberKey).big_integer().not_null())
                        .col(ColumnDef::new(SalesFact::BookKey).big_integer().not_null())
                        .col(ColumnDef::new(SalesFact::StaffKey).big_integer().not_null())
                        .col(ColumnDef::new(SalesFact::OrderId).string_len(20).not_null())
                        .col(ColumnDef::new(SalesFact::OrderQty).big_integer().not_null())
                        .col(
                            ColumnDef::new(SalesFact::OrderUnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesFact::OrderTotalPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesFact::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SalesFact {
        Table,
        Id,
        DateKey,
        MemberKey,
        BookKey,
        StaffKey,
        OrderId,
        OrderQty,
        OrderUnitPrice,
        OrderTotalPrice,
    }
}

mod m20240101_000004_create_purchase_fact_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_purchase_fact_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseFact::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseFact::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PurchaseFact::DateKey).big_integer().not_null())
                        .col(ColumnDef::new(PurchaseFact::BookKey).big_integer().not_null())
                        .col(ColumnDef::new(PurchaseFact::StaffKey).big_integer().not_null())
                        .col(
                            ColumnDef::new(PurchaseFact::SupplierKey)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseFact::PurchaseId)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseFact::PurchaseQuantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseFact::PurchaseUnitCost)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseFact::PurchaseTotalCost)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseFact::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PurchaseFact {
        Table,
        Id,
        DateKey,
        BookKey,
        StaffKey,
        SupplierKey,
        PurchaseId,
        PurchaseQuantity,
        PurchaseUnitCost,
        PurchaseTotalCost,
    }
}

mod m20240101_000005_create_reservation_fact_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_reservation_fact_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReservationFact::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReservationFact::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ReservationFact::MemberKey)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReservationFact::BookKey).big_integer().not_null())
                        .col(
                            ColumnDef::new(ReservationFact::StaffKey)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFact::ReserveStartDateKey)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFact::ReserveEndDateKey)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFact::ReserveId)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFact::ReservationStatus)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFact::ReservationDuration)
                                .big_integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservation_fact_book_key")
                        .table(ReservationFact::Table)
                        .col(ReservationFact::BookKey)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReservationFact::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ReservationFact {
        Table,
        Id,
        MemberKey,
        BookKey,
        StaffKey,
        ReserveStartDateKey,
        ReserveEndDateKey,
        ReserveId,
        ReservationStatus,
        ReservationDuration,
    }
}
