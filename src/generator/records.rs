use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};

/// The four fact tables the generator produces rows for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, AsRefStr, clap::ValueEnum,
)]
#[strum(serialize_all = "snake_case")]
pub enum FactKind {
    Loan,
    Sale,
    Purchase,
    Reservation,
}

impl FactKind {
    pub fn table_name(self) -> &'static str {
        match self {
            FactKind::Loan => "loan_fact",
            FactKind::Sale => "sales_fact",
            FactKind::Purchase => "purchase_fact",
            FactKind::Reservation => "reservation_fact",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.table_name())
    }

    pub fn id_prefix(self) -> char {
        match self {
            FactKind::Loan => 'L',
            FactKind::Sale => 'S',
            FactKind::Purchase => 'P',
            FactKind::Reservation => 'R',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Active,
    Returned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Fulfilled,
    Expired,
    Active,
    Cancelled,
}

/// A generated fact row together with its CSV column order.
pub trait FactRow: Serialize {
    /// Header names, in field order.
    const COLUMNS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub member_key: u32,
    pub book_key: u32,
    pub staff_key: u32,
    pub date_key: u32,
    pub loan_id: String,
    pub loan_duration: u32,
    pub overdue_days: u32,
    pub loan_status: LoanStatus,
    pub total_fine: Decimal,
    #[serde(with = "flag")]
    pub fine_paid_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub date_key: u32,
    pub member_key: u32,
    pub book_key: u32,
    pub staff_key: u32,
    pub order_id: String,
    pub order_qty: u32,
    pub order_unit_price: Decimal,
    pub order_total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub date_key: u32,
    pub book_key: u32,
    pub staff_key: u32,
    pub supplier_key: u32,
    pub purchase_id: String,
    pub purchase_quantity: u32,
    pub purchase_unit_cost: Decimal,
    pub purchase_total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub member_key: u32,
    pub book_key: u32,
    pub staff_key: u32,
    pub reserve_start_date_key: u32,
    pub reserve_end_date_key: u32,
    pub reserve_id: String,
    pub reservation_status: ReservationStatus,
    pub reservation_duration: u32,
}

impl FactRow for LoanRecord {
    const COLUMNS: &'static [&'static str] = &[
        "member_key",
        "book_key",
        "staff_key",
        "date_key",
        "loan_id",
        "loan_duration",
        "overdue_days",
        "loan_status",
        "total_fine",
        "fine_paid_flag",
    ];
}

impl FactRow for SaleRecord {
    const COLUMNS: &'static [&'static str] = &[
        "date_key",
        "member_key",
        "book_key",
        "staff_key",
        "order_id",
        "order_qty",
        "order_unit_price",
        "order_total_price",
    ];
}

impl FactRow for PurchaseRecord {
    const COLUMNS: &'static [&'static str] = &[
        "date_key",
        "book_key",
        "staff_key",
        "supplier_key",
        "purchase_id",
        "purchase_quantity",
        "purchase_unit_cost",
        "purchase_total_cost",
    ];
}

impl FactRow for ReservationRecord {
    const COLUMNS: &'static [&'static str] = &[
        "member_key",
        "book_key",
        "staff_key",
        "reserve_start_date_key",
        "reserve_end_date_key",
        "reserve_id",
        "reservation_status",
        "reservation_duration",
    ];
}

/// `0`/`1` column encoding for booleans.
mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(D::Error::custom(format!("expected 0 or 1, got {other}"))),
        }
    }
}
