use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One calendar day of the warehouse's date dimension.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "date_dim")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub date_key: i32,
    pub cal_date: Date,
    pub academic_phase: String,
    /// `Y` or `N`
    pub holiday_ind: String,
    pub festive_event: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_holiday(&self) -> bool {
        self.holiday_ind == "Y"
    }
}
