use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 已计数的订单，防止同一订单重复累计个人码使用次数
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "reward_redemptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub discount_code_id: i64,
    #[sea_orm(unique)]
    pub order_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
