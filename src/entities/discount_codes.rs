use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    /// 用户自己的 15% 码，只能给别人用
    #[sea_orm(string_value = "personal")]
    Personal,
    #[sea_orm(string_value = "reward70")]
    Reward70,
    #[sea_orm(string_value = "free_account")]
    FreeAccount,
    #[sea_orm(string_value = "custom")]
    Custom,
}

impl std::fmt::Display for CodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeType::Personal => write!(f, "personal"),
            CodeType::Reward70 => write!(f, "reward70"),
            CodeType::FreeAccount => write!(f, "free_account"),
            CodeType::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "discount_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub code_type: CodeType,
    /// 距离上次发放奖励后的使用次数，发放成功后清零
    pub uses: i64,
    /// 累计使用次数，只增不减，阈值按它计算
    pub total_uses: i64,
    pub is_active: bool,
    pub percentage: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    /// 奖励码的 UTC 日序号，其余类型为空
    pub mint_window: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
