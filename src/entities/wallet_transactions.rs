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
pub enum TransactionType {
    #[sea_orm(string_value = "increase")]
    Increase,
    #[sea_orm(string_value = "decrease")]
    Decrease,
    #[sea_orm(string_value = "purchase")]
    Purchase,
}

impl TransactionType {
    /// 有符号金额：increase 为正，其余为负
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            TransactionType::Increase => amount,
            TransactionType::Decrease | TransactionType::Purchase => -amount,
        }
    }
}

/// 余额变动的来源入口
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum WalletSource {
    #[sea_orm(string_value = "topup")]
    Topup,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "payment_webhook")]
    PaymentWebhook,
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "test_charge")]
    TestCharge,
}

impl std::fmt::Display for WalletSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletSource::Topup => write!(f, "topup"),
            WalletSource::Admin => write!(f, "admin"),
            WalletSource::PaymentWebhook => write!(f, "payment_webhook"),
            WalletSource::Purchase => write!(f, "purchase"),
            WalletSource::TestCharge => write!(f, "test_charge"),
        }
    }
}

/// 钱包流水，只追加不修改
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub wallet_id: i64,
    pub user_id: i64,
    pub transaction_type: TransactionType,
    /// 金额绝对值(美分)
    pub amount: i64,
    pub balance_after: i64,
    pub description: String,
    pub source: WalletSource,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn signed_amount(&self) -> i64 {
        self.transaction_type.signed(self.amount)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id"
    )]
    Wallet,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
