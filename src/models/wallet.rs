use crate::entities::{TransactionType, WalletSource, wallet_transaction_entity};
use crate::models::PaginatedResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletTransactionResponse {
    pub id: i64,
    pub transaction_type: TransactionType,
    /// 金额（美分，正数）
    pub amount: i64,
    /// 带符号金额，increase 为正
    pub signed_amount: i64,
    pub balance_after: i64,
    pub description: String,
    pub source: WalletSource,
    pub created_at: DateTime<Utc>,
}

impl From<wallet_transaction_entity::Model> for WalletTransactionResponse {
    fn from(m: wallet_transaction_entity::Model) -> Self {
        Self {
            id: m.id,
            signed_amount: m.signed_amount(),
            transaction_type: m.transaction_type,
            amount: m.amount,
            balance_after: m.balance_after,
            description: m.description,
            source: m.source,
            created_at: m.created_at,
        }
    }
}

/// 钱包视图：余额 + 按时间倒序的流水
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub user_id: i64,
    pub balance: i64,
    pub transactions: PaginatedResponse<WalletTransactionResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WalletQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminAdjustRequest {
    /// 正数增加，负数扣减（美分）
    pub amount: i64,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TestChargeRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub new_balance: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerAuditResponse {
    pub user_id: i64,
    pub balance: i64,
    pub ledger_sum: i64,
    pub transaction_count: u64,
    pub consistent: bool,
}
