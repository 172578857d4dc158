use crate::entities::{TopupMethod, TopupStatus, topup_request_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTopupRequest {
    pub method: TopupMethod,
    /// 充值金额（美分）
    pub amount: i64,
    /// 卡对卡转账的流水号等附言
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopupRequestResponse {
    pub id: i64,
    pub user_id: i64,
    pub method: TopupMethod,
    pub amount: i64,
    pub status: TopupStatus,
    pub note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// 交给支付方的关联号，仅网关/加密货币充值有
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_identifier: Option<String>,
}

impl From<topup_request_entity::Model> for TopupRequestResponse {
    fn from(m: topup_request_entity::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            method: m.method,
            amount: m.amount,
            status: m.status,
            note: m.note,
            reviewed_at: m.reviewed_at,
            created_at: m.created_at,
            payment_identifier: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TopupQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<TopupStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TopupReviewResponse {
    pub request: TopupRequestResponse,
    /// 审核通过时的新余额
    pub new_balance: Option<i64>,
}
