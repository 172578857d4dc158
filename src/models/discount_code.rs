use crate::entities::{CodeType, discount_code_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DiscountCodeResponse {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub code_type: CodeType,
    pub uses: i64,
    pub total_uses: i64,
    pub is_active: bool,
    pub percentage: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<discount_code_entity::Model> for DiscountCodeResponse {
    fn from(code: discount_code_entity::Model) -> Self {
        Self {
            id: code.id,
            user_id: code.user_id,
            code: code.code,
            code_type: code.code_type,
            uses: code.uses,
            total_uses: code.total_uses,
            is_active: code.is_active,
            percentage: code.percentage,
            expires_at: code.expires_at,
            created_at: code.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyCodeRequest {
    #[schema(example = "P-AB12CD34")]
    pub code: String,
}

/// 结账时的优惠码校验结果，失败时 valid=false
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerifyCodeResponse {
    pub valid: bool,
    pub percentage: i32,
    pub free_account: bool,
    pub code_type: Option<CodeType>,
}

impl VerifyCodeResponse {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            percentage: 0,
            free_account: false,
            code_type: None,
        }
    }

    pub fn valid(code_type: CodeType, percentage: i32) -> Self {
        Self {
            valid: true,
            percentage,
            free_account: code_type == CodeType::FreeAccount,
            code_type: Some(code_type),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PersonalCodeStatsResponse {
    pub code: String,
    pub uses: i64,
    pub total_uses: i64,
    pub next_reward70_threshold: i64,
    pub next_free_threshold: i64,
    pub reward70_count: u64,
    pub free_count: u64,
    pub codes: Vec<DiscountCodeResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordRedemptionRequest {
    pub code: String,
    /// 同一订单只计一次
    pub order_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedemptionResponse {
    pub code: String,
    pub uses: i64,
    pub total_uses: i64,
    /// 订单已计数过，本次未做任何变更
    pub duplicate: bool,
    pub minted: Vec<DiscountCodeResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCustomCodeRequest {
    pub user_id: i64,
    /// 不传则自动生成
    pub code: Option<String>,
    pub percentage: i32,
    pub expires_at: Option<DateTime<Utc>>,
}
