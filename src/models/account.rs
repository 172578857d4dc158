use crate::models::DiscountCodeResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 注册流程调用：创建钱包与个人码
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProvisionResponse {
    pub user_id: i64,
    pub balance: i64,
    pub personal_code: DiscountCodeResponse,
}
