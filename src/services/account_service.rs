use crate::error::AppResult;
use crate::models::ProvisionResponse;
use crate::services::{DiscountCodeService, WalletService};
use sea_orm::DatabaseConnection;

/// 注册后的开户：钱包与个人码，重复调用安全
#[derive(Clone)]
pub struct AccountService {
    pool: DatabaseConnection,
    discount_code_service: DiscountCodeService,
}

impl AccountService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self {
            discount_code_service: DiscountCodeService::new(pool.clone()),
            pool,
        }
    }

    pub async fn provision(&self, user_id: i64) -> AppResult<ProvisionResponse> {
        let wallet = WalletService::create_wallet(&self.pool, user_id).await?;
        let personal = self
            .discount_code_service
            .ensure_personal_code(user_id)
            .await?;

        log::info!("Provisioned account for user {user_id}");
        Ok(ProvisionResponse {
            user_id,
            balance: wallet.balance,
            personal_code: personal.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CodeType;

    #[tokio::test]
    async fn test_provision_twice_returns_same_account() {
        let pool = crate::database::test_pool().await;
        let service = AccountService::new(pool.clone());

        let first = service.provision(7).await.unwrap();
        let second = service.provision(7).await.unwrap();
        assert_eq!(first.personal_code.id, second.personal_code.id);
        assert_eq!(first.personal_code.code_type, CodeType::Personal);
        assert_eq!(second.balance, 0);
        assert_eq!(
            DiscountCodeService::count_codes(&pool, 7, CodeType::Personal)
                .await
                .unwrap(),
            1
        );
    }
}
