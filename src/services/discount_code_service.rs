use crate::entities::{CodeType, discount_code_entity as discount_codes};
use crate::error::{AppError, AppResult};
use crate::models::{CreateCustomCodeRequest, DiscountCodeResponse, VerifyCodeResponse};
use crate::utils::{generate_unique_discount_code, normalize_code, validate_code};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

/// 个人码给他人使用时的折扣
pub const PERSONAL_PERCENTAGE: i32 = 15;
pub const REWARD70_PERCENTAGE: i32 = 70;
pub const FREE_ACCOUNT_PERCENTAGE: i32 = 100;

#[derive(Clone)]
pub struct DiscountCodeService {
    pool: DatabaseConnection,
}

impl DiscountCodeService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn find_by_code<C: ConnectionTrait>(
        conn: &C,
        code: &str,
    ) -> AppResult<Option<discount_codes::Model>> {
        let code = discount_codes::Entity::find()
            .filter(discount_codes::Column::Code.eq(normalize_code(code)))
            .one(conn)
            .await?;
        Ok(code)
    }

    pub async fn find_active_personal_code<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
    ) -> AppResult<Option<discount_codes::Model>> {
        let code = discount_codes::Entity::find()
            .filter(discount_codes::Column::UserId.eq(user_id))
            .filter(discount_codes::Column::CodeType.eq(CodeType::Personal))
            .filter(discount_codes::Column::IsActive.eq(true))
            .one(conn)
            .await?;
        Ok(code)
    }

    /// 确保用户有一个有效的个人码，已有则直接返回
    pub async fn ensure_personal_code(&self, user_id: i64) -> AppResult<discount_codes::Model> {
        if let Some(existing) = Self::find_active_personal_code(&self.pool, user_id).await? {
            return Ok(existing);
        }

        let code = generate_unique_discount_code(&self.pool, CodeType::Personal).await?;
        let now = Utc::now();
        let model = discount_codes::ActiveModel {
            user_id: Set(user_id),
            code: Set(code),
            code_type: Set(CodeType::Personal),
            uses: Set(0),
            total_uses: Set(0),
            is_active: Set(true),
            percentage: Set(None),
            expires_at: Set(None),
            mint_window: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match model.insert(&self.pool).await {
            Ok(created) => {
                log::info!("Created personal code {} for user {}", created.code, user_id);
                Ok(created)
            }
            Err(err) => {
                // 并发注册时唯一索引冲突，取已存在的那条
                match Self::find_active_personal_code(&self.pool, user_id).await? {
                    Some(existing) => Ok(existing),
                    None => Err(err.into()),
                }
            }
        }
    }

    /// 结账时校验优惠码。不满足条件一律返回 valid=false，不报错
    pub async fn verify(&self, code: &str, requesting_user_id: i64) -> AppResult<VerifyCodeResponse> {
        let Some(code) = Self::find_by_code(&self.pool, code).await? else {
            log::debug!("Discount code not found for user {requesting_user_id}");
            return Ok(VerifyCodeResponse::invalid());
        };

        Ok(evaluate(&code, requesting_user_id, Utc::now()))
    }

    /// 用户名下全部优惠码，新的在前
    pub async fn list_user_codes<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
    ) -> AppResult<Vec<DiscountCodeResponse>> {
        let codes = discount_codes::Entity::find()
            .filter(discount_codes::Column::UserId.eq(user_id))
            .order_by_desc(discount_codes::Column::CreatedAt)
            .order_by_desc(discount_codes::Column::Id)
            .all(conn)
            .await?
            .into_iter()
            .map(DiscountCodeResponse::from)
            .collect();
        Ok(codes)
    }

    pub async fn count_codes<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
        code_type: CodeType,
    ) -> AppResult<u64> {
        let count = discount_codes::Entity::find()
            .filter(discount_codes::Column::UserId.eq(user_id))
            .filter(discount_codes::Column::CodeType.eq(code_type))
            .count(conn)
            .await?;
        Ok(count)
    }

    /// 管理员创建活动码
    pub async fn create_custom_code(
        &self,
        request: CreateCustomCodeRequest,
    ) -> AppResult<DiscountCodeResponse> {
        if !(0..=100).contains(&request.percentage) {
            return Err(AppError::ValidationError(
                "Percentage must be between 0 and 100".to_string(),
            ));
        }

        let now = Utc::now();
        if request.expires_at.is_some_and(|at| at <= now) {
            return Err(AppError::ValidationError(
                "Expiry must be in the future".to_string(),
            ));
        }

        let code = match request.code.as_deref() {
            Some(code) => {
                let code = validate_code(code)?;
                if Self::find_by_code(&self.pool, &code).await?.is_some() {
                    return Err(AppError::Conflict(format!(
                        "Discount code {code} already exists"
                    )));
                }
                code
            }
            None => generate_unique_discount_code(&self.pool, CodeType::Custom).await?,
        };

        let created = discount_codes::ActiveModel {
            user_id: Set(request.user_id),
            code: Set(code),
            code_type: Set(CodeType::Custom),
            uses: Set(0),
            total_uses: Set(0),
            is_active: Set(true),
            percentage: Set(Some(request.percentage)),
            expires_at: Set(request.expires_at),
            mint_window: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Created custom code {} ({}%) for user {}",
            created.code,
            request.percentage,
            request.user_id
        );
        Ok(created.into())
    }

    pub async fn deactivate_code(&self, id: i64) -> AppResult<DiscountCodeResponse> {
        let result = discount_codes::Entity::update_many()
            .col_expr(discount_codes::Column::IsActive, Expr::value(false))
            .col_expr(discount_codes::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(discount_codes::Column::Id.eq(id))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Discount code not found".to_string()));
        }

        let code = discount_codes::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Discount code not found".to_string()))?;
        log::info!("Deactivated discount code {}", code.code);
        Ok(code.into())
    }

    pub async fn delete_code(&self, id: i64) -> AppResult<()> {
        let result = discount_codes::Entity::delete_by_id(id)
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Discount code not found".to_string()));
        }
        log::info!("Deleted discount code {id}");
        Ok(())
    }

    /// 将已过期但仍标记为有效的码置为失效，返回处理条数
    pub async fn expire_stale_codes(&self) -> AppResult<u64> {
        let now = Utc::now();
        let result = discount_codes::Entity::update_many()
            .col_expr(discount_codes::Column::IsActive, Expr::value(false))
            .col_expr(discount_codes::Column::UpdatedAt, Expr::value(now))
            .filter(discount_codes::Column::IsActive.eq(true))
            .filter(discount_codes::Column::ExpiresAt.lte(now))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected)
    }
}

/// 按码类型判断能否被该用户使用及折扣比例
fn evaluate(
    code: &discount_codes::Model,
    requesting_user_id: i64,
    now: chrono::DateTime<Utc>,
) -> VerifyCodeResponse {
    if !code.is_usable_at(now) {
        return VerifyCodeResponse::invalid();
    }

    let is_owner = code.user_id == requesting_user_id;
    match code.code_type {
        // 不能用自己的个人码
        CodeType::Personal if is_owner => VerifyCodeResponse::invalid(),
        CodeType::Personal => VerifyCodeResponse::valid(CodeType::Personal, PERSONAL_PERCENTAGE),
        // 奖励码只能本人使用
        CodeType::Reward70 if is_owner => {
            VerifyCodeResponse::valid(CodeType::Reward70, REWARD70_PERCENTAGE)
        }
        CodeType::FreeAccount if is_owner => {
            VerifyCodeResponse::valid(CodeType::FreeAccount, FREE_ACCOUNT_PERCENTAGE)
        }
        CodeType::Reward70 | CodeType::FreeAccount => VerifyCodeResponse::invalid(),
        CodeType::Custom => match code.percentage {
            Some(p) if (0..=100).contains(&p) => VerifyCodeResponse::valid(CodeType::Custom, p),
            _ => VerifyCodeResponse::invalid(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use chrono::Duration;

    async fn insert_code(
        pool: &DatabaseConnection,
        user_id: i64,
        code: &str,
        code_type: CodeType,
        expires_in: Option<Duration>,
    ) -> discount_codes::Model {
        let now = Utc::now();
        discount_codes::ActiveModel {
            user_id: Set(user_id),
            code: Set(code.to_string()),
            code_type: Set(code_type),
            uses: Set(0),
            total_uses: Set(0),
            is_active: Set(true),
            percentage: Set(None),
            expires_at: Set(expires_in.map(|d| now + d)),
            mint_window: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_personal_code_cannot_be_self_used() {
        let pool = test_pool().await;
        let service = DiscountCodeService::new(pool);
        let personal = service.ensure_personal_code(1).await.unwrap();

        let own = service.verify(&personal.code, 1).await.unwrap();
        assert!(!own.valid);

        let other = service
            .verify(&personal.code.to_lowercase(), 2)
            .await
            .unwrap();
        assert_eq!(other, VerifyCodeResponse::valid(CodeType::Personal, 15));
    }

    #[tokio::test]
    async fn test_ensure_personal_code_is_idempotent() {
        let pool = test_pool().await;
        let service = DiscountCodeService::new(pool.clone());
        let first = service.ensure_personal_code(1).await.unwrap();
        let second = service.ensure_personal_code(1).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(
            DiscountCodeService::count_codes(&pool, 1, CodeType::Personal)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_reward_codes_are_owner_only() {
        let pool = test_pool().await;
        insert_code(&pool, 1, "R70-AAAA2222", CodeType::Reward70, Some(Duration::days(40))).await;
        insert_code(&pool, 1, "FREE-BBBB3333", CodeType::FreeAccount, Some(Duration::days(40))).await;
        let service = DiscountCodeService::new(pool);

        let reward = service.verify("R70-AAAA2222", 1).await.unwrap();
        assert!(reward.valid);
        assert_eq!(reward.percentage, 70);
        assert!(!reward.free_account);

        let free = service.verify("FREE-BBBB3333", 1).await.unwrap();
        assert!(free.free_account);
        assert_eq!(free.percentage, 100);

        assert!(!service.verify("R70-AAAA2222", 2).await.unwrap().valid);
        assert!(!service.verify("FREE-BBBB3333", 2).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_expired_and_unknown_codes_are_invalid() {
        let pool = test_pool().await;
        insert_code(&pool, 1, "R70-CCCC4444", CodeType::Reward70, Some(Duration::seconds(-1))).await;
        let service = DiscountCodeService::new(pool);

        assert!(!service.verify("R70-CCCC4444", 1).await.unwrap().valid);
        assert!(!service.verify("NOPE-0000", 1).await.unwrap().valid);

        assert_eq!(service.expire_stale_codes().await.unwrap(), 1);
        assert_eq!(service.expire_stale_codes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_custom_code_lifecycle() {
        let pool = test_pool().await;
        let service = DiscountCodeService::new(pool);

        let created = service
            .create_custom_code(CreateCustomCodeRequest {
                user_id: 9,
                code: Some("summer-25".to_string()),
                percentage: 25,
                expires_at: None,
            })
            .await
            .unwrap();
        assert_eq!(created.code, "SUMMER-25");

        let verified = service.verify("SUMMER-25", 9).await.unwrap();
        assert_eq!(verified, VerifyCodeResponse::valid(CodeType::Custom, 25));

        let duplicate = service
            .create_custom_code(CreateCustomCodeRequest {
                user_id: 9,
                code: Some("SUMMER-25".to_string()),
                percentage: 10,
                expires_at: None,
            })
            .await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        service.deactivate_code(created.id).await.unwrap();
        assert!(!service.verify("SUMMER-25", 9).await.unwrap().valid);

        service.delete_code(created.id).await.unwrap();
        assert!(matches!(
            service.delete_code(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_code_percentage_is_validated() {
        let service = DiscountCodeService::new(test_pool().await);
        let result = service
            .create_custom_code(CreateCustomCodeRequest {
                user_id: 1,
                code: None,
                percentage: 101,
                expires_at: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
