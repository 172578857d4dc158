use crate::config::RewardConfig;
use crate::entities::{
    CodeType, discount_code_entity as discount_codes,
    reward_redemption_entity as reward_redemptions,
};
use crate::error::{AppError, AppResult};
use crate::models::{DiscountCodeResponse, PersonalCodeStatsResponse, RedemptionResponse};
use crate::services::DiscountCodeService;
use crate::utils::{generate_unique_discount_code, normalize_code};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};

/// 每累计 5 次发一张 70% 码
pub const REWARD70_EVERY: i64 = 5;
/// 每累计 10 次发一张免费码
pub const FREE_ACCOUNT_EVERY: i64 = 10;

#[derive(Clone)]
pub struct RewardService {
    pool: DatabaseConnection,
    config: RewardConfig,
}

impl RewardService {
    pub fn new(pool: DatabaseConnection, config: RewardConfig) -> Self {
        Self { pool, config }
    }

    /// 记录一次个人码的成功使用，并按累计次数发放奖励码。
    pub async fn record_redemption(
        &self,
        code: &str,
        order_id: Option<i64>,
    ) -> AppResult<RedemptionResponse> {
        let txn = self.pool.begin().await?;
        let response = Self::record_redemption_in(&txn, &self.config, code, order_id).await?;
        txn.commit().await?;
        Ok(response)
    }

    /// 在调用方的事务里记录使用。
    ///
    /// 事务的第一条语句先锁住个人码行，同一个码的并发记录从这里开始串行；
    /// 去重、计数、发码与清零都在锁内完成。
    pub async fn record_redemption_in<C: ConnectionTrait>(
        conn: &C,
        config: &RewardConfig,
        code: &str,
        order_id: Option<i64>,
    ) -> AppResult<RedemptionResponse> {
        let code = normalize_code(code);
        let now = Utc::now();

        let locked = discount_codes::Entity::update_many()
            .col_expr(discount_codes::Column::UpdatedAt, Expr::value(now))
            .filter(discount_codes::Column::Code.eq(code.as_str()))
            .exec(conn)
            .await?;
        if locked.rows_affected == 0 {
            return Err(AppError::NotFound("Discount code not found".to_string()));
        }

        let personal = DiscountCodeService::find_by_code(conn, &code)
            .await?
            .ok_or_else(|| AppError::NotFound("Discount code not found".to_string()))?;
        if personal.code_type != CodeType::Personal {
            return Err(AppError::ValidationError(
                "Only personal codes accrue rewards".to_string(),
            ));
        }
        if !personal.is_usable_at(now) {
            return Err(AppError::ValidationError(
                "Discount code is no longer active".to_string(),
            ));
        }

        if let Some(order_id) = order_id {
            let inserted = reward_redemptions::Entity::insert(reward_redemptions::ActiveModel {
                discount_code_id: Set(personal.id),
                order_id: Set(order_id),
                created_at: Set(now),
                ..Default::default()
            })
            .on_conflict(
                OnConflict::column(reward_redemptions::Column::OrderId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

            if inserted == 0 {
                log::info!(
                    "Order {} already counted for code {}, skipping",
                    order_id,
                    personal.code
                );
                return Ok(RedemptionResponse {
                    code: personal.code,
                    uses: personal.uses,
                    total_uses: personal.total_uses,
                    duplicate: true,
                    minted: Vec::new(),
                });
            }
        }

        let result = discount_codes::Entity::update_many()
            .col_expr(
                discount_codes::Column::Uses,
                Expr::col(discount_codes::Column::Uses).add(1),
            )
            .col_expr(
                discount_codes::Column::TotalUses,
                Expr::col(discount_codes::Column::TotalUses).add(1),
            )
            .col_expr(discount_codes::Column::UpdatedAt, Expr::value(now))
            .filter(discount_codes::Column::Id.eq(personal.id))
            .filter(discount_codes::Column::IsActive.eq(true))
            .exec(conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::ValidationError(
                "Discount code is no longer active".to_string(),
            ));
        }

        let counted = discount_codes::Entity::find_by_id(personal.id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Discount code not found".to_string()))?;

        let mut minted = Vec::new();
        for code_type in tiers_reached(counted.total_uses) {
            if let Some(reward) =
                Self::try_mint(conn, config, counted.user_id, code_type, now).await?
            {
                minted.push(reward);
            }
        }

        let mut uses = counted.uses;
        if !minted.is_empty() {
            discount_codes::Entity::update_many()
                .col_expr(discount_codes::Column::Uses, Expr::value(0i64))
                .filter(discount_codes::Column::Id.eq(counted.id))
                .exec(conn)
                .await?;
            uses = 0;
        }

        log::info!(
            "Recorded redemption of {} (owner {}): total_uses={}, minted={}",
            counted.code,
            counted.user_id,
            counted.total_uses,
            minted.len()
        );

        Ok(RedemptionResponse {
            code: counted.code,
            uses,
            total_uses: counted.total_uses,
            duplicate: false,
            minted: minted.into_iter().map(DiscountCodeResponse::from).collect(),
        })
    }

    /// 在窗口期内没有同类奖励码时才发放。窗口序号上的唯一索引兜底并发重复
    async fn try_mint<C: ConnectionTrait>(
        conn: &C,
        config: &RewardConfig,
        user_id: i64,
        code_type: CodeType,
        now: DateTime<Utc>,
    ) -> AppResult<Option<discount_codes::Model>> {
        let window_start = now - Duration::hours(config.window_hours);
        let recent = discount_codes::Entity::find()
            .filter(discount_codes::Column::UserId.eq(user_id))
            .filter(discount_codes::Column::CodeType.eq(code_type))
            .filter(discount_codes::Column::CreatedAt.gt(window_start))
            .count(conn)
            .await?;
        if recent > 0 {
            log::info!("Skip minting {code_type} for user {user_id}: one was issued within the window");
            return Ok(None);
        }

        let code = generate_unique_discount_code(conn, code_type).await?;
        let reward = discount_codes::ActiveModel {
            user_id: Set(user_id),
            code: Set(code.clone()),
            code_type: Set(code_type),
            uses: Set(0),
            total_uses: Set(0),
            is_active: Set(true),
            percentage: Set(None),
            expires_at: Set(Some(now + Duration::days(config.code_ttl_days))),
            mint_window: Set(Some(mint_window(now, config.window_hours))),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = discount_codes::Entity::insert(reward)
            .on_conflict(
                OnConflict::columns([
                    discount_codes::Column::UserId,
                    discount_codes::Column::CodeType,
                    discount_codes::Column::MintWindow,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        if inserted == 0 {
            log::warn!("Concurrent {code_type} mint for user {user_id} lost the race");
            return Ok(None);
        }

        let reward = DiscountCodeService::find_by_code(conn, &code)
            .await?
            .ok_or_else(|| AppError::InternalError("Minted code vanished".to_string()))?;
        log::info!("Minted {} code {} for user {}", code_type, reward.code, user_id);
        Ok(Some(reward))
    }

    /// 个人码使用情况，附带该用户名下的全部优惠码
    pub async fn get_personal_stats(&self, user_id: i64) -> AppResult<PersonalCodeStatsResponse> {
        let personal = DiscountCodeService::find_active_personal_code(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Personal code not found".to_string()))?;

        let reward70_count =
            DiscountCodeService::count_codes(&self.pool, user_id, CodeType::Reward70).await?;
        let free_count =
            DiscountCodeService::count_codes(&self.pool, user_id, CodeType::FreeAccount).await?;

        let codes = DiscountCodeService::list_user_codes(&self.pool, user_id).await?;

        Ok(PersonalCodeStatsResponse {
            next_reward70_threshold: next_threshold(personal.total_uses, REWARD70_EVERY),
            next_free_threshold: next_threshold(personal.total_uses, FREE_ACCOUNT_EVERY),
            code: personal.code,
            uses: personal.uses,
            total_uses: personal.total_uses,
            reward70_count,
            free_count,
            codes,
        })
    }
}

/// 累计次数达到的奖励档位
fn tiers_reached(total_uses: i64) -> Vec<CodeType> {
    let mut tiers = Vec::new();
    if total_uses > 0 && total_uses % REWARD70_EVERY == 0 {
        tiers.push(CodeType::Reward70);
    }
    if total_uses > 0 && total_uses % FREE_ACCOUNT_EVERY == 0 {
        tiers.push(CodeType::FreeAccount);
    }
    tiers
}

fn next_threshold(total_uses: i64, step: i64) -> i64 {
    (total_uses / step + 1) * step
}

/// 以窗口长度切分时间轴后的序号
fn mint_window(now: DateTime<Utc>, window_hours: i64) -> i64 {
    now.timestamp().div_euclid(window_hours.max(1) * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{test_pool, test_pool_concurrent};
    use sea_orm::{ActiveModelTrait, QueryOrder};

    async fn setup() -> (RewardService, DatabaseConnection, String) {
        let pool = test_pool().await;
        let personal = DiscountCodeService::new(pool.clone())
            .ensure_personal_code(1)
            .await
            .unwrap();
        let service = RewardService::new(pool.clone(), RewardConfig::default());
        (service, pool, personal.code)
    }

    async fn rewards(pool: &DatabaseConnection, code_type: CodeType) -> Vec<discount_codes::Model> {
        discount_codes::Entity::find()
            .filter(discount_codes::Column::UserId.eq(1))
            .filter(discount_codes::Column::CodeType.eq(code_type))
            .order_by_asc(discount_codes::Column::Id)
            .all(pool)
            .await
            .unwrap()
    }

    /// 把已发放的奖励码挪到窗口之外
    async fn backdate_rewards(pool: &DatabaseConnection, hours: i64) {
        for code_type in [CodeType::Reward70, CodeType::FreeAccount] {
            for reward in rewards(pool, code_type).await {
                let created_at = reward.created_at - Duration::hours(hours);
                let mut active: discount_codes::ActiveModel = reward.into();
                active.created_at = Set(created_at);
                active.mint_window = Set(Some(mint_window(created_at, 24)));
                active.update(pool).await.unwrap();
            }
        }
    }

    #[test]
    fn test_tiers_reached() {
        assert!(tiers_reached(0).is_empty());
        assert!(tiers_reached(4).is_empty());
        assert_eq!(tiers_reached(5), vec![CodeType::Reward70]);
        assert_eq!(
            tiers_reached(10),
            vec![CodeType::Reward70, CodeType::FreeAccount]
        );
        assert_eq!(next_threshold(4, 5), 5);
        assert_eq!(next_threshold(5, 5), 10);
        assert_eq!(next_threshold(7, 10), 10);
    }

    #[tokio::test]
    async fn test_fifth_redemption_mints_reward70() {
        let (service, pool, code) = setup().await;

        for _ in 0..4 {
            let r = service.record_redemption(&code, None).await.unwrap();
            assert!(r.minted.is_empty());
        }

        let before = Utc::now();
        let fifth = service.record_redemption(&code, None).await.unwrap();
        assert_eq!(fifth.minted.len(), 1);
        assert_eq!(fifth.minted[0].code_type, CodeType::Reward70);
        assert_eq!(fifth.uses, 0);
        assert_eq!(fifth.total_uses, 5);

        let minted = rewards(&pool, CodeType::Reward70).await;
        assert_eq!(minted.len(), 1);
        let expires_at = minted[0].expires_at.unwrap();
        assert!(expires_at >= before + Duration::days(40));
        assert!(expires_at <= Utc::now() + Duration::days(40));
    }

    #[tokio::test]
    async fn test_no_second_reward_within_window() {
        let (service, pool, code) = setup().await;

        for _ in 0..10 {
            service.record_redemption(&code, None).await.unwrap();
        }

        // 第 10 次时 70% 码仍在窗口期内，只发免费码
        assert_eq!(rewards(&pool, CodeType::Reward70).await.len(), 1);
        assert_eq!(rewards(&pool, CodeType::FreeAccount).await.len(), 1);

        let stats = service.get_personal_stats(1).await.unwrap();
        assert_eq!(stats.total_uses, 10);
        assert_eq!(stats.uses, 0);
        assert_eq!(stats.reward70_count, 1);
        assert_eq!(stats.free_count, 1);
        assert_eq!(stats.next_reward70_threshold, 15);
        assert_eq!(stats.next_free_threshold, 20);
        // 个人码 + 两张奖励码
        assert_eq!(stats.codes.len(), 3);
    }

    #[tokio::test]
    async fn test_window_elapsed_allows_next_reward() {
        let (service, pool, code) = setup().await;

        for _ in 0..5 {
            service.record_redemption(&code, None).await.unwrap();
        }
        backdate_rewards(&pool, 25).await;

        for _ in 0..5 {
            service.record_redemption(&code, None).await.unwrap();
        }

        assert_eq!(rewards(&pool, CodeType::Reward70).await.len(), 2);
        assert_eq!(rewards(&pool, CodeType::FreeAccount).await.len(), 1);
    }

    #[tokio::test]
    async fn test_uses_below_threshold_does_not_mint() {
        let (service, pool, code) = setup().await;

        for _ in 0..4 {
            service.record_redemption(&code, None).await.unwrap();
        }
        let stats = service.get_personal_stats(1).await.unwrap();
        assert_eq!(stats.uses, 4);
        assert_eq!(stats.next_reward70_threshold, 5);
        assert!(rewards(&pool, CodeType::Reward70).await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_order_is_counted_once() {
        let (service, _pool, code) = setup().await;

        let first = service.record_redemption(&code, Some(42)).await.unwrap();
        assert!(!first.duplicate);
        assert_eq!(first.total_uses, 1);

        let second = service.record_redemption(&code, Some(42)).await.unwrap();
        assert!(second.duplicate);
        assert_eq!(second.total_uses, 1);

        let third = service.record_redemption(&code, Some(43)).await.unwrap();
        assert_eq!(third.total_uses, 2);
    }

    #[tokio::test]
    async fn test_only_personal_codes_accrue() {
        let (service, pool, code) = setup().await;
        for _ in 0..5 {
            service.record_redemption(&code, None).await.unwrap();
        }
        let reward = rewards(&pool, CodeType::Reward70).await.remove(0);

        let result = service.record_redemption(&reward.code, None).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let unknown = service.record_redemption("P-NOTREAL", None).await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redemptions_mint_once() {
        let (pool, _dir) = test_pool_concurrent().await;
        let code = DiscountCodeService::new(pool.clone())
            .ensure_personal_code(1)
            .await
            .unwrap()
            .code;
        let service = RewardService::new(pool.clone(), RewardConfig::default());

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let service = service.clone();
                let code = code.clone();
                tokio::spawn(async move { service.record_redemption(&code, Some(100 + i)).await })
            })
            .collect();
        for handle in futures_util::future::join_all(handles).await {
            handle.unwrap().unwrap();
        }

        assert_eq!(rewards(&pool, CodeType::Reward70).await.len(), 1);
        let stats = service.get_personal_stats(1).await.unwrap();
        assert_eq!(stats.total_uses, 5);
        assert_eq!(stats.uses, 0);
    }
}
