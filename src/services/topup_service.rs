use crate::config::PaymentConfig;
use crate::entities::{
    TopupStatus, WalletSource, topup_request_entity as topup_requests, wallet_entity as wallets,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateTopupRequest, PaginatedResponse, PaginationParams, PaymentTarget, TopupQuery,
    TopupRequestResponse, TopupReviewResponse,
};
use crate::services::{PaymentService, WalletService};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};

const MAX_NOTE_LEN: usize = 500;

/// pending 状态迁移的结果
#[derive(Debug)]
pub enum TopupTransition {
    /// 本次调用完成了迁移
    Applied(topup_requests::Model),
    /// 已是终态，未做变更
    AlreadyFinal(topup_requests::Model),
    Missing,
}

#[derive(Clone)]
pub struct TopupService {
    pool: DatabaseConnection,
    config: PaymentConfig,
}

impl TopupService {
    pub fn new(pool: DatabaseConnection, config: PaymentConfig) -> Self {
        Self { pool, config }
    }

    pub async fn create_request(
        &self,
        user_id: i64,
        request: CreateTopupRequest,
    ) -> AppResult<TopupRequestResponse> {
        self.check_amount(request.amount)?;
        let note = match request.note.as_deref().map(str::trim) {
            Some(n) if n.chars().count() > MAX_NOTE_LEN => {
                return Err(AppError::ValidationError(format!(
                    "Note must be at most {MAX_NOTE_LEN} characters"
                )));
            }
            Some("") | None => None,
            Some(n) => Some(n.to_string()),
        };

        let txn = self.pool.begin().await?;

        let has_wallet = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .count(&txn)
            .await?;
        if has_wallet == 0 {
            return Err(AppError::wallet_not_found());
        }

        let now = Utc::now();
        let created = topup_requests::ActiveModel {
            user_id: Set(user_id),
            method: Set(request.method),
            amount: Set(request.amount),
            status: Set(TopupStatus::Pending),
            note: Set(note),
            reviewed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // 网关/加密货币充值需要交给支付方的关联号
        let payment_identifier = if request.method.is_provider_confirmed() {
            let reference =
                PaymentService::issue_reference_in(&txn, PaymentTarget::WalletTopup(created.id))
                    .await?;
            Some(reference.identifier)
        } else {
            None
        };

        txn.commit().await?;

        log::info!(
            "User {} requested top-up #{} of {} via {:?}",
            user_id,
            created.id,
            created.amount,
            created.method
        );

        let mut response = TopupRequestResponse::from(created);
        response.payment_identifier = payment_identifier;
        Ok(response)
    }

    pub async fn list_user_requests(
        &self,
        user_id: i64,
        query: &TopupQuery,
    ) -> AppResult<PaginatedResponse<TopupRequestResponse>> {
        let select =
            topup_requests::Entity::find().filter(topup_requests::Column::UserId.eq(user_id));
        self.paginate(select, query).await
    }

    /// 管理员查看全部充值申请，可按状态筛选
    pub async fn list_requests(
        &self,
        query: &TopupQuery,
    ) -> AppResult<PaginatedResponse<TopupRequestResponse>> {
        self.paginate(topup_requests::Entity::find(), query).await
    }

    async fn paginate(
        &self,
        mut select: Select<topup_requests::Entity>,
        query: &TopupQuery,
    ) -> AppResult<PaginatedResponse<TopupRequestResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        if let Some(status) = query.status {
            select = select.filter(topup_requests::Column::Status.eq(status));
        }

        let total = select.clone().count(&self.pool).await?;
        let items = select
            .order_by_desc(topup_requests::Column::CreatedAt)
            .order_by_desc(topup_requests::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?
            .into_iter()
            .map(TopupRequestResponse::from)
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// 审核通过并入账，状态迁移与入账在同一事务内
    pub async fn approve(&self, id: i64) -> AppResult<TopupReviewResponse> {
        let txn = self.pool.begin().await?;

        let request = match Self::transition_in(&txn, id, TopupStatus::Approved).await? {
            TopupTransition::Applied(request) => request,
            TopupTransition::AlreadyFinal(request) => {
                return Err(AppError::Conflict(format!(
                    "Top-up request #{} is already {}",
                    request.id, request.status
                )));
            }
            TopupTransition::Missing => {
                return Err(AppError::NotFound("Top-up request not found".to_string()));
            }
        };

        let entry = WalletService::adjust_in(
            &txn,
            request.user_id,
            request.amount,
            &format!("Top-up #{} approved", request.id),
            WalletSource::Topup,
        )
        .await?;

        txn.commit().await?;

        log::info!(
            "Approved top-up #{} for user {}, balance now {}",
            request.id,
            request.user_id,
            entry.balance_after
        );
        Ok(TopupReviewResponse {
            request: request.into(),
            new_balance: Some(entry.balance_after),
        })
    }

    pub async fn reject(&self, id: i64) -> AppResult<TopupReviewResponse> {
        match Self::transition_in(&self.pool, id, TopupStatus::Rejected).await? {
            TopupTransition::Applied(request) => {
                log::info!("Rejected top-up #{} for user {}", request.id, request.user_id);
                Ok(TopupReviewResponse {
                    request: request.into(),
                    new_balance: None,
                })
            }
            TopupTransition::AlreadyFinal(request) => Err(AppError::Conflict(format!(
                "Top-up request #{} is already {}",
                request.id, request.status
            ))),
            TopupTransition::Missing => {
                Err(AppError::NotFound("Top-up request not found".to_string()))
            }
        }
    }

    /// 自助测试充值，仅在配置开启时可用
    pub async fn test_charge(&self, user_id: i64, amount: i64) -> AppResult<i64> {
        if !self.config.allow_test_charge {
            return Err(AppError::Forbidden);
        }
        self.check_amount(amount)?;

        let txn = self.pool.begin().await?;
        let entry = WalletService::adjust_in(
            &txn,
            user_id,
            amount,
            "Test charge",
            WalletSource::TestCharge,
        )
        .await?;
        txn.commit().await?;

        log::info!("Test charge of {amount} for user {user_id}");
        Ok(entry.balance_after)
    }

    /// 仅当当前为 pending 时迁移到目标状态（条件更新，不会重复迁移）
    pub async fn transition_in<C: ConnectionTrait>(
        conn: &C,
        id: i64,
        to: TopupStatus,
    ) -> AppResult<TopupTransition> {
        let now = Utc::now();
        let result = topup_requests::Entity::update_many()
            .col_expr(topup_requests::Column::Status, Expr::value(to))
            .col_expr(topup_requests::Column::ReviewedAt, Expr::value(now))
            .col_expr(topup_requests::Column::UpdatedAt, Expr::value(now))
            .filter(topup_requests::Column::Id.eq(id))
            .filter(topup_requests::Column::Status.eq(TopupStatus::Pending))
            .exec(conn)
            .await?;

        let current = topup_requests::Entity::find_by_id(id).one(conn).await?;
        Ok(match current {
            None => TopupTransition::Missing,
            Some(request) if result.rows_affected == 1 => TopupTransition::Applied(request),
            Some(request) => TopupTransition::AlreadyFinal(request),
        })
    }

    fn check_amount(&self, amount: i64) -> AppResult<()> {
        if amount < self.config.min_topup_amount || amount > self.config.max_topup_amount {
            return Err(AppError::InvalidAmount(format!(
                "Amount must be between {} and {}",
                self.config.min_topup_amount, self.config.max_topup_amount
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::entities::TopupMethod;

    async fn setup(config: PaymentConfig) -> (TopupService, WalletService) {
        let pool = test_pool().await;
        WalletService::create_wallet(&pool, 1).await.unwrap();
        (
            TopupService::new(pool.clone(), config),
            WalletService::new(pool),
        )
    }

    fn card_request(amount: i64) -> CreateTopupRequest {
        CreateTopupRequest {
            method: TopupMethod::CardToCard,
            amount,
            note: Some("ref 1234".to_string()),
        }
    }

    #[tokio::test]
    async fn test_approve_credits_exactly_once() {
        let (topups, wallets) = setup(PaymentConfig::default()).await;
        let request = topups.create_request(1, card_request(5000)).await.unwrap();
        assert_eq!(request.status, TopupStatus::Pending);
        assert!(request.payment_identifier.is_none());

        let review = topups.approve(request.id).await.unwrap();
        assert_eq!(review.new_balance, Some(5000));
        assert_eq!(review.request.status, TopupStatus::Approved);
        assert!(review.request.reviewed_at.is_some());

        let again = topups.approve(request.id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        let rejected = topups.reject(request.id).await;
        assert!(matches!(rejected, Err(AppError::Conflict(_))));

        let audit = wallets.audit(1).await.unwrap();
        assert_eq!(audit.balance, 5000);
        assert_eq!(audit.transaction_count, 1);
    }

    #[tokio::test]
    async fn test_reject_does_not_credit() {
        let (topups, wallets) = setup(PaymentConfig::default()).await;
        let request = topups.create_request(1, card_request(700)).await.unwrap();

        let review = topups.reject(request.id).await.unwrap();
        assert_eq!(review.request.status, TopupStatus::Rejected);
        assert_eq!(review.new_balance, None);
        assert_eq!(wallets.audit(1).await.unwrap().balance, 0);

        assert!(matches!(
            topups.approve(request.id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            topups.approve(9999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_amount_bounds_and_wallet_required() {
        let (topups, _) = setup(PaymentConfig::default()).await;
        assert!(matches!(
            topups.create_request(1, card_request(0)).await,
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            topups.create_request(1, card_request(-500)).await,
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            topups.create_request(2, card_request(500)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_topup_gets_payment_identifier() {
        let (topups, _) = setup(PaymentConfig::default()).await;
        let request = topups
            .create_request(
                1,
                CreateTopupRequest {
                    method: TopupMethod::Crypto,
                    amount: 2500,
                    note: None,
                },
            )
            .await
            .unwrap();
        assert!(request.payment_identifier.is_some());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (topups, _) = setup(PaymentConfig::default()).await;
        let first = topups.create_request(1, card_request(100)).await.unwrap();
        topups.create_request(1, card_request(200)).await.unwrap();
        topups.approve(first.id).await.unwrap();

        let pending = topups
            .list_requests(&TopupQuery {
                page: None,
                per_page: None,
                status: Some(TopupStatus::Pending),
            })
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.data[0].amount, 200);

        let mine = topups
            .list_user_requests(
                1,
                &TopupQuery {
                    page: None,
                    per_page: None,
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(mine.total, 2);
    }

    #[tokio::test]
    async fn test_test_charge_requires_flag() {
        let (topups, _) = setup(PaymentConfig::default()).await;
        assert!(matches!(
            topups.test_charge(1, 500).await,
            Err(AppError::Forbidden)
        ));

        let (topups, wallets) = setup(PaymentConfig {
            allow_test_charge: true,
            ..PaymentConfig::default()
        })
        .await;
        assert_eq!(topups.test_charge(1, 500).await.unwrap(), 500);
        assert!(wallets.audit(1).await.unwrap().consistent);
    }
}
