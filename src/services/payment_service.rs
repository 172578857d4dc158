use crate::config::RewardConfig;
use crate::entities::{
    CodeType, OrderStatus, TopupMethod, TopupStatus, WalletSource, order_entity as orders,
    payment_reference_entity as payment_references,
};
use crate::error::{AppError, AppResult};
use crate::models::{PaymentReferenceResponse, PaymentTarget, ProviderStatus};
use crate::services::{
    DiscountCodeService, RewardService, TopupService, TopupTransition, WalletService,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

/// 一次回调的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// 非完成态，不做处理
    Ignored,
    UnknownReference,
    /// 关联号存在但业务对象已不存在
    TargetMissing,
    /// 重复投递，之前已处理过
    AlreadyProcessed,
    Credited { user_id: i64, new_balance: i64 },
    OrderPaid { order_id: i64 },
}

#[derive(Clone)]
pub struct PaymentService {
    pool: DatabaseConnection,
    rewards: RewardConfig,
}

impl PaymentService {
    pub fn new(pool: DatabaseConnection, rewards: RewardConfig) -> Self {
        Self { pool, rewards }
    }

    /// 为业务对象生成交给支付方的关联号
    pub async fn issue_reference_in<C: ConnectionTrait>(
        conn: &C,
        target: PaymentTarget,
    ) -> AppResult<payment_references::Model> {
        let reference = payment_references::ActiveModel {
            identifier: Set(Uuid::new_v4().to_string()),
            target_kind: Set(target.kind()),
            target_id: Set(target.id()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        Ok(reference)
    }

    /// 用户为自己的待支付订单申请关联号
    pub async fn issue_order_reference(
        &self,
        user_id: i64,
        order_id: i64,
    ) -> AppResult<PaymentReferenceResponse> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.status != OrderStatus::Pending {
            return Err(AppError::Conflict("Order is not awaiting payment".to_string()));
        }

        let reference = Self::issue_reference_in(&self.pool, PaymentTarget::Order(order.id)).await?;
        log::info!("Issued payment reference for order #{order_id}");
        Ok(reference.into())
    }

    /// 处理支付方回调。
    ///
    /// 关联号经 payment_references 表解析为充值申请或订单；状态迁移是条件更新，
    /// 同一回调重复投递只会生效一次。入账失败时整个事务回滚，申请保持 pending。
    pub async fn reconcile(&self, identifier: &str, status: &str) -> AppResult<ReconcileOutcome> {
        if ProviderStatus::parse(status) != ProviderStatus::Finished {
            log::info!("Payment {identifier} reported status {status:?}, nothing to do");
            return Ok(ReconcileOutcome::Ignored);
        }

        let Some(reference) = payment_references::Entity::find()
            .filter(payment_references::Column::Identifier.eq(identifier.trim()))
            .one(&self.pool)
            .await?
        else {
            log::warn!("Payment callback for unknown reference {identifier}");
            return Ok(ReconcileOutcome::UnknownReference);
        };

        let txn = self.pool.begin().await?;
        let outcome = match PaymentTarget::from(&reference) {
            PaymentTarget::WalletTopup(id) => {
                match TopupService::transition_in(&txn, id, TopupStatus::Approved).await? {
                    TopupTransition::Applied(request) => {
                        let entry = WalletService::adjust_in(
                            &txn,
                            request.user_id,
                            request.amount,
                            &format!(
                                "Top-up #{} confirmed by {}",
                                request.id,
                                method_label(request.method)
                            ),
                            WalletSource::PaymentWebhook,
                        )
                        .await?;
                        ReconcileOutcome::Credited {
                            user_id: request.user_id,
                            new_balance: entry.balance_after,
                        }
                    }
                    TopupTransition::AlreadyFinal(_) => ReconcileOutcome::AlreadyProcessed,
                    TopupTransition::Missing => ReconcileOutcome::TargetMissing,
                }
            }
            PaymentTarget::Order(id) => Self::mark_order_paid(&txn, &self.rewards, id).await?,
        };
        txn.commit().await?;

        match &outcome {
            ReconcileOutcome::Credited {
                user_id,
                new_balance,
            } => log::info!(
                "Payment {identifier} credited user {user_id}, balance now {new_balance}"
            ),
            ReconcileOutcome::OrderPaid { order_id } => {
                log::info!("Payment {identifier} marked order #{order_id} paid")
            }
            ReconcileOutcome::AlreadyProcessed => {
                log::info!("Payment {identifier} was already processed")
            }
            other => log::warn!("Payment {identifier}: {other:?}"),
        }
        Ok(outcome)
    }

    /// 订单推进到 paid，不涉及钱包。
    ///
    /// 订单带的是个人码时，同一事务内按订单号记一次使用，重复回调不会重复计数。
    async fn mark_order_paid<C: ConnectionTrait>(
        conn: &C,
        rewards: &RewardConfig,
        order_id: i64,
    ) -> AppResult<ReconcileOutcome> {
        let now = Utc::now();
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(OrderStatus::Paid))
            .col_expr(orders::Column::PaidAt, Expr::value(now))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::Id.eq(order_id))
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .exec(conn)
            .await?;
        let order = orders::Entity::find_by_id(order_id).one(conn).await?;
        let Some(order) = order else {
            return Ok(ReconcileOutcome::TargetMissing);
        };
        if result.rows_affected == 0 {
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        if let Some(code) = order.discount_code.as_deref() {
            let is_personal = DiscountCodeService::find_by_code(conn, code)
                .await?
                .is_some_and(|c| c.code_type == CodeType::Personal);
            if is_personal {
                match RewardService::record_redemption_in(conn, rewards, code, Some(order_id))
                    .await
                {
                    Ok(redemption) => log::info!(
                        "Order #{order_id} counted a use of {} (total {})",
                        redemption.code,
                        redemption.total_uses
                    ),
                    // 码已失效不影响订单入账
                    Err(AppError::ValidationError(msg)) => {
                        log::warn!("Order #{order_id} paid with unusable code {code}: {msg}")
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(ReconcileOutcome::OrderPaid { order_id })
    }
}

fn method_label(method: TopupMethod) -> &'static str {
    match method {
        TopupMethod::CardToCard => "card transfer",
        TopupMethod::Shaparak => "gateway",
        TopupMethod::Crypto => "crypto invoice",
    }
}
