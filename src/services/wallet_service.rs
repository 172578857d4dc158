use crate::entities::{
    TransactionType, WalletSource, wallet_entity as wallets,
    wallet_transaction_entity as wallet_transactions,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    LedgerAuditResponse, PaginatedResponse, PaginationParams, WalletQuery, WalletResponse,
    WalletTransactionResponse,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

const MAX_DESCRIPTION_LEN: usize = 255;

#[derive(Clone)]
pub struct WalletService {
    pool: DatabaseConnection,
}

impl WalletService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 创建钱包（已存在则直接返回），仅供注册流程调用
    pub async fn create_wallet<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
    ) -> AppResult<wallets::Model> {
        let now = Utc::now();
        let wallet = wallets::ActiveModel {
            user_id: Set(user_id),
            balance: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = wallets::Entity::insert(wallet)
            .on_conflict(
                OnConflict::column(wallets::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        if inserted > 0 {
            log::info!("Created wallet for user {user_id}");
        }

        wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(AppError::wallet_not_found)
    }

    /// 带符号调整余额并追加一条流水，返回新余额
    pub async fn adjust(
        &self,
        user_id: i64,
        signed_amount: i64,
        description: &str,
        source: WalletSource,
    ) -> AppResult<i64> {
        let txn = self.pool.begin().await?;
        let entry = Self::adjust_in(&txn, user_id, signed_amount, description, source).await?;
        txn.commit().await?;

        log::info!(
            "Wallet of user {} adjusted by {} via {}, balance now {}",
            user_id,
            signed_amount,
            source,
            entry.balance_after
        );
        Ok(entry.balance_after)
    }

    pub async fn increase(
        &self,
        user_id: i64,
        amount: i64,
        description: &str,
        source: WalletSource,
    ) -> AppResult<i64> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Increase amount must be positive".to_string(),
            ));
        }
        self.adjust(user_id, amount, description, source).await
    }

    pub async fn decrease(
        &self,
        user_id: i64,
        amount: i64,
        description: &str,
        source: WalletSource,
    ) -> AppResult<i64> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Decrease amount must be positive".to_string(),
            ));
        }
        self.adjust(user_id, -amount, description, source).await
    }

    /// 管理员调整：正数记 increase，负数记 decrease
    pub async fn adjust_as_admin(
        &self,
        user_id: i64,
        amount: i64,
        description: &str,
    ) -> AppResult<i64> {
        self.adjust(user_id, amount, description, WalletSource::Admin)
            .await
    }

    /// 在调用方的事务里执行余额调整。
    ///
    /// 第一步就是 `balance = balance + delta` 的条件更新：越界和透支都写在
    /// WHERE 里，行锁持有到事务提交。随后在同一事务内读回新余额并写入流水，
    /// 任一步失败整体回滚。
    pub async fn adjust_in<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
        signed_amount: i64,
        description: &str,
        source: WalletSource,
    ) -> AppResult<wallet_transactions::Model> {
        let (transaction_type, magnitude) = classify(signed_amount, source)?;
        let description = validate_description(description)?;

        let now = Utc::now();
        let mut update = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(signed_amount),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(now))
            .filter(wallets::Column::UserId.eq(user_id));
        update = if signed_amount > 0 {
            update.filter(wallets::Column::Balance.lte(i64::MAX - signed_amount))
        } else {
            update.filter(wallets::Column::Balance.gte(i64::MIN - signed_amount))
        };
        if transaction_type == TransactionType::Purchase {
            // 消费不允许透支
            update = update.filter(wallets::Column::Balance.gte(magnitude));
        }

        let result = update.exec(conn).await?;
        let wallet = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(AppError::wallet_not_found)?;

        if result.rows_affected == 0 {
            if transaction_type == TransactionType::Purchase && wallet.balance < magnitude {
                return Err(AppError::ValidationError("Insufficient balance".to_string()));
            }
            return Err(AppError::InvalidAmount(
                "Resulting balance is out of range".to_string(),
            ));
        }
        let balance_after = wallet.balance;

        let entry = wallet_transactions::ActiveModel {
            wallet_id: Set(wallet.id),
            user_id: Set(user_id),
            transaction_type: Set(transaction_type),
            amount: Set(magnitude),
            balance_after: Set(balance_after),
            description: Set(description),
            source: Set(source),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        Ok(entry)
    }

    /// 钱包视图：余额 + 按时间倒序分页的流水
    pub async fn get_wallet(&self, user_id: i64, query: &WalletQuery) -> AppResult<WalletResponse> {
        let params = PaginationParams::new(query.page, query.per_page);

        let wallet = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(AppError::wallet_not_found)?;

        let total = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet.id))
            .count(&self.pool)
            .await?;

        let items: Vec<WalletTransactionResponse> = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet.id))
            .order_by_desc(wallet_transactions::Column::CreatedAt)
            .order_by_desc(wallet_transactions::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?
            .into_iter()
            .map(WalletTransactionResponse::from)
            .collect();

        Ok(WalletResponse {
            user_id,
            balance: wallet.balance,
            transactions: PaginatedResponse::new(items, &params, total),
        })
    }

    /// 对账：余额是否等于全部流水的有符号金额之和
    pub async fn audit(&self, user_id: i64) -> AppResult<LedgerAuditResponse> {
        let wallet = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(AppError::wallet_not_found)?;

        let entries = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet.id))
            .all(&self.pool)
            .await?;

        let ledger_sum: i64 = entries.iter().map(|e| e.signed_amount()).sum();
        let consistent = ledger_sum == wallet.balance;
        if !consistent {
            log::error!(
                "Ledger mismatch for user {}: balance {} != ledger sum {}",
                user_id,
                wallet.balance,
                ledger_sum
            );
        }

        Ok(LedgerAuditResponse {
            user_id,
            balance: wallet.balance,
            ledger_sum,
            transaction_count: entries.len() as u64,
            consistent,
        })
    }
}

/// 由带符号金额和来源得出流水类型与金额绝对值
fn classify(signed_amount: i64, source: WalletSource) -> AppResult<(TransactionType, i64)> {
    if signed_amount == 0 {
        return Err(AppError::InvalidAmount("Amount must not be zero".to_string()));
    }
    let magnitude = signed_amount
        .checked_abs()
        .ok_or_else(|| AppError::InvalidAmount("Amount is out of range".to_string()))?;

    let transaction_type = if signed_amount > 0 {
        TransactionType::Increase
    } else if source == WalletSource::Purchase {
        TransactionType::Purchase
    } else {
        TransactionType::Decrease
    };

    Ok((transaction_type, magnitude))
}

fn validate_description(description: &str) -> AppResult<String> {
    let description = description.trim();
    if description.is_empty() {
        return Err(AppError::ValidationError(
            "Description must not be empty".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::ValidationError(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{test_pool, test_pool_concurrent};

    async fn service_with_wallet(user_id: i64) -> WalletService {
        let pool = test_pool().await;
        WalletService::create_wallet(&pool, user_id).await.unwrap();
        WalletService::new(pool)
    }

    async fn ledger(service: &WalletService, user_id: i64) -> Vec<wallet_transactions::Model> {
        wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::UserId.eq(user_id))
            .order_by_asc(wallet_transactions::Column::Id)
            .all(&service.pool)
            .await
            .unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(500, WalletSource::Admin).unwrap(),
            (TransactionType::Increase, 500)
        );
        assert_eq!(
            classify(-500, WalletSource::Admin).unwrap(),
            (TransactionType::Decrease, 500)
        );
        assert_eq!(
            classify(-120, WalletSource::Purchase).unwrap(),
            (TransactionType::Purchase, 120)
        );
        assert!(matches!(
            classify(0, WalletSource::Admin),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            classify(i64::MIN, WalletSource::Admin),
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_create_wallet_is_idempotent() {
        let pool = test_pool().await;
        let first = WalletService::create_wallet(&pool, 1).await.unwrap();
        let second = WalletService::create_wallet(&pool, 1).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(wallets::Entity::find().count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_adjust_keeps_balance_equal_to_ledger_sum() {
        let service = service_with_wallet(1).await;

        for amount in [1000, -250, 75, -5000, 300] {
            service
                .adjust(1, amount, "manual", WalletSource::Admin)
                .await
                .unwrap();
            let audit = service.audit(1).await.unwrap();
            assert!(audit.consistent);
        }

        let audit = service.audit(1).await.unwrap();
        assert_eq!(audit.balance, 1000 - 250 + 75 - 5000 + 300);
        assert_eq!(audit.transaction_count, 5);

        let entries = ledger(&service, 1).await;
        assert_eq!(entries[1].transaction_type, TransactionType::Decrease);
        assert_eq!(entries[1].amount, 250);
        assert_eq!(entries[1].balance_after, 750);
    }

    #[tokio::test]
    async fn test_invalid_amount_leaves_no_entry() {
        let service = service_with_wallet(1).await;

        assert!(matches!(
            service.adjust(1, 0, "nothing", WalletSource::Admin).await,
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            service.adjust(1, i64::MIN, "overflow", WalletSource::Admin).await,
            Err(AppError::InvalidAmount(_))
        ));
        service
            .adjust(1, i64::MAX, "max", WalletSource::Admin)
            .await
            .unwrap();
        assert!(matches!(
            service.adjust(1, 1, "overflow", WalletSource::Admin).await,
            Err(AppError::InvalidAmount(_))
        ));

        assert_eq!(ledger(&service, 1).await.len(), 1);
        assert!(service.audit(1).await.unwrap().consistent);
    }

    #[tokio::test]
    async fn test_missing_wallet_is_not_created() {
        let service = service_with_wallet(1).await;

        let result = service.adjust(2, 100, "top-up", WalletSource::Topup).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let count = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(2))
            .count(&service.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_purchase_cannot_overdraw() {
        let service = service_with_wallet(1).await;
        service
            .increase(1, 500, "top-up", WalletSource::Topup)
            .await
            .unwrap();

        let result = service
            .decrease(1, 600, "order #1", WalletSource::Purchase)
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let balance = service
            .decrease(1, 500, "order #2", WalletSource::Purchase)
            .await
            .unwrap();
        assert_eq!(balance, 0);

        let entries = ledger(&service, 1).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].transaction_type, TransactionType::Purchase);
    }

    #[tokio::test]
    async fn test_admin_decrease_may_go_negative() {
        let service = service_with_wallet(1).await;
        let balance = service
            .adjust_as_admin(1, -300, "chargeback")
            .await
            .unwrap();
        assert_eq!(balance, -300);

        let entries = ledger(&service, 1).await;
        assert_eq!(entries[0].source, WalletSource::Admin);
        assert_eq!(entries[0].amount, 300);
        assert_eq!(entries[0].signed_amount(), -300);
    }

    #[tokio::test]
    async fn test_empty_description_is_rejected() {
        let service = service_with_wallet(1).await;
        let result = service.adjust(1, 100, "   ", WalletSource::Admin).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert!(ledger(&service, 1).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adjustments_do_not_lose_updates() {
        let (pool, _dir) = test_pool_concurrent().await;
        WalletService::create_wallet(&pool, 1).await.unwrap();
        let service = WalletService::new(pool);

        let handles: Vec<_> = (1..=20)
            .map(|i| {
                let service = service.clone();
                let amount = if i % 3 == 0 { -i * 10 } else { i * 10 };
                tokio::spawn(async move {
                    service
                        .adjust(1, amount, "concurrent", WalletSource::Admin)
                        .await
                })
            })
            .collect();
        for handle in futures_util::future::join_all(handles).await {
            handle.unwrap().unwrap();
        }

        let expected: i64 = (1..=20)
            .map(|i: i64| if i % 3 == 0 { -i * 10 } else { i * 10 })
            .sum();
        let audit = service.audit(1).await.unwrap();
        assert_eq!(audit.balance, expected);
        assert_eq!(audit.transaction_count, 20);
        assert!(audit.consistent);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_never_overdraw() {
        let (pool, _dir) = test_pool_concurrent().await;
        WalletService::create_wallet(&pool, 1).await.unwrap();
        let service = WalletService::new(pool);
        service
            .increase(1, 500, "top-up", WalletSource::Topup)
            .await
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .decrease(1, 100, &format!("order #{i}"), WalletSource::Purchase)
                        .await
                })
            })
            .collect();
        let mut succeeded = 0;
        for handle in futures_util::future::join_all(handles).await {
            match handle.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => assert!(matches!(e, AppError::ValidationError(_))),
            }
        }

        assert_eq!(succeeded, 5);
        let audit = service.audit(1).await.unwrap();
        assert_eq!(audit.balance, 0);
        assert_eq!(audit.transaction_count, 6);
        assert!(audit.consistent);
    }

    #[tokio::test]
    async fn test_huge_page_returns_empty_list() {
        let service = service_with_wallet(1).await;
        service
            .adjust(1, 100, "top-up", WalletSource::Topup)
            .await
            .unwrap();

        let view = service
            .get_wallet(
                1,
                &WalletQuery {
                    page: Some(u64::MAX),
                    per_page: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(view.balance, 100);
        assert!(view.transactions.data.is_empty());
        assert_eq!(view.transactions.total, 1);
    }

    #[tokio::test]
    async fn test_get_wallet_lists_newest_first() {
        let service = service_with_wallet(1).await;
        for amount in [100, 200, 300] {
            service
                .adjust(1, amount, "top-up", WalletSource::Topup)
                .await
                .unwrap();
        }

        let view = service
            .get_wallet(
                1,
                &WalletQuery {
                    page: None,
                    per_page: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.balance, 600);
        assert_eq!(view.transactions.total, 3);
        assert_eq!(view.transactions.total_pages, 2);
        let amounts: Vec<i64> = view.transactions.data.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![300, 200]);
    }
}
