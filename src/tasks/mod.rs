//! Background jobs started once at boot via `spawn_all`.

use crate::config::RewardConfig;
use crate::services::DiscountCodeService;

/// Spawn all background tasks. Detaches via `tokio::spawn` and returns immediately.
pub fn spawn_all(discount_code_service: DiscountCodeService, config: &RewardConfig) {
    // 过期优惠码置为失效（校验时也会按 expires_at 判断，这里只是让状态列保持一致）
    {
        let svc = discount_code_service.clone();
        let interval = std::time::Duration::from_secs(config.expiry_sweep_interval_secs.max(60));
        tokio::spawn(async move {
            loop {
                match svc.expire_stale_codes().await {
                    Ok(n) if n > 0 => log::info!("Expired discount codes deactivated: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to deactivate expired codes: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
