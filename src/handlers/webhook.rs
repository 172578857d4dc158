use crate::config::PaymentConfig;
use crate::models::PaymentWebhookPayload;
use crate::services::PaymentService;
use crate::utils::tokens_match;
use actix_web::{HttpRequest, HttpResponse, Result, web};
use log::{error, info, warn};
use serde_json::json;

pub const WEBHOOK_TOKEN_HEADER: &str = "X-Webhook-Token";

/// 支付方回调
///
/// 令牌校验失败返回 401；载荷能解析时无论处理结果如何都返回 200，
/// 避免支付方无限重试，失败原因只记日志。
#[utoipa::path(
    post,
    path = "/webhook/payments",
    tag = "webhook",
    request_body = PaymentWebhookPayload,
    responses(
        (status = 200, description = "已接收"),
        (status = 400, description = "载荷格式错误"),
        (status = 401, description = "令牌无效")
    )
)]
pub async fn payment_webhook(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<PaymentConfig>,
    payment_service: web::Data<PaymentService>,
) -> Result<HttpResponse> {
    if let Some(expected) = config.webhook_token.as_deref() {
        let provided = req
            .headers()
            .get(WEBHOOK_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !tokens_match(provided, expected) {
            warn!("Payment webhook rejected: bad or missing token");
            return Ok(HttpResponse::Unauthorized().json(json!({
                "error": "Invalid webhook token"
            })));
        }
    }

    let payload: PaymentWebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Invalid payment webhook payload: {e}");
            return Ok(HttpResponse::BadRequest().json(json!({
                "error": "Invalid payload"
            })));
        }
    };

    info!(
        "Received payment webhook for {} with status {}",
        payload.identifier, payload.status
    );

    match payment_service
        .reconcile(&payload.identifier, &payload.status)
        .await
    {
        Ok(outcome) => info!("Payment webhook {} handled: {outcome:?}", payload.identifier),
        Err(e) => error!(
            "Failed to process payment webhook {}: {e}",
            payload.identifier
        ),
    }

    Ok(HttpResponse::Ok().json(json!({ "received": true })))
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/payments", web::post().to(payment_webhook)));
}
