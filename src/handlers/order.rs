use crate::middlewares::current_user;
use crate::models::*;
use crate::services::PaymentService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/orders/{id}/payment-reference",
    tag = "order",
    params(
        ("id" = i64, Path, description = "订单ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "生成支付关联号", body = PaymentReferenceResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "订单不存在"),
        (status = 409, description = "订单不是待支付状态")
    )
)]
pub async fn create_payment_reference(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;

    match payment_service
        .issue_order_reference(user.user_id, path.into_inner())
        .await
    {
        Ok(reference) => Ok(HttpResponse::Ok().json(ApiResponse::success(reference))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("/{id}/payment-reference", web::post().to(create_payment_reference)),
    );
}
