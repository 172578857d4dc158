use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{DiscountCodeService, RewardService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/rewards/personal",
    tag = "rewards",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "个人码使用情况", body = PersonalCodeStatsResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "尚未开通个人码")
    )
)]
pub async fn get_personal_stats(
    reward_service: web::Data<RewardService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;

    match reward_service.get_personal_stats(user.user_id).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(stats))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 结账前校验优惠码，无效时仍返回 200 与 valid=false
#[utoipa::path(
    post,
    path = "/rewards/verify",
    tag = "rewards",
    request_body = VerifyCodeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "校验结果", body = VerifyCodeResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn verify_code(
    discount_code_service: web::Data<DiscountCodeService>,
    req: HttpRequest,
    request: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;

    match discount_code_service
        .verify(&request.code, user.user_id)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn rewards_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rewards")
            .route("/personal", web::get().to(get_personal_stats))
            .route("/verify", web::post().to(verify_code)),
    );
}
