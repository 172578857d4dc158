use crate::entities::TopupStatus;
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{TopupService, WalletService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/wallet",
    tag = "wallet",
    params(
        ("page" = Option<u64>, Query, description = "页码"),
        ("per_page" = Option<u64>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取钱包成功", body = WalletResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "钱包不存在")
    )
)]
pub async fn get_wallet(
    wallet_service: web::Data<WalletService>,
    req: HttpRequest,
    query: web::Query<WalletQuery>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;

    match wallet_service.get_wallet(user.user_id, &query).await {
        Ok(wallet) => Ok(HttpResponse::Ok().json(ApiResponse::success(wallet))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/wallet/topups",
    tag = "wallet",
    request_body = CreateTopupRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "充值申请已提交", body = TopupRequestResponse),
        (status = 400, description = "金额或参数错误"),
        (status = 401, description = "未授权"),
        (status = 404, description = "钱包不存在")
    )
)]
pub async fn create_topup(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    request: web::Json<CreateTopupRequest>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;

    match topup_service
        .create_request(user.user_id, request.into_inner())
        .await
    {
        Ok(topup) => Ok(HttpResponse::Ok().json(ApiResponse::success(topup))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/wallet/topups",
    tag = "wallet",
    params(
        ("page" = Option<u64>, Query, description = "页码"),
        ("per_page" = Option<u64>, Query, description = "每页数量"),
        ("status" = Option<TopupStatus>, Query, description = "状态: pending/approved/rejected")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取充值申请成功", body = PaginatedTopupRequests),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_topups(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    query: web::Query<TopupQuery>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;

    match topup_service.list_user_requests(user.user_id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/wallet/test-charge",
    tag = "wallet",
    request_body = TestChargeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "测试充值成功", body = BalanceResponse),
        (status = 400, description = "金额错误"),
        (status = 403, description = "未开启测试充值")
    )
)]
pub async fn test_charge(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    request: web::Json<TestChargeRequest>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;

    match topup_service.test_charge(user.user_id, request.amount).await {
        Ok(new_balance) => Ok(HttpResponse::Ok().json(ApiResponse::success(BalanceResponse {
            new_balance,
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn wallet_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wallet")
            .route("", web::get().to(get_wallet))
            .route("/topups", web::post().to(create_topup))
            .route("/topups", web::get().to(list_topups))
            .route("/test-charge", web::post().to(test_charge)),
    );
}
