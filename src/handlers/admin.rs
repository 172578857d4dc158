use crate::entities::TopupStatus;
use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::{
    AccountService, DiscountCodeService, RewardService, TopupService, WalletService,
};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/admin/rewards/redemptions",
    tag = "admin",
    request_body = RecordRedemptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已记录个人码使用", body = RedemptionResponse),
        (status = 400, description = "不是有效的个人码"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "优惠码不存在")
    )
)]
pub async fn record_redemption(
    reward_service: web::Data<RewardService>,
    req: HttpRequest,
    request: web::Json<RecordRedemptionRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    match reward_service
        .record_redemption(&request.code, request.order_id)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/users/{user_id}/provision",
    tag = "admin",
    params(
        ("user_id" = i64, Path, description = "用户ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已开通钱包与个人码", body = ProvisionResponse),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn provision_user(
    account_service: web::Data<AccountService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    match account_service.provision(path.into_inner()).await {
        Ok(account) => Ok(HttpResponse::Ok().json(ApiResponse::success(account))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/wallets/{user_id}",
    tag = "admin",
    params(
        ("user_id" = i64, Path, description = "用户ID"),
        ("page" = Option<u64>, Query, description = "页码"),
        ("per_page" = Option<u64>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "用户钱包", body = WalletResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "钱包不存在")
    )
)]
pub async fn get_user_wallet(
    wallet_service: web::Data<WalletService>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<WalletQuery>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    match wallet_service.get_wallet(path.into_inner(), &query).await {
        Ok(wallet) => Ok(HttpResponse::Ok().json(ApiResponse::success(wallet))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/wallets/{user_id}/adjust",
    tag = "admin",
    params(
        ("user_id" = i64, Path, description = "用户ID")
    ),
    request_body = AdminAdjustRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "调整成功", body = BalanceResponse),
        (status = 400, description = "金额或说明无效"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "钱包不存在")
    )
)]
pub async fn adjust_wallet(
    wallet_service: web::Data<WalletService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AdminAdjustRequest>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    let user_id = path.into_inner();

    match wallet_service
        .adjust_as_admin(user_id, request.amount, &request.description)
        .await
    {
        Ok(new_balance) => {
            log::info!(
                "Admin {} adjusted wallet of user {} by {}",
                admin.user_id,
                user_id,
                request.amount
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(BalanceResponse { new_balance })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/wallets/{user_id}/audit",
    tag = "admin",
    params(
        ("user_id" = i64, Path, description = "用户ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "余额与流水对账结果", body = LedgerAuditResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "钱包不存在")
    )
)]
pub async fn audit_wallet(
    wallet_service: web::Data<WalletService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    match wallet_service.audit(path.into_inner()).await {
        Ok(audit) => Ok(HttpResponse::Ok().json(ApiResponse::success(audit))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/topups",
    tag = "admin",
    params(
        ("page" = Option<u64>, Query, description = "页码"),
        ("per_page" = Option<u64>, Query, description = "每页数量"),
        ("status" = Option<TopupStatus>, Query, description = "状态: pending/approved/rejected")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "充值申请列表", body = PaginatedTopupRequests),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn list_topups(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    query: web::Query<TopupQuery>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    match topup_service.list_requests(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/topups/{id}/approve",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "充值申请ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "审核通过并入账", body = TopupReviewResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "申请不存在"),
        (status = 409, description = "申请已处理")
    )
)]
pub async fn approve_topup(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    let id = path.into_inner();

    match topup_service.approve(id).await {
        Ok(review) => {
            log::info!("Admin {} approved top-up #{}", admin.user_id, id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(review)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/topups/{id}/reject",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "充值申请ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已拒绝", body = TopupReviewResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "申请不存在"),
        (status = 409, description = "申请已处理")
    )
)]
pub async fn reject_topup(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    let id = path.into_inner();

    match topup_service.reject(id).await {
        Ok(review) => {
            log::info!("Admin {} rejected top-up #{}", admin.user_id, id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(review)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/discount-codes",
    tag = "admin",
    request_body = CreateCustomCodeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "活动码已创建", body = DiscountCodeResponse),
        (status = 400, description = "参数错误"),
        (status = 403, description = "需要管理员权限"),
        (status = 409, description = "优惠码已存在")
    )
)]
pub async fn create_custom_code(
    discount_code_service: web::Data<DiscountCodeService>,
    req: HttpRequest,
    request: web::Json<CreateCustomCodeRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    match discount_code_service
        .create_custom_code(request.into_inner())
        .await
    {
        Ok(code) => Ok(HttpResponse::Ok().json(ApiResponse::success(code))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/discount-codes/{id}/deactivate",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "优惠码ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已停用", body = DiscountCodeResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "优惠码不存在")
    )
)]
pub async fn deactivate_code(
    discount_code_service: web::Data<DiscountCodeService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    match discount_code_service.deactivate_code(path.into_inner()).await {
        Ok(code) => Ok(HttpResponse::Ok().json(ApiResponse::success(code))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/discount-codes/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "优惠码ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已删除"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "优惠码不存在")
    )
)]
pub async fn delete_code(
    discount_code_service: web::Data<DiscountCodeService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    let id = path.into_inner();

    match discount_code_service.delete_code(id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            id,
            "Discount code deleted",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/rewards/redemptions", web::post().to(record_redemption))
            .route("/users/{user_id}/provision", web::post().to(provision_user))
            .route("/wallets/{user_id}", web::get().to(get_user_wallet))
            .route("/wallets/{user_id}/adjust", web::post().to(adjust_wallet))
            .route("/wallets/{user_id}/audit", web::get().to(audit_wallet))
            .route("/topups", web::get().to(list_topups))
            .route("/topups/{id}/approve", web::post().to(approve_topup))
            .route("/topups/{id}/reject", web::post().to(reject_topup))
            .route("/discount-codes", web::post().to(create_custom_code))
            .route(
                "/discount-codes/{id}/deactivate",
                web::post().to(deactivate_code),
            )
            .route("/discount-codes/{id}", web::delete().to(delete_code)),
    );
}
