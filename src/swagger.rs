use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    openapi::server::Server,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    CodeType, PaymentTargetKind, TopupMethod, TopupStatus, TransactionType, WalletSource,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

/// 支付回调挂在 /api/v1 之外
struct WebhookServerAddon;

impl Modify for WebhookServerAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        for (path, item) in openapi.paths.paths.iter_mut() {
            if path.starts_with("/webhook/") {
                item.servers = Some(vec![Server::new("/")]);
            }
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::wallet::get_wallet,
        handlers::wallet::create_topup,
        handlers::wallet::list_topups,
        handlers::wallet::test_charge,
        handlers::rewards::get_personal_stats,
        handlers::rewards::verify_code,
        handlers::order::create_payment_reference,
        handlers::admin::record_redemption,
        handlers::admin::provision_user,
        handlers::admin::get_user_wallet,
        handlers::admin::adjust_wallet,
        handlers::admin::audit_wallet,
        handlers::admin::list_topups,
        handlers::admin::approve_topup,
        handlers::admin::reject_topup,
        handlers::admin::create_custom_code,
        handlers::admin::deactivate_code,
        handlers::admin::delete_code,
        handlers::webhook::payment_webhook,
    ),
    components(
        schemas(
            CodeType,
            TopupMethod,
            TopupStatus,
            TransactionType,
            WalletSource,
            PaymentTargetKind,
            WalletTransactionResponse,
            WalletResponse,
            AdminAdjustRequest,
            TestChargeRequest,
            BalanceResponse,
            LedgerAuditResponse,
            DiscountCodeResponse,
            VerifyCodeRequest,
            VerifyCodeResponse,
            PersonalCodeStatsResponse,
            RecordRedemptionRequest,
            RedemptionResponse,
            CreateCustomCodeRequest,
            CreateTopupRequest,
            TopupRequestResponse,
            TopupReviewResponse,
            PaymentWebhookPayload,
            PaymentReferenceResponse,
            ProvisionResponse,
            PaginatedWalletTransactions,
            PaginatedTopupRequests,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon, &WebhookServerAddon),
    tags(
        (name = "wallet", description = "Wallet and top-up API"),
        (name = "rewards", description = "Personal code and reward API"),
        (name = "order", description = "Order payment API"),
        (name = "admin", description = "Administration API"),
        (name = "webhook", description = "Payment provider callbacks"),
    ),
    info(
        title = "Storefront Backend API",
        version = "1.0.0",
        description = "Reward codes and wallet ledger REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
