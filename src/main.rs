use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use storefront_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret);

    // 创建服务
    let wallet_service = WalletService::new(pool.clone());
    let discount_code_service = DiscountCodeService::new(pool.clone());
    let reward_service = RewardService::new(pool.clone(), config.rewards.clone());
    let topup_service = TopupService::new(pool.clone(), config.payments.clone());
    let payment_service = PaymentService::new(pool.clone(), config.rewards.clone());
    let account_service = AccountService::new(pool.clone());
    let payment_config = config.payments.clone();

    if payment_config.webhook_token.is_none() {
        log::warn!("Payment webhook token is not configured; callbacks are not authenticated");
    }
    if payment_config.allow_test_charge {
        log::warn!("Test charges are enabled");
    }

    // 启动后台任务
    tasks::spawn_all(discount_code_service.clone(), &config.rewards);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(payment_config.clone()))
            .app_data(web::Data::new(wallet_service.clone()))
            .app_data(web::Data::new(discount_code_service.clone()))
            .app_data(web::Data::new(reward_service.clone()))
            .app_data(web::Data::new(topup_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(account_service.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::wallet_config)
                    .configure(handlers::rewards_config)
                    .configure(handlers::order_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
