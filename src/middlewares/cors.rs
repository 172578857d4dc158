use actix_cors::Cors;

/// 前端与后台都用 Bearer 令牌，不依赖 Cookie，因此不开启凭据
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
