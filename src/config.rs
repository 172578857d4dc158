use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub payments: PaymentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    #[serde(default = "default_code_ttl_days")]
    pub code_ttl_days: i64,
    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// 若配置，则 webhook 请求必须携带相同的 X-Webhook-Token
    #[serde(default)]
    pub webhook_token: Option<String>,
    #[serde(default)]
    pub allow_test_charge: bool,
    #[serde(default = "default_min_topup")]
    pub min_topup_amount: i64,
    #[serde(default = "default_max_topup")]
    pub max_topup_amount: i64,
}

fn default_window_hours() -> i64 {
    24
}

fn default_code_ttl_days() -> i64 {
    40
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_min_topup() -> i64 {
    100
}

fn default_max_topup() -> i64 {
    10_000_000
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            code_ttl_days: default_code_ttl_days(),
            expiry_sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            webhook_token: None,
            allow_test_charge: false,
            min_topup_amount: default_min_topup(),
            max_topup_amount: default_max_topup(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::from_toml_str(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 数据库 URL 在无配置文件时必须提供
                let database_url = env::var("DATABASE_URL")
                    .map_err(|_| "DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: "0.0.0.0".to_string(),
                        port: 8080,
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: 10,
                    },
                    jwt: JwtConfig {
                        secret: "change-me-in-production".to_string(),
                    },
                    rewards: RewardConfig::default(),
                    payments: PaymentConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(s).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.parse::<T>().ok())
        }

        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = parsed("SERVER_PORT") {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = parsed("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(n) = parsed("REWARD_WINDOW_HOURS") {
            self.rewards.window_hours = n;
        }
        if let Some(n) = parsed("REWARD_CODE_TTL_DAYS") {
            self.rewards.code_ttl_days = n;
        }
        if let Some(n) = parsed("REWARD_EXPIRY_SWEEP_INTERVAL_SECS") {
            self.rewards.expiry_sweep_interval_secs = n;
        }
        if let Ok(v) = env::var("PAYMENT_WEBHOOK_TOKEN") {
            self.payments.webhook_token = Some(v);
        }
        if let Some(b) = parsed("PAYMENT_ALLOW_TEST_CHARGE") {
            self.payments.allow_test_charge = b;
        }
        if let Some(n) = parsed("PAYMENT_MIN_TOPUP_AMOUNT") {
            self.payments.min_topup_amount = n;
        }
        if let Some(n) = parsed("PAYMENT_MAX_TOPUP_AMOUNT") {
            self.payments.max_topup_amount = n;
        }
    }
}
