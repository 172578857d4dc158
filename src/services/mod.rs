pub mod account_service;
pub mod discount_code_service;
pub mod payment_service;
pub mod reward_service;
pub mod topup_service;
pub mod wallet_service;

pub use account_service::*;
pub use discount_code_service::*;
pub use payment_service::*;
pub use reward_service::*;
pub use topup_service::*;
pub use wallet_service::*;
