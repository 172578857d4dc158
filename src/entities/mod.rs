pub mod discount_codes;
pub mod orders;
pub mod payment_references;
pub mod reward_redemptions;
pub mod wallet_topup_requests;
pub mod wallet_transactions;
pub mod wallets;

pub use discount_codes as discount_code_entity;
pub use orders as order_entity;
pub use payment_references as payment_reference_entity;
pub use reward_redemptions as reward_redemption_entity;
pub use wallet_topup_requests as topup_request_entity;
pub use wallet_transactions as wallet_transaction_entity;
pub use wallets as wallet_entity;

pub use discount_codes::CodeType;
pub use orders::OrderStatus;
pub use payment_references::PaymentTargetKind;
pub use wallet_topup_requests::{TopupMethod, TopupStatus};
pub use wallet_transactions::{TransactionType, WalletSource};
