pub mod account;
pub mod common;
pub mod discount_code;
pub mod pagination;
pub mod payment;
pub mod topup;
pub mod wallet;

pub use account::*;
pub use common::*;
pub use discount_code::*;
pub use pagination::*;
pub use payment::*;
pub use topup::*;
pub use wallet::*;
