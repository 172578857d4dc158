pub mod code_generator;
pub mod discount_code;
pub mod jwt;
pub mod token;

pub use code_generator::*;
pub use discount_code::*;
pub use jwt::*;
pub use token::*;
