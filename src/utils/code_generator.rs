use crate::entities::{CodeType, discount_code_entity as discount_codes};
use crate::error::{AppError, AppResult};
use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_ATTEMPTS: usize = 16;

/// 生成随机字母数字串（去掉了易混淆的 0/O/1/I）
pub fn generate_random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// 各类型优惠码的前缀
pub fn code_prefix(code_type: CodeType) -> &'static str {
    match code_type {
        CodeType::Personal => "P",
        CodeType::Reward70 => "R70",
        CodeType::FreeAccount => "FREE",
        CodeType::Custom => "C",
    }
}

/// 生成数据库中不存在的优惠码
pub async fn generate_unique_discount_code<C: ConnectionTrait>(
    conn: &C,
    code_type: CodeType,
) -> AppResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let code = format!("{}-{}", code_prefix(code_type), generate_random_code(8));

        let exists = discount_codes::Entity::find()
            .filter(discount_codes::Column::Code.eq(code.as_str()))
            .count(conn)
            .await?;

        if exists == 0 {
            return Ok(code);
        }
    }

    Err(AppError::InternalError(
        "Could not generate a unique discount code".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validate_code;

    #[test]
    fn test_random_code_charset() {
        let code = generate_random_code(8);
        assert_eq!(code.len(), 8);
        assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
    }

    #[test]
    fn test_generated_codes_pass_validation() {
        for code_type in [
            CodeType::Personal,
            CodeType::Reward70,
            CodeType::FreeAccount,
            CodeType::Custom,
        ] {
            let code = format!("{}-{}", code_prefix(code_type), generate_random_code(8));
            assert_eq!(validate_code(&code).unwrap(), code);
        }
    }

    #[tokio::test]
    async fn test_generate_unique_discount_code() {
        let pool = crate::database::test_pool().await;
        let code = generate_unique_discount_code(&pool, CodeType::Reward70)
            .await
            .unwrap();
        assert!(code.starts_with("R70-"));
    }
}
