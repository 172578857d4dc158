use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9-]{2,30}[A-Z0-9]$").expect("valid code regex"));

/// 统一优惠码大小写：去掉首尾空白并转为大写
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// 规范化并校验优惠码格式 (4-32 位大写字母、数字或中划线)
pub fn validate_code(code: &str) -> AppResult<String> {
    let normalized = normalize_code(code);

    if !CODE_REGEX.is_match(&normalized) {
        return Err(AppError::ValidationError(
            "Discount code must be 4-32 characters of A-Z, 0-9 or '-'".to_string(),
        ));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab12cd "), "AB12CD");
        assert_eq!(normalize_code("R70-xyz9"), "R70-XYZ9");
    }

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code("summer-25").unwrap(), "SUMMER-25");
        assert!(validate_code("abc").is_err());
        assert!(validate_code("-ABCD").is_err());
        assert!(validate_code("ABCD-").is_err());
        assert!(validate_code("AB CD").is_err());
        assert!(validate_code(&"A".repeat(33)).is_err());
    }
}
