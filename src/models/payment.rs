use crate::entities::{PaymentTargetKind, payment_reference_entity};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 支付方回调；字段名因支付方而异，常见别名一并接受
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentWebhookPayload {
    #[serde(alias = "order_id")]
    pub identifier: String,
    #[serde(alias = "payment_status")]
    pub status: String,
}

/// 关联号指向的业务对象
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    WalletTopup(i64),
    Order(i64),
}

impl PaymentTarget {
    pub fn kind(self) -> PaymentTargetKind {
        match self {
            PaymentTarget::WalletTopup(_) => PaymentTargetKind::WalletTopup,
            PaymentTarget::Order(_) => PaymentTargetKind::Order,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            PaymentTarget::WalletTopup(id) | PaymentTarget::Order(id) => id,
        }
    }
}

impl From<&payment_reference_entity::Model> for PaymentTarget {
    fn from(m: &payment_reference_entity::Model) -> Self {
        match m.target_kind {
            PaymentTargetKind::WalletTopup => PaymentTarget::WalletTopup(m.target_id),
            PaymentTargetKind::Order => PaymentTarget::Order(m.target_id),
        }
    }
}

/// 支付方上报的状态，只有完成态会触发入账
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Finished,
    Other,
}

impl ProviderStatus {
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "finished" | "confirmed" => ProviderStatus::Finished,
            _ => ProviderStatus::Other,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentReferenceResponse {
    pub identifier: String,
    pub target_kind: PaymentTargetKind,
    pub target_id: i64,
}

impl From<payment_reference_entity::Model> for PaymentReferenceResponse {
    fn from(m: payment_reference_entity::Model) -> Self {
        Self {
            identifier: m.identifier,
            target_kind: m.target_kind,
            target_id: m.target_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_status() {
        assert_eq!(ProviderStatus::parse("finished"), ProviderStatus::Finished);
        assert_eq!(ProviderStatus::parse(" Confirmed "), ProviderStatus::Finished);
        assert_eq!(ProviderStatus::parse("waiting"), ProviderStatus::Other);
        assert_eq!(ProviderStatus::parse("partially_paid"), ProviderStatus::Other);
    }

    #[test]
    fn test_payload_aliases() {
        let payload: PaymentWebhookPayload =
            serde_json::from_str(r#"{"order_id":"abc","payment_status":"finished"}"#).unwrap();
        assert_eq!(payload.identifier, "abc");
        assert_eq!(payload.status, "finished");
    }
}
