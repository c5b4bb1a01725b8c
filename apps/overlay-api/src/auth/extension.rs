//! Extension JWT and Bits receipt verification.
//!
//! Both token kinds are HS256-signed with the extension secret, which the
//! platform hands out base64-encoded.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use overlay_common::{ChannelId, ViewerId};
use serde::{Deserialize, Serialize};

use crate::adapters::TokenVerifier;
use crate::error::ApiError;

/// Topic carried by every Bits transaction receipt.
pub const RECEIPT_TOPIC: &str = "bits_transaction_receipt";

/// Claims of the JWT the extension frontend sends with each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionClaims {
    pub exp: i64,
    pub channel_id: String,
    /// Present only once the viewer has shared their identity.
    #[serde(default)]
    pub user_id: Option<String>,
    pub opaque_user_id: String,
    pub role: String,
}

impl ExtensionClaims {
    pub fn channel(&self) -> ChannelId {
        ChannelId::new(self.channel_id.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptClaims {
    pub topic: String,
    pub exp: i64,
    pub data: ReceiptData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
    pub transaction_id: String,
    pub user_id: String,
    #[serde(default)]
    pub time: Option<String>,
    pub product: ReceiptProduct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptProduct {
    pub sku: String,
    #[serde(default)]
    pub domain_id: Option<String>,
}

impl ReceiptClaims {
    pub fn buyer(&self) -> ViewerId {
        ViewerId::new(self.data.user_id.clone())
    }
}

/// [`TokenVerifier`] backed by the shared extension secret.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Build from the secret as configured (`CLIENT_SECRET`).
    pub fn from_base64_secret(secret: &str) -> Result<Self, base64::DecodeError> {
        Ok(Self::new(&STANDARD.decode(secret.trim())?))
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify_extension(&self, token: &str) -> Result<ExtensionClaims, ApiError> {
        let data = jsonwebtoken::decode::<ExtensionClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(?e, "extension token rejected");
                ApiError::invalid_token("Invalid or expired extension token")
            })?;
        Ok(data.claims)
    }

    fn verify_receipt(&self, token: &str) -> Result<ReceiptClaims, ApiError> {
        let claims = jsonwebtoken::decode::<ReceiptClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(?e, "receipt rejected");
                ApiError::invalid_receipt("Invalid or expired receipt")
            })?
            .claims;

        if claims.topic != RECEIPT_TOPIC {
            return Err(ApiError::invalid_receipt("Receipt has an unexpected topic"));
        }
        Ok(claims)
    }
}
