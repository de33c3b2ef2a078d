//! Service provider metadata context.
//!
//! The orchestrator does not produce the metadata XML document. It hands this
//! context to the renderer, which fills the `metadata.xml` template.

use serde::Serialize;

use crate::config::ServiceProviderConfig;
use crate::entity::EntityId;

/// The values needed to render this service provider's SAML metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataContext {
    /// This service provider's entity ID.
    pub entity_id: EntityId,
    /// Assertion Consumer Service URL (HTTP-POST binding).
    pub acs_url: String,
    /// Single Logout Service URL, if configured.
    pub slo_url: Option<String>,
    /// Signing certificate (PEM), if configured.
    pub certificate_pem: Option<String>,
    /// Reference to the private key matching the certificate.
    pub private_key_ref: Option<String>,
    /// Requested `NameID` format.
    pub name_id_format: String,
    /// Entity IDs of the trusted identity providers, in configured order.
    pub identity_providers: Vec<EntityId>,
}

impl From<&ServiceProviderConfig> for MetadataContext {
    fn from(config: &ServiceProviderConfig) -> Self {
        Self {
            entity_id: config.entity_id().clone(),
            acs_url: config.acs_url().to_string(),
            slo_url: config.slo_url().map(str::to_string),
            certificate_pem: config.certificate_pem().map(str::to_string),
            private_key_ref: config.private_key_ref().map(str::to_string),
            name_id_format: config.name_id_format().to_string(),
            identity_providers: config
                .identity_providers()
                .iter()
                .map(|idp| idp.entity_id().clone())
                .collect(),
        }
    }
}
