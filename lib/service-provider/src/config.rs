//! Service provider and identity provider configuration.
//!
//! Configuration is immutable once the orchestrator is built. It can be
//! constructed in code through the builders or loaded with the `config` crate
//! from an optional file overlaid by `SAMLKIT_*` environment variables.

use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::entity::EntityId;
use crate::error::ConfigurationError;

/// Default `NameID` format requested from identity providers.
pub const NAME_ID_FORMAT_UNSPECIFIED: &str =
    "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified";

/// Configuration for this service provider and the identity providers it trusts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProviderConfig {
    /// This service provider's entity ID.
    entity_id: EntityId,
    /// Assertion Consumer Service URL (where identity providers post responses).
    acs_url: String,
    /// Single Logout Service URL, if this service provider accepts logout requests.
    #[serde(default)]
    slo_url: Option<String>,
    /// Service provider certificate (PEM), published in metadata.
    #[serde(default)]
    certificate_pem: Option<String>,
    /// Reference to the service provider private key (a path or key-store name).
    #[serde(default)]
    private_key_ref: Option<String>,
    /// `NameID` format to request.
    /// Default: "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified"
    #[serde(default = "default_name_id_format")]
    name_id_format: String,
    /// Directory prefix for renderer templates.
    /// Default: "samlkit"
    #[serde(default = "default_view_path")]
    view_path: String,
    /// Trusted identity providers, in the order handlers are tried.
    #[serde(default)]
    identity_providers: Vec<IdentityProviderConfig>,
}

fn default_name_id_format() -> String {
    NAME_ID_FORMAT_UNSPECIFIED.to_string()
}

fn default_view_path() -> String {
    "samlkit".to_string()
}

impl ServiceProviderConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(
        entity_id: impl Into<EntityId>,
        acs_url: impl Into<String>,
    ) -> ServiceProviderConfigBuilder {
        ServiceProviderConfigBuilder::new(entity_id.into(), acs_url.into())
    }

    /// Loads configuration from an optional file overlaid by environment variables.
    ///
    /// Environment variables use the `SAMLKIT_` prefix and `__` as the nesting
    /// separator, e.g. `SAMLKIT_ACS_URL` or `SAMLKIT_VIEW_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read, required fields are
    /// missing, or the loaded configuration fails [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> Result<Self, Report<ConfigurationError>> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix("SAMLKIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigurationError::Load {
                details: e.to_string(),
            })?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Validates the service provider fields and every identity provider.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), Report<ConfigurationError>> {
        self.validate_service_provider()?;

        if self.identity_providers.is_empty() {
            return Err(ConfigurationError::NoIdentityProviders.into());
        }

        let mut seen = HashSet::new();
        for idp in &self.identity_providers {
            if !seen.insert(idp.entity_id()) {
                return Err(ConfigurationError::DuplicateEntityId {
                    entity_id: idp.entity_id().clone(),
                }
                .into());
            }
            idp.validate()?;
        }

        let defaults: Vec<EntityId> = self
            .identity_providers
            .iter()
            .filter(|idp| idp.is_default())
            .map(|idp| idp.entity_id().clone())
            .collect();
        if defaults.len() > 1 {
            return Err(ConfigurationError::MultipleDefaults {
                entity_ids: defaults,
            }
            .into());
        }

        Ok(())
    }

    /// Validates only the fields describing this service provider.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty entity ID or a non-absolute endpoint URL.
    pub fn validate_service_provider(&self) -> Result<(), Report<ConfigurationError>> {
        if self.entity_id.as_str().trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                field: "entity_id".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        parse_endpoint("acs_url", &self.acs_url)?;
        if let Some(slo_url) = &self.slo_url {
            parse_endpoint("slo_url", slo_url)?;
        }
        if self.view_path.trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                field: "view_path".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Returns this service provider's entity ID.
    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Returns the Assertion Consumer Service URL.
    #[must_use]
    pub fn acs_url(&self) -> &str {
        &self.acs_url
    }

    /// Returns the Single Logout Service URL, if configured.
    #[must_use]
    pub fn slo_url(&self) -> Option<&str> {
        self.slo_url.as_deref()
    }

    /// Returns the service provider certificate, if configured.
    #[must_use]
    pub fn certificate_pem(&self) -> Option<&str> {
        self.certificate_pem.as_deref()
    }

    /// Returns the private key reference, if configured.
    #[must_use]
    pub fn private_key_ref(&self) -> Option<&str> {
        self.private_key_ref.as_deref()
    }

    /// Returns the `NameID` format requested from identity providers.
    #[must_use]
    pub fn name_id_format(&self) -> &str {
        &self.name_id_format
    }

    /// Returns the renderer template directory prefix.
    #[must_use]
    pub fn view_path(&self) -> &str {
        &self.view_path
    }

    /// Returns the configured identity providers in trial order.
    #[must_use]
    pub fn identity_providers(&self) -> &[IdentityProviderConfig] {
        &self.identity_providers
    }
}

/// Builder for `ServiceProviderConfig`.
#[derive(Debug)]
pub struct ServiceProviderConfigBuilder {
    entity_id: EntityId,
    acs_url: String,
    slo_url: Option<String>,
    certificate_pem: Option<String>,
    private_key_ref: Option<String>,
    name_id_format: String,
    view_path: String,
    identity_providers: Vec<IdentityProviderConfig>,
}

impl ServiceProviderConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(entity_id: EntityId, acs_url: String) -> Self {
        Self {
            entity_id,
            acs_url,
            slo_url: None,
            certificate_pem: None,
            private_key_ref: None,
            name_id_format: default_name_id_format(),
            view_path: default_view_path(),
            identity_providers: Vec::new(),
        }
    }

    /// Sets the Single Logout Service URL.
    #[must_use]
    pub fn slo_url(mut self, url: impl Into<String>) -> Self {
        self.slo_url = Some(url.into());
        self
    }

    /// Sets the service provider certificate.
    #[must_use]
    pub fn certificate_pem(mut self, pem: impl Into<String>) -> Self {
        self.certificate_pem = Some(pem.into());
        self
    }

    /// Sets the private key reference.
    #[must_use]
    pub fn private_key_ref(mut self, reference: impl Into<String>) -> Self {
        self.private_key_ref = Some(reference.into());
        self
    }

    /// Sets the `NameID` format to request.
    #[must_use]
    pub fn name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_format = format.into();
        self
    }

    /// Sets the renderer template directory prefix.
    #[must_use]
    pub fn view_path(mut self, path: impl Into<String>) -> Self {
        self.view_path = path.into();
        self
    }

    /// Appends a trusted identity provider.
    #[must_use]
    pub fn identity_provider(mut self, idp: IdentityProviderConfig) -> Self {
        self.identity_providers.push(idp);
        self
    }

    /// Builds the `ServiceProviderConfig`.
    #[must_use]
    pub fn build(self) -> ServiceProviderConfig {
        ServiceProviderConfig {
            entity_id: self.entity_id,
            acs_url: self.acs_url,
            slo_url: self.slo_url,
            certificate_pem: self.certificate_pem,
            private_key_ref: self.private_key_ref,
            name_id_format: self.name_id_format,
            view_path: self.view_path,
            identity_providers: self.identity_providers,
        }
    }
}

/// Configuration for one trusted identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// The identity provider's entity ID (expected assertion issuer).
    entity_id: EntityId,
    /// Human-readable name shown on the chooser page.
    #[serde(default)]
    display_name: Option<String>,
    /// Single Sign-On endpoint (HTTP-Redirect binding).
    sso_url: String,
    /// Single Logout endpoint (HTTP-Redirect binding), if supported.
    #[serde(default)]
    slo_url: Option<String>,
    /// Identity provider signing certificate (PEM), handed to the response parser.
    #[serde(default)]
    certificate_pem: Option<String>,
    /// Use this identity provider without showing the chooser.
    #[serde(default, rename = "default")]
    is_default: bool,
    /// Attributes an assertion must carry for the user to be authorized.
    #[serde(default)]
    required_attributes: Vec<String>,
}

impl IdentityProviderConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(entity_id: impl Into<EntityId>, sso_url: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            display_name: None,
            sso_url: sso_url.into(),
            slo_url: None,
            certificate_pem: None,
            is_default: false,
            required_attributes: Vec::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the Single Logout endpoint.
    #[must_use]
    pub fn with_slo_url(mut self, url: impl Into<String>) -> Self {
        self.slo_url = Some(url.into());
        self
    }

    /// Sets the signing certificate.
    #[must_use]
    pub fn with_certificate_pem(mut self, pem: impl Into<String>) -> Self {
        self.certificate_pem = Some(pem.into());
        self
    }

    /// Marks this identity provider as the default.
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Adds an attribute the assertion must carry.
    #[must_use]
    pub fn require_attribute(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required_attributes.contains(&name) {
            self.required_attributes.push(name);
        }
        self
    }

    /// Validates the identity provider endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty entity ID or a non-absolute endpoint URL.
    pub fn validate(&self) -> Result<(), Report<ConfigurationError>> {
        if self.entity_id.as_str().trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                field: "identity_providers.entity_id".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        parse_endpoint("identity_providers.sso_url", &self.sso_url)?;
        if let Some(slo_url) = &self.slo_url {
            parse_endpoint("identity_providers.slo_url", slo_url)?;
        }
        Ok(())
    }

    /// Returns the identity provider's entity ID.
    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Returns the display name, falling back to the entity ID.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.entity_id.as_str())
    }

    /// Returns the Single Sign-On endpoint.
    #[must_use]
    pub fn sso_url(&self) -> &str {
        &self.sso_url
    }

    /// Returns the Single Logout endpoint, if configured.
    #[must_use]
    pub fn slo_url(&self) -> Option<&str> {
        self.slo_url.as_deref()
    }

    /// Returns the signing certificate, if configured.
    #[must_use]
    pub fn certificate_pem(&self) -> Option<&str> {
        self.certificate_pem.as_deref()
    }

    /// Returns true if this is the default identity provider.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Returns the attributes an assertion must carry.
    #[must_use]
    pub fn required_attributes(&self) -> &[String] {
        &self.required_attributes
    }
}

/// Parses an absolute `http`/`https` endpoint URL.
pub(crate) fn parse_endpoint(field: &str, value: &str) -> Result<Url, Report<ConfigurationError>> {
    let invalid = |reason: String| ConfigurationError::Invalid {
        field: field.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(format!("'{value}' is not a URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(invalid(format!("unsupported scheme '{scheme}'")).into()),
    }
}
