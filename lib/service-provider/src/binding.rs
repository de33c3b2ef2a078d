//! SAML HTTP-Redirect and HTTP-POST binding helpers.
//!
//! Outbound requests are built as XML, raw-DEFLATE compressed, base64 encoded
//! and placed in the `SAMLRequest` query parameter of the identity provider
//! endpoint. The decode helpers are the inverse, for use by
//! [`ResponseParser`](crate::parser::ResponseParser) implementations.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use flate2::{Compression, read::DeflateDecoder, write::DeflateEncoder};
use quick_xml::escape::escape;
use rootcause::prelude::Report;
use samlkit_core::{AuthnRequestId, LogoutRequestId};
use std::io::{Read, Write};
use url::Url;

use crate::entity::RelayState;
use crate::error::HandlerError;
use crate::parser::ParseFailure;

/// Upper bound on an inflated redirect-binding message.
const MAX_INFLATED_LEN: u64 = 1024 * 1024;

/// An `AuthnRequest` addressed to an identity provider's SSO endpoint.
#[derive(Debug, Clone)]
pub struct AuthnRequest<'a> {
    pub id: AuthnRequestId,
    pub issue_instant: DateTime<Utc>,
    pub destination: &'a str,
    pub acs_url: &'a str,
    pub issuer: &'a str,
    pub name_id_format: &'a str,
}

impl AuthnRequest<'_> {
    /// Renders the request document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        format!(
            r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="{instant}" Destination="{destination}" ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" AssertionConsumerServiceURL="{acs}"><saml:Issuer>{issuer}</saml:Issuer><samlp:NameIDPolicy Format="{format}" AllowCreate="true"/></samlp:AuthnRequest>"#,
            id = self.id,
            instant = format_instant(self.issue_instant),
            destination = escape(self.destination),
            acs = escape(self.acs_url),
            issuer = escape(self.issuer),
            format = escape(self.name_id_format),
        )
    }
}

/// A `LogoutRequest` addressed to an identity provider's SLO endpoint.
#[derive(Debug, Clone)]
pub struct LogoutRequest<'a> {
    pub id: LogoutRequestId,
    pub issue_instant: DateTime<Utc>,
    pub destination: &'a str,
    pub issuer: &'a str,
    pub name_id: &'a str,
    pub name_id_format: Option<&'a str>,
    pub session_index: Option<&'a str>,
}

impl LogoutRequest<'_> {
    /// Renders the request document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let format_attr = self
            .name_id_format
            .map(|format| format!(r#" Format="{}""#, escape(format)))
            .unwrap_or_default();
        let session_index = self
            .session_index
            .map(|index| {
                format!(
                    "<samlp:SessionIndex>{}</samlp:SessionIndex>",
                    escape(index)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{id}" Version="2.0" IssueInstant="{instant}" Destination="{destination}"><saml:Issuer>{issuer}</saml:Issuer><saml:NameID{format_attr}>{name_id}</saml:NameID>{session_index}</samlp:LogoutRequest>"#,
            id = self.id,
            instant = format_instant(self.issue_instant),
            destination = escape(self.destination),
            issuer = escape(self.issuer),
            name_id = escape(self.name_id),
        )
    }
}

/// Deflate and base64 encode for the SAML redirect binding.
///
/// # Errors
///
/// Returns `HandlerError::Encoding` if compression fails.
pub fn deflate_and_encode(xml: &str) -> Result<String, Report<HandlerError>> {
    let encoding_error = |e: std::io::Error| HandlerError::Encoding {
        details: e.to_string(),
    };

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).map_err(encoding_error)?;
    let compressed = encoder.finish().map_err(encoding_error)?;
    Ok(BASE64.encode(compressed))
}

/// Appends `SAMLRequest` and, when given, `RelayState` to an endpoint.
///
/// An empty relay state is still sent so it comes back unchanged.
///
/// Query parameters already present on the endpoint are preserved.
#[must_use]
pub fn redirect_url(endpoint: &Url, saml_request: &str, relay_state: Option<&RelayState>) -> Url {
    let mut url = endpoint.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("SAMLRequest", saml_request);
        if let Some(relay_state) = relay_state {
            pairs.append_pair("RelayState", relay_state.as_str());
        }
    }
    url
}

/// Decodes a redirect-binding message (base64, then raw INFLATE).
///
/// # Errors
///
/// Returns `ParseFailure::Malformed` for invalid base64, invalid DEFLATE data,
/// non-UTF-8 content or output larger than 1 MiB.
pub fn decode_redirect_message(encoded: &str) -> Result<String, ParseFailure> {
    let compressed = decode_base64(encoded)?;

    let mut inflated = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .take(MAX_INFLATED_LEN + 1)
        .read_to_end(&mut inflated)
        .map_err(|e| ParseFailure::malformed(format!("invalid DEFLATE data: {e}")))?;
    if inflated.len() as u64 > MAX_INFLATED_LEN {
        return Err(ParseFailure::malformed("inflated message exceeds 1 MiB"));
    }

    String::from_utf8(inflated)
        .map_err(|e| ParseFailure::malformed(format!("message is not UTF-8: {e}")))
}

/// Decodes a POST-binding message (base64 only).
///
/// # Errors
///
/// Returns `ParseFailure::Malformed` for invalid base64 or non-UTF-8 content.
pub fn decode_post_message(encoded: &str) -> Result<String, ParseFailure> {
    let bytes = decode_base64(encoded)?;
    String::from_utf8(bytes)
        .map_err(|e| ParseFailure::malformed(format!("message is not UTF-8: {e}")))
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, ParseFailure> {
    // Identity providers commonly line-wrap POSTed base64.
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    BASE64
        .decode(compact)
        .map_err(|e| ParseFailure::malformed(format!("invalid base64: {e}")))
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
