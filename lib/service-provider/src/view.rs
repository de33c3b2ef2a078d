//! Views handed to an external template renderer.
//!
//! The orchestrator never produces HTML or XML. Endpoint adapters turn its
//! outcomes into a [`Presentation`]: either a redirect or a [`View`], a named
//! template plus a JSON context, which a [`Renderer`] turns into a body.

use rootcause::prelude::Report;
use serde::Serialize;
use serde_json::{Value, json};

use crate::entity::{EntityId, RelayState};
use crate::error::RenderError;
use crate::handler::IdentityProviderHandler;
use crate::metadata::MetadataContext;
use crate::orchestrator::LoginSelection;
use crate::outcome::{HandlerRejection, LoginResult};

/// One entry of the identity provider chooser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdpChoice {
    /// The identity provider's entity ID, sent back as the login selection.
    pub entity_id: EntityId,
    /// The name shown to the user.
    pub display_name: String,
}

impl IdpChoice {
    /// Describes a handler for the chooser.
    #[must_use]
    pub fn from_handler(handler: &dyn IdentityProviderHandler) -> Self {
        Self {
            entity_id: handler.entity_id().clone(),
            display_name: handler.display_name().to_string(),
        }
    }
}

/// A page or document for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Ask the user which identity provider to log in with.
    ChooseIdp {
        /// Where to go after login.
        login_next: Option<RelayState>,
        /// The configured identity providers, in configured order.
        identity_providers: Vec<IdpChoice>,
    },
    /// The identity provider authenticated the user but login is refused.
    UserNotAuthorized {
        /// The identity provider that refused the user.
        entity_id: EntityId,
        /// Why the user was refused.
        reason: String,
    },
    /// No identity provider could interpret the response.
    LoginFailed {
        /// Every handler's rejection reason, in configured order.
        errors: Vec<HandlerRejection>,
    },
    /// This service provider's SAML metadata.
    Metadata(MetadataContext),
    /// The user has been logged out.
    LoggedOut,
}

impl View {
    /// Returns the template name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChooseIdp { .. } => "choose_idp.html",
            Self::UserNotAuthorized { .. } => "user_not_authorized.html",
            Self::LoginFailed { .. } => "login_failed.html",
            Self::Metadata(_) => "metadata.xml",
            Self::LoggedOut => "logged_out.html",
        }
    }

    /// Returns the template path below `view_path`.
    #[must_use]
    pub fn template_path(&self, view_path: &str) -> String {
        let view_path = view_path.trim_end_matches('/');
        if view_path.is_empty() {
            self.name().to_string()
        } else {
            format!("{view_path}/{}", self.name())
        }
    }

    /// Returns the HTTP status the page should be served with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UserNotAuthorized { .. } => 401,
            Self::LoginFailed { .. } => 422,
            _ => 200,
        }
    }

    /// Returns the HTTP `Content-Type` of the rendered body.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Metadata(_) => "application/xml",
            _ => "text/html; charset=utf-8",
        }
    }

    /// Returns the template context.
    #[must_use]
    pub fn context(&self) -> Value {
        match self {
            Self::ChooseIdp {
                login_next,
                identity_providers,
            } => json!({
                "login_next": login_next,
                "identity_providers": identity_providers,
            }),
            Self::UserNotAuthorized { entity_id, reason } => json!({
                "entity_id": entity_id,
                "reason": reason,
            }),
            Self::LoginFailed { errors } => json!({ "errors": errors }),
            Self::Metadata(metadata) => json!({ "metadata": metadata }),
            Self::LoggedOut => json!({}),
        }
    }
}

/// What an endpoint adapter should send to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Redirect the browser to this location.
    Redirect(String),
    /// Render this view.
    Render(View),
}

impl LoginResult {
    /// Maps a login result to its presentation.
    ///
    /// A successful login redirects to the relay state when it is a local
    /// path, and to `fallback` otherwise.
    #[must_use]
    pub fn presentation(&self, fallback: &str) -> Presentation {
        match self {
            Self::LoggedIn { relay_state, .. } => Presentation::Redirect(
                relay_state
                    .as_ref()
                    .filter(|relay_state| relay_state.is_local_path())
                    .map_or(fallback, RelayState::as_str)
                    .to_string(),
            ),
            Self::Unauthorized {
                entity_id, reason, ..
            } => Presentation::Render(View::UserNotAuthorized {
                entity_id: entity_id.clone(),
                reason: reason.clone(),
            }),
            Self::NoHandlerApplicable { errors } => Presentation::Render(View::LoginFailed {
                errors: errors.clone(),
            }),
        }
    }
}

impl LoginSelection {
    /// Returns the chooser view, or `None` if a handler was selected directly.
    #[must_use]
    pub fn view(&self, login_next: Option<&RelayState>) -> Option<View> {
        match self {
            Self::Handler(_) => None,
            Self::NeedsChoice(handlers) => Some(View::ChooseIdp {
                login_next: login_next.cloned(),
                identity_providers: handlers
                    .iter()
                    .map(|handler| IdpChoice::from_handler(handler.as_ref()))
                    .collect(),
            }),
        }
    }
}

/// Renders named templates.
pub trait Renderer {
    /// Renders `template` with `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing or fails to render.
    fn render(&self, template: &str, context: &Value) -> Result<String, Report<RenderError>>;

    /// Renders a view from the templates below `view_path`.
    ///
    /// # Errors
    ///
    /// As for [`render`](Self::render).
    fn render_view(&self, view_path: &str, view: &View) -> Result<String, Report<RenderError>> {
        self.render(&view.template_path(view_path), &view.context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceProviderConfig;
    use crate::identity::Identity;
    use crate::testing::StubHandler;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Substitutes `{key}` with top-level string context values.
    struct MapRenderer {
        templates: HashMap<&'static str, &'static str>,
    }

    impl Renderer for MapRenderer {
        fn render(&self, template: &str, context: &Value) -> Result<String, Report<RenderError>> {
            let body = self
                .templates
                .get(template)
                .ok_or_else(|| RenderError::TemplateNotFound {
                    template: template.to_string(),
                })?;
            let mut rendered = (*body).to_string();
            if let Some(fields) = context.as_object() {
                for (key, value) in fields {
                    if let Some(value) = value.as_str() {
                        rendered = rendered.replace(&format!("{{{key}}}"), value);
                    }
                }
            }
            Ok(rendered)
        }
    }

    #[test]
    fn template_names_are_stable() {
        assert_eq!(View::LoggedOut.name(), "logged_out.html");
        assert_eq!(
            View::LoginFailed { errors: vec![] }.name(),
            "login_failed.html"
        );
        assert_eq!(View::LoggedOut.template_path("samlkit/"), "samlkit/logged_out.html");
        assert_eq!(View::LoggedOut.template_path(""), "logged_out.html");
    }

    #[test]
    fn logged_in_redirects_to_local_relay_state() {
        let result = LoginResult::LoggedIn {
            identity: Identity::new("alice"),
            relay_state: Some(RelayState::from("/reports")),
        };
        assert_eq!(
            result.presentation("/"),
            Presentation::Redirect("/reports".to_string())
        );
    }

    #[test]
    fn logged_in_ignores_external_relay_state() {
        let result = LoginResult::LoggedIn {
            identity: Identity::new("alice"),
            relay_state: Some(RelayState::from("https://evil.example.com/")),
        };
        assert_eq!(
            result.presentation("/home"),
            Presentation::Redirect("/home".to_string())
        );
    }

    #[test]
    fn unauthorized_renders_not_authorized_page() {
        let result = LoginResult::Unauthorized {
            entity_id: EntityId::from("idp-a"),
            reason: "not in group".to_string(),
            relay_state: None,
        };

        let Presentation::Render(view) = result.presentation("/") else {
            panic!("expected a rendered view");
        };
        assert_eq!(view.name(), "user_not_authorized.html");
        assert_eq!(view.status_code(), 401);
        assert_eq!(view.context()["reason"], "not in group");
    }

    #[test]
    fn login_failed_context_lists_every_rejection() {
        let result = LoginResult::NoHandlerApplicable {
            errors: vec![
                HandlerRejection::new(EntityId::from("idp-a"), "wrong issuer"),
                HandlerRejection::new(EntityId::from("idp-b"), "bad signature"),
            ],
        };

        let Presentation::Render(view) = result.presentation("/") else {
            panic!("expected a rendered view");
        };
        let context = view.context();
        assert_eq!(view.status_code(), 422);
        assert_eq!(context["errors"][0]["entity_id"], "idp-a");
        assert_eq!(context["errors"][1]["reason"], "bad signature");
    }

    #[test]
    fn chooser_lists_handlers_with_login_next() {
        let a: Arc<dyn IdentityProviderHandler> = Arc::new(StubHandler::new("idp-a"));
        let b: Arc<dyn IdentityProviderHandler> = Arc::new(StubHandler::new("idp-b"));
        let selection = LoginSelection::NeedsChoice(vec![a, b]);

        let view = selection
            .view(Some(&RelayState::from("/next")))
            .expect("chooser");

        let context = view.context();
        assert_eq!(view.name(), "choose_idp.html");
        assert_eq!(context["login_next"], "/next");
        assert_eq!(context["identity_providers"][1]["entity_id"], "idp-b");
        assert_eq!(context["identity_providers"][1]["display_name"], "idp-b");
    }

    #[test]
    fn direct_selection_has_no_view() {
        let a: Arc<dyn IdentityProviderHandler> = Arc::new(StubHandler::new("idp-a"));
        assert!(LoginSelection::Handler(a).view(None).is_none());
    }

    #[test]
    fn metadata_is_served_as_xml() {
        let config = ServiceProviderConfig::builder(
            "https://sp.example.com",
            "https://sp.example.com/saml/acs",
        )
        .build();
        let view = View::Metadata(MetadataContext::from(&config));

        assert_eq!(view.content_type(), "application/xml");
        assert_eq!(
            view.context()["metadata"]["acs_url"],
            "https://sp.example.com/saml/acs"
        );
    }

    #[test]
    fn render_view_resolves_template_below_view_path() {
        let renderer = MapRenderer {
            templates: HashMap::from([(
                "samlkit/user_not_authorized.html",
                "<p>{entity_id}: {reason}</p>",
            )]),
        };
        let view = View::UserNotAuthorized {
            entity_id: EntityId::from("idp-a"),
            reason: "not in group".to_string(),
        };

        let body = renderer.render_view("samlkit", &view).expect("render");
        assert_eq!(body, "<p>idp-a: not in group</p>");
    }

    #[test]
    fn missing_template_is_a_render_error() {
        let renderer = MapRenderer {
            templates: HashMap::new(),
        };

        let err = renderer
            .render_view("samlkit", &View::LoggedOut)
            .expect_err("no template");
        assert!(err.to_string().contains("samlkit/logged_out.html"));
    }
}
