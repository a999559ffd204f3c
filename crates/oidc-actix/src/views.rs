use tera::{Context, Tera};

use oidc_core::{InteractionDetails, InteractionView, OidcError};

/// Interaction templates, compiled once at startup.
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("layout.html", include_str!("../templates/layout.html")),
            (
                InteractionView::Login.template(),
                include_str!("../templates/login.html"),
            ),
            (
                InteractionView::Consent.template(),
                include_str!("../templates/interaction.html"),
            ),
        ])?;
        Ok(Self { tera })
    }

    pub fn render(
        &self,
        view: InteractionView,
        details: &InteractionDetails,
    ) -> Result<String, OidcError> {
        let mut context = Context::new();
        context.insert("details", details);
        context.insert("uid", &details.uid);
        context.insert("client_id", details.client_id().unwrap_or_default());
        context.insert("scope", details.scope());
        context.insert(
            "title",
            match view {
                InteractionView::Login => "Sign-in",
                InteractionView::Consent => "Authorize",
            },
        );

        self.tera.render(view.template(), &context).map_err(|e| {
            tracing::error!(error = ?e, template = view.template(), "template render failed");
            OidcError::server_error("failed to render interaction view")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oidc_core::{InteractionPrompt, InteractionReason};
    use serde_json::json;

    fn details(reason: InteractionReason) -> InteractionDetails {
        InteractionDetails {
            uid: "uid-1".into(),
            return_to: "http://localoidc/auth/uid-1".into(),
            interaction: InteractionPrompt::new(reason),
            params: json!({ "client_id": "foo", "scope": "openid email" })
                .as_object()
                .cloned()
                .unwrap(),
            session: None,
            result: None,
            exp: 0,
        }
    }

    #[test]
    fn login_view_posts_to_login_action() {
        let views = Views::new().unwrap();
        let html = views
            .render(InteractionView::Login, &details(InteractionReason::NoSession))
            .unwrap();
        assert!(html.contains("action=\"/interaction/uid-1/login\""));
        assert!(html.contains("name=\"password\""));
        assert!(html.contains("no_session"));
    }

    #[test]
    fn consent_view_lists_client_and_scope() {
        let views = Views::new().unwrap();
        let html = views
            .render(
                InteractionView::Consent,
                &details(InteractionReason::ConsentPrompt),
            )
            .unwrap();
        assert!(html.contains("action=\"/interaction/uid-1/confirm\""));
        assert!(html.contains("foo"));
        assert!(html.contains("email"));
    }

    #[test]
    fn values_are_escaped() {
        let views = Views::new().unwrap();
        let mut details = details(InteractionReason::ConsentPrompt);
        details
            .params
            .insert("client_id".into(), json!("<script>alert(1)</script>"));
        let html = views.render(InteractionView::Consent, &details).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
    }
}
