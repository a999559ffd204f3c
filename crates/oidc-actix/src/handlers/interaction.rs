use actix::Addr;
use actix_session::Session;
use actix_web::{http::header, web, HttpResponse, Result};
use serde::Deserialize;

use oidc_core::{epoch_seconds, InteractionResult, LoginResult, OidcError};
use oidc_observability::Metrics;

use crate::actors::{Authenticate, FinishInteraction, GetInteractionDetails, InteractionActor};
use crate::session::{bind_interaction, release_interaction, require_interaction};
use crate::Views;

fn mailbox_error(e: actix::MailboxError) -> OidcError {
    OidcError::server_error(&e.to_string())
}

fn no_store(mut resp: HttpResponse) -> HttpResponse {
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    resp
}

fn redirect(location: &str) -> Result<HttpResponse, OidcError> {
    let location = header::HeaderValue::from_str(location)
        .map_err(|_| OidcError::server_error("invalid returnTo location"))?;
    Ok(no_store(
        HttpResponse::Found()
            .insert_header((header::LOCATION, location))
            .finish(),
    ))
}

/// Render the login or consent page for an interaction.
pub async fn show(
    uid: web::Path<String>,
    session: Session,
    interaction_actor: web::Data<Addr<InteractionActor>>,
    views: web::Data<Views>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, OidcError> {
    let details = interaction_actor
        .send(GetInteractionDetails {
            uid: uid.into_inner(),
            span: tracing::Span::current(),
        })
        .await
        .map_err(mailbox_error)??;

    let view = details.interaction.reason.view();
    tracing::debug!(
        uid = %details.uid,
        reason = %details.interaction.reason.as_str(),
        view = view.as_str(),
        "rendering interaction"
    );

    let body = views.render(view, &details)?;
    bind_interaction(&session, &details.uid)?;

    metrics
        .interaction_views_total
        .with_label_values(&[view.as_str()])
        .inc();

    Ok(no_store(
        HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
    ))
}

/// Complete a consent interaction.
pub async fn confirm(
    uid: web::Path<String>,
    session: Session,
    interaction_actor: web::Data<Addr<InteractionActor>>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, OidcError> {
    let uid = uid.into_inner();
    require_interaction(&session, &uid)?;

    let return_to = interaction_actor
        .send(FinishInteraction {
            uid,
            result: InteractionResult::consent(),
            span: tracing::Span::current(),
        })
        .await
        .map_err(mailbox_error)??;

    release_interaction(&session);
    metrics.interaction_consents_total.inc();
    redirect(&return_to)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub remember: Option<String>,
}

impl LoginForm {
    /// An unchecked checkbox is absent from the form; any non-empty value counts as checked.
    fn remember(&self) -> bool {
        self.remember.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Authenticate the end-user and complete a login interaction.
pub async fn login(
    uid: web::Path<String>,
    form: web::Form<LoginForm>,
    session: Session,
    interaction_actor: web::Data<Addr<InteractionActor>>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, OidcError> {
    let uid = uid.into_inner();
    require_interaction(&session, &uid)?;

    let form = form.into_inner();
    let remember = form.remember();

    let account = interaction_actor
        .send(Authenticate {
            email: form.email,
            password: form.password,
            span: tracing::Span::current(),
        })
        .await
        .map_err(mailbox_error)?
        .inspect_err(|_| metrics.interaction_login_failures_total.inc())?;

    let result = InteractionResult::login(LoginResult {
        account: account.account_id,
        acr: "1".to_string(),
        remember,
        ts: epoch_seconds(),
    });

    let return_to = interaction_actor
        .send(FinishInteraction {
            uid,
            result,
            span: tracing::Span::current(),
        })
        .await
        .map_err(mailbox_error)??;

    release_interaction(&session);
    metrics.interaction_logins_total.inc();
    redirect(&return_to)
}
