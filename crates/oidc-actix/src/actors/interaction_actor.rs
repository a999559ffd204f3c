use actix::prelude::*;
use oidc_observability::annotate_span_with_trace_ids;
use std::sync::Arc;
use tracing::Instrument;

use oidc_core::{Account, InteractionDetails, InteractionResult, OidcError};
use oidc_provider::Provider;

/// Forwards interaction calls from the handlers to the [`Provider`].
pub struct InteractionActor {
    provider: Arc<Provider>,
}

impl InteractionActor {
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }
}

impl Actor for InteractionActor {
    type Context = Context<Self>;
}

#[derive(Message)]
#[rtype(result = "Result<InteractionDetails, OidcError>")]
pub struct GetInteractionDetails {
    pub uid: String,
    pub span: tracing::Span,
}

impl Handler<GetInteractionDetails> for InteractionActor {
    type Result = ResponseFuture<Result<InteractionDetails, OidcError>>;

    fn handle(&mut self, msg: GetInteractionDetails, _: &mut Self::Context) -> Self::Result {
        let provider = self.provider.clone();

        let actor_span = tracing::info_span!(
            parent: &msg.span,
            "actor.interaction.details",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            uid = %msg.uid
        );
        annotate_span_with_trace_ids(&actor_span);

        Box::pin(async move { provider.interaction_details(&msg.uid).await }.instrument(actor_span))
    }
}

#[derive(Message)]
#[rtype(result = "Result<String, OidcError>")]
pub struct FinishInteraction {
    pub uid: String,
    pub result: InteractionResult,
    pub span: tracing::Span,
}

impl Handler<FinishInteraction> for InteractionActor {
    type Result = ResponseFuture<Result<String, OidcError>>;

    fn handle(&mut self, msg: FinishInteraction, _: &mut Self::Context) -> Self::Result {
        let provider = self.provider.clone();

        let actor_span = tracing::info_span!(
            parent: &msg.span,
            "actor.interaction.finish",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            uid = %msg.uid,
            login = msg.result.login.is_some(),
            consent = msg.result.consent.is_some()
        );
        annotate_span_with_trace_ids(&actor_span);

        Box::pin(
            async move {
                let return_to = provider.interaction_finished(&msg.uid, msg.result).await?;
                tracing::info!("interaction finished");
                Ok(return_to)
            }
            .instrument(actor_span),
        )
    }
}

#[derive(Message)]
#[rtype(result = "Result<Account, OidcError>")]
pub struct Authenticate {
    pub email: String,
    pub password: String,
    pub span: tracing::Span,
}

impl Handler<Authenticate> for InteractionActor {
    type Result = ResponseFuture<Result<Account, OidcError>>;

    fn handle(&mut self, msg: Authenticate, _: &mut Self::Context) -> Self::Result {
        let provider = self.provider.clone();

        // Never record the email or password on the span.
        let actor_span = tracing::info_span!(
            parent: &msg.span,
            "actor.interaction.authenticate",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty
        );
        annotate_span_with_trace_ids(&actor_span);

        Box::pin(
            async move {
                let result = provider.authenticate(&msg.email, &msg.password).await;
                if let Err(err) = &result {
                    tracing::warn!(error = %err.error, "authentication rejected");
                }
                result
            }
            .instrument(actor_span),
        )
    }
}
