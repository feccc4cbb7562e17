//! Intent dispatch: canned replies for known topics, generative answer for the rest.

use crate::config::{Config, GenerativeFallback};
use crate::intent::{CannedReply, Intent, APOLOGY, MISSING_KEY, NOT_SURE, TOPIC_MENU};
use crate::llm::{Answer, AnswerSource};
use crate::text::shape_answer;
use crate::webhook::protocol::{IntentRequest, Message, WebhookResponse};

/// Where a request goes after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Canned(CannedReply),
    Generate,
    NotSure,
}

fn route(intent: Intent, policy: GenerativeFallback) -> Route {
    match (intent.canned(), intent) {
        (Some(reply), _) => Route::Canned(reply),
        (None, Intent::Unhandled) if policy == GenerativeFallback::FallbackOnly => Route::NotSure,
        (None, _) => Route::Generate,
    }
}

fn canned_response(reply: CannedReply) -> WebhookResponse {
    match reply {
        CannedReply::Text(text) => WebhookResponse::text(text),
        CannedReply::TextWithChips(text, chips) => {
            WebhookResponse::messages(vec![Message::text(text), Message::chips(chips)])
        }
    }
}

fn with_menu(text: &str, menu: bool) -> WebhookResponse {
    if menu {
        WebhookResponse::messages(vec![Message::text(text), Message::chips(TOPIC_MENU)])
    } else {
        WebhookResponse::text(text)
    }
}

/// Answer one webhook request. Always produces a reply; backend failures become the apology.
pub async fn fulfill(
    req: &IntentRequest,
    config: &Config,
    source: &dyn AnswerSource,
) -> WebhookResponse {
    let intent = Intent::parse(&req.intent, &config.routing.fallback_intent);
    log::info!("intent: {:?} ({:?})", req.intent, intent);
    log::debug!("user message: {:?}", req.user_message);

    match route(intent, config.routing.generative_fallback) {
        Route::Canned(reply) => canned_response(reply),
        Route::NotSure => with_menu(NOT_SURE, true),
        Route::Generate => generate_reply(req.user_message.trim(), config, source).await,
    }
}

async fn generate_reply(
    message: &str,
    config: &Config,
    source: &dyn AnswerSource,
) -> WebhookResponse {
    if message.is_empty() {
        return with_menu(NOT_SURE, true);
    }
    let apology = || with_menu(APOLOGY, config.reply.menu_on_failure);
    match source.answer(message).await {
        Answer::Text(text) => {
            let segments = shape_answer(&text, &config.reply);
            if segments.is_empty() {
                return apology();
            }
            let mut messages: Vec<Message> = segments.into_iter().map(Message::text).collect();
            if config.reply.menu_with_answer {
                messages.push(Message::chips(TOPIC_MENU));
            }
            WebhookResponse::messages(messages)
        }
        Answer::NoAnswer => apology(),
        Answer::Unconfigured => {
            log::error!("gemini api key not set; cannot answer unmatched intent");
            WebhookResponse::text(MISSING_KEY)
        }
    }
}
