//! Webhook: fulfillment endpoint for the conversational platform.
//!
//! Single port serves a health probe and `POST /webhook`. Known intents get canned
//! replies; everything else is answered through an `AnswerSource`.

mod handler;
mod protocol;
mod server;

pub use handler::fulfill;
pub use protocol::{
    ChipOption, CustomPayload, IntentRef, IntentRequest, Message, QueryResult, RichContentItem,
    TextBody, WebhookRequest, WebhookResponse,
};
pub use server::{router, run_server, WebhookState, SECRET_HEADER};
