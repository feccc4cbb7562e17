//! Fulfillment wire types (Dialogflow ES webhook format).

use serde::{Deserialize, Serialize};

/// Inbound webhook body: `{ "queryResult": { "intent": { "displayName" }, "queryText" } }`.
/// Every level may be missing or `null`; absent values become empty strings in `IntentRequest`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub query_result: Option<QueryResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub intent: Option<IntentRef>,
    #[serde(default)]
    pub query_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// The two inbound fields the handler looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub intent: String,
    pub user_message: String,
}

impl IntentRequest {
    pub fn new(intent: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            user_message: user_message.into(),
        }
    }
}

impl From<WebhookRequest> for IntentRequest {
    fn from(req: WebhookRequest) -> Self {
        let query = req.query_result.unwrap_or_default();
        Self {
            intent: query
                .intent
                .and_then(|i| i.display_name)
                .unwrap_or_default(),
            user_message: query.query_text.unwrap_or_default(),
        }
    }
}

/// Outbound body: `{ "fulfillmentText" }` or `{ "fulfillmentMessages": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_messages: Option<Vec<Message>>,
}

impl WebhookResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            fulfillment_text: Some(text.into()),
            fulfillment_messages: None,
        }
    }

    pub fn messages(messages: Vec<Message>) -> Self {
        Self {
            fulfillment_text: None,
            fulfillment_messages: Some(messages),
        }
    }

    /// All user-visible text, in order: `fulfillmentText` or the text segments of `fulfillmentMessages`.
    pub fn texts(&self) -> Vec<&str> {
        if let Some(ref t) = self.fulfillment_text {
            return vec![t.as_str()];
        }
        self.fulfillment_messages
            .iter()
            .flatten()
            .filter_map(|m| match m {
                Message::Text { text } => Some(text.text.iter().map(String::as_str)),
                Message::Payload { .. } => None,
            })
            .flatten()
            .collect()
    }

    /// Labels of every chip in the response.
    pub fn chips(&self) -> Vec<&str> {
        self.fulfillment_messages
            .iter()
            .flatten()
            .filter_map(|m| match m {
                Message::Payload { payload } => Some(payload),
                Message::Text { .. } => None,
            })
            .flat_map(|p| p.rich_content.iter().flatten())
            .flat_map(|item| match item {
                RichContentItem::Chips { options } => options.iter().map(|o| o.text.as_str()),
            })
            .collect()
    }
}

/// One entry of `fulfillmentMessages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Text { text: TextBody },
    Payload { payload: CustomPayload },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text {
            text: TextBody {
                text: vec![text.into()],
            },
        }
    }

    /// A rich content payload with a single chips row.
    pub fn chips<S: AsRef<str>>(labels: &[S]) -> Self {
        let options = labels
            .iter()
            .map(|l| ChipOption {
                text: l.as_ref().to_string(),
            })
            .collect();
        Message::Payload {
            payload: CustomPayload {
                rich_content: vec![vec![RichContentItem::Chips { options }]],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    pub text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPayload {
    pub rich_content: Vec<Vec<RichContentItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RichContentItem {
    Chips { options: Vec<ChipOption> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipOption {
    pub text: String,
}
