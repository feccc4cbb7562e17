//! Recognized intents and their canned replies.
//!
//! The platform sends the intent's display name; matching is exact and case-sensitive.

/// Intent classified by the upstream platform, as far as this webhook cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    FeesInfo,
    AdmissionProcess,
    CollegeContact,
    /// The platform's designated fallback intent (label from `routing.fallbackIntent`).
    Fallback,
    /// Any other display name.
    Unhandled,
}

pub const FEES_INFO: &str = "Get Fees Info";
pub const ADMISSION_PROCESS: &str = "Get Admission Process";
pub const COLLEGE_CONTACT: &str = "Get College Contact";

impl Intent {
    /// Classify a display name. `fallback_label` is the configured fallback intent name.
    pub fn parse(display_name: &str, fallback_label: &str) -> Self {
        match display_name {
            FEES_INFO => Intent::FeesInfo,
            ADMISSION_PROCESS => Intent::AdmissionProcess,
            COLLEGE_CONTACT => Intent::CollegeContact,
            name if name == fallback_label => Intent::Fallback,
            _ => Intent::Unhandled,
        }
    }

    /// Canned reply for intents answered without the generative backend.
    pub fn canned(self) -> Option<CannedReply> {
        match self {
            Intent::FeesInfo => Some(CannedReply::Text(
                "💰 The annual fee for B.Tech is around ₹95,000 per year.",
            )),
            Intent::AdmissionProcess => Some(CannedReply::Text(
                "📝 You can apply for admission through the DTE Maharashtra CAP process. Visit the official DTE site for details.",
            )),
            Intent::CollegeContact => Some(CannedReply::TextWithChips(
                "📞 You can contact the college using the information below:",
                CONTACT_CHIPS,
            )),
            Intent::Fallback | Intent::Unhandled => None,
        }
    }
}

/// Static reply: plain text, or text followed by suggestion chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedReply {
    Text(&'static str),
    TextWithChips(&'static str, &'static [&'static str]),
}

pub const CONTACT_CHIPS: &[&str] = &["📞 Call College", "🌐 Visit Website", "📍 View Location"];

/// Topic menu shown with generated answers, apologies and "not sure" replies.
pub const TOPIC_MENU: &[&str] = &[
    "🏫 College Info",
    "💰 Fee Structure",
    "📍 College Location",
    "📞 Contact Details",
    "👨🏼‍💻 College ERP",
    "🎯 College Vision",
    "🕓 College Timing",
];

pub const APOLOGY: &str =
    "Sorry 😔, I couldn’t find an answer for that right now. You can explore these topics 👇";
pub const NOT_SURE: &str = "🤔 I’m not sure about that yet. You can explore these topics 👇";
pub const MISSING_KEY: &str = "⚠️ Gemini API key not set. Please contact admin.";
