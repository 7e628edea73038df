//! Structured-reply model for the serving endpoint and text extraction
//!
//! The endpoint returns an ordered sequence of output elements, each with an
//! ordered sequence of content elements that may carry a text field. Every
//! field is optional on the wire: partial objects must deserialize and
//! extraction must never fail, it just contributes less text.

use serde::Deserialize;

/// Raw reply object from the model-serving endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawModelReply {
    #[serde(default)]
    pub output: Vec<ReplyOutput>,
}

/// One output element of a reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyOutput {
    #[serde(default)]
    pub content: Vec<ReplyContent>,
}

/// One content element of an output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyContent {
    #[serde(default)]
    pub text: Option<String>,
}

/// Flatten a structured reply into plain text.
///
/// Collects every non-blank text fragment in traversal order and joins with
/// newlines. Newlines matter: the endpoint emits markdown tables whose row
/// structure a space-join would destroy. A blank result means "empty reply",
/// which is a distinguishable outcome for the caller, not an error.
pub fn flatten_reply(reply: &RawModelReply) -> String {
    reply
        .output
        .iter()
        .flat_map(|output| &output.content)
        .filter_map(|content| content.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
