use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{ConsoleTag, MessageType};
use crate::error::ProtocolError;
use crate::format::Formatted;
use crate::value::Value;

/// Payload of a `JSError` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub msg: String,
    pub url: String,
    /// Human-readable "line X column Y" string.
    pub position: String,
    pub error: Formatted,
}

/// Payload of a `NetWork` envelope.
///
/// Fields are accumulated from the request call and completed once the
/// request settles. Unknown fetch options are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkPayload {
    /// Correlation hint derived from the wall clock; not unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    pub url: String,
    /// Request headers rendered by the value serializer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub res: Option<Value>,
    #[serde(default, rename = "resURL", skip_serializing_if = "Option::is_none")]
    pub res_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NetworkPayload {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Envelope message, one shape per [`MessageType`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Error(ErrorPayload),
    Console(Vec<Formatted>),
    Network(NetworkPayload),
}

impl Message {
    /// The envelope type this message belongs to.
    pub fn msg_type(&self) -> MessageType {
        match self {
            Message::Error(_) => MessageType::JsError,
            Message::Console(_) => MessageType::Console,
            Message::Network(_) => MessageType::Network,
        }
    }
}

/// Unit handed to the message sink.
///
/// Built only through the typed constructors, so the type always matches the
/// message and a console tag only appears on console envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct Envelope {
    #[serde(rename = "type")]
    msg_type: MessageType,
    message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<ConsoleTag>,
}

impl Envelope {
    /// Creates a `JSError` envelope.
    pub fn js_error(payload: ErrorPayload) -> Self {
        Self {
            msg_type: MessageType::JsError,
            message: Message::Error(payload),
            tag: None,
        }
    }

    /// Creates a `Console` envelope. `ConsoleTag::Log` is left off the wire.
    pub fn console(args: Vec<Formatted>, tag: ConsoleTag) -> Self {
        Self {
            msg_type: MessageType::Console,
            message: Message::Console(args),
            tag: match tag {
                ConsoleTag::Log => None,
                other => Some(other),
            },
        }
    }

    /// Creates a `NetWork` envelope.
    pub fn network(payload: NetworkPayload) -> Self {
        Self {
            msg_type: MessageType::Network,
            message: Message::Network(payload),
            tag: None,
        }
    }

    /// Decodes an envelope from JSON text.
    pub fn parse(json: &str) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope = serde_json::from_str(json)?;
        Envelope::try_from(raw)
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Console tag; `None` for plain logs and non-console envelopes.
    pub fn tag(&self) -> Option<ConsoleTag> {
        self.tag
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    /// Formatted console arguments, if this is a console envelope.
    pub fn console_args(&self) -> Option<&[Formatted]> {
        match &self.message {
            Message::Console(args) => Some(args),
            _ => None,
        }
    }

    pub fn network_payload(&self) -> Option<&NetworkPayload> {
        match &self.message {
            Message::Network(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn error_payload(&self) -> Option<&ErrorPayload> {
        match &self.message {
            Message::Error(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Wire shape read before the message is decoded by type.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    msg_type: MessageType,
    message: serde_json::Value,
    #[serde(default)]
    tag: Option<ConsoleTag>,
}

impl TryFrom<RawEnvelope> for Envelope {
    type Error = ProtocolError;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        match raw.msg_type {
            MessageType::JsError => {
                reject_tag(raw.msg_type, raw.tag)?;
                Ok(Envelope::js_error(serde_json::from_value(raw.message)?))
            }
            MessageType::Console => Ok(Envelope::console(
                serde_json::from_value(raw.message)?,
                raw.tag.unwrap_or(ConsoleTag::Log),
            )),
            MessageType::Network => {
                reject_tag(raw.msg_type, raw.tag)?;
                Ok(Envelope::network(serde_json::from_value(raw.message)?))
            }
        }
    }
}

fn reject_tag(msg_type: MessageType, tag: Option<ConsoleTag>) -> Result<(), ProtocolError> {
    match tag {
        Some(tag) => Err(ProtocolError::UnexpectedTag { msg_type, tag }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::RenderedBlock;

    #[test]
    fn console_log_omits_tag() {
        let env = Envelope::console(vec!["x".into()], ConsoleTag::Log);
        assert_eq!(env.tag(), None);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "Console");
        assert!(json.get("tag").is_none());
        assert_eq!(json["message"][0]["value"], "x");
    }

    #[test]
    fn console_warn_keeps_tag() {
        let env = Envelope::console(vec![], ConsoleTag::Warn);
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"tag\":\"warn\""));
    }

    #[test]
    fn js_error_roundtrip() {
        let env = Envelope::js_error(ErrorPayload {
            msg: "Uncaught TypeError".into(),
            url: "https://example.com/app.js".into(),
            position: "line 3 column 7".into(),
            error: Formatted::TypeName("TypeError".into()),
        });
        let json = serde_json::to_string(&env).unwrap();
        let parsed = Envelope::parse(&json).unwrap();
        assert_eq!(parsed, env);
        assert_eq!(parsed.msg_type(), MessageType::JsError);
    }

    #[test]
    fn network_payload_wire_names() {
        let mut payload = NetworkPayload::new("POST", "/api");
        payload.res_url = Some("https://example.com/api".into());
        payload.status = Some(201);
        payload.extra.insert("mode".into(), "cors".into());
        let json = serde_json::to_value(Envelope::network(payload)).unwrap();
        assert_eq!(json["type"], "NetWork");
        assert_eq!(json["message"]["resURL"], "https://example.com/api");
        assert_eq!(json["message"]["status"], 201);
        assert_eq!(json["message"]["mode"], "cors");
        assert!(json["message"].get("error").is_none());
        assert!(json["message"].get("timeout").is_none());
    }

    #[test]
    fn network_roundtrip_keeps_extra_fields() {
        let mut payload = NetworkPayload::new("GET", "/x");
        payload.error = Some("boom".into());
        payload.extra.insert("credentials".into(), "include".into());
        let env = Envelope::network(payload);
        let parsed = Envelope::parse(&serde_json::to_string(&env).unwrap()).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn console_block_roundtrip() {
        let env = Envelope::console(
            vec![Formatted::Block(RenderedBlock::render("{}").with_hint("h"))],
            ConsoleTag::Error,
        );
        let parsed = Envelope::parse(&serde_json::to_string(&env).unwrap()).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn parse_rejects_tag_on_network() {
        let json = r#"{"type":"NetWork","message":{"method":"GET","url":"/"},"tag":"warn"}"#;
        let err = Envelope::parse(json).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedTag { .. }));
    }

    #[test]
    fn parse_rejects_mismatched_message() {
        let json = r#"{"type":"JSError","message":["x"]}"#;
        assert!(matches!(
            Envelope::parse(json).unwrap_err(),
            ProtocolError::Json(_)
        ));
    }

    #[test]
    fn explicit_log_tag_is_normalized() {
        let json = r#"{"type":"Console","message":[],"tag":"log"}"#;
        let env = Envelope::parse(json).unwrap();
        assert_eq!(env.tag(), None);
    }
}
