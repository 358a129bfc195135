//! Wire protocol: event envelopes and translation payloads
//!
//! Every frame on the socket is a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`.

use std::fmt;
use std::str::FromStr;

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use serde_json::Value;
use thiserror::Error;

/// Client → server: one translation attempt
pub const TRANSLATE_EVENT: &str = "translate";

/// Server → client: the reply to a `translate` event
pub const TRANSLATION_EVENT: &str = "translation";

/// Errors raised while decoding an inbound frame
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The frame is not a JSON object carrying an `event` name
    #[error("Malformed event envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    /// The event name is known but its payload does not match the schema
    #[error("Invalid payload for event '{event}': {source}")]
    Payload {
        /// Event name
        event: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },
}

/// Target languages supported by the dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    /// `spanish`
    Spanish,
    /// `german`
    German,
}

impl TargetLanguage {
    /// All supported languages, in wire order
    pub const ALL: [Self; 2] = [Self::Spanish, Self::German];

    /// Wire identifier of the language
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spanish => "spanish",
            Self::German => "german",
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A language identifier outside the closed enumeration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported target language: '{0}'")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for TargetLanguage {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|language| language.as_str() == s)
            .ok_or_else(|| UnsupportedLanguage(s.to_string()))
    }
}

/// Payload of a `translate` event
///
/// `target_language` is kept as the raw string sent by the client; it is
/// validated when the request is handled so that an unknown language still
/// gets a reply. A missing or `null` language decodes as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    /// Phrase as typed or spoken, arbitrary casing and whitespace
    pub text: String,
    /// Requested language identifier
    #[serde(default, deserialize_with = "null_as_empty")]
    pub target_language: String,
}

/// `null` → `""`
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TranslationRequest {
    /// Build a request for one of the supported languages
    #[must_use]
    pub fn new(text: impl Into<String>, target_language: TargetLanguage) -> Self {
        Self { text: text.into(), target_language: target_language.as_str().to_string() }
    }
}

/// Outcome of a translation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationStatus {
    /// The phrase was found in the dictionary
    Success,
    /// The phrase has no dictionary entry
    NotFound,
    /// The requested language is not supported
    UnsupportedLanguage,
}

/// Payload of a `translation` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    /// The untouched input text
    pub original: String,
    /// Matched translation or a placeholder message
    pub translated: String,
    /// Echo of the requested language
    pub target_language: String,
    /// Outcome
    pub status: TranslationStatus,
}

/// Raw envelope before the payload is interpreted
#[derive(Debug, Deserialize)]
struct Envelope {
    /// Event name
    event: String,
    /// Event payload
    #[serde(default)]
    data: Value,
}

/// Events sent by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// `translate`
    Translate(TranslationRequest),
}

impl ClientEvent {
    /// Decode one text frame
    ///
    /// # Returns
    /// - `Ok(Some(event))`: a known event with a valid payload
    /// - `Ok(None)`: a well-formed envelope naming an event this server does not handle
    /// - `Err(ProtocolError)`: the frame could not be interpreted
    pub fn decode(frame: &str) -> Result<Option<Self>, ProtocolError> {
        let Envelope { event, data } =
            serde_json::from_str(frame).map_err(ProtocolError::Envelope)?;

        if event != TRANSLATE_EVENT {
            return Ok(None);
        }

        serde_json::from_value(data)
            .map(|request| Some(Self::Translate(request)))
            .map_err(|source| ProtocolError::Payload { event, source })
    }

    /// Event name on the wire
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Translate(_) => TRANSLATE_EVENT,
        }
    }
}

/// Events sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    /// `translation`
    Translation(TranslationResult),
}

impl ServerEvent {
    /// Encode as a text frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
