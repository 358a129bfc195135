//! Translation request handling
//!
//! A request is handled in three steps: normalize the text, look it up in the
//! dictionary, reply with exactly one `translation` event on the originating
//! connection. Nothing is remembered between requests.

use std::sync::Arc;

use crate::dictionary::{
    DictionaryIndex,
    normalize,
};
use crate::protocol::{
    ServerEvent,
    TargetLanguage,
    TranslationRequest,
    TranslationResult,
    TranslationStatus,
};
use crate::registry::ConnectionId;
use crate::transport::Emitter;

/// Placeholder sent when a phrase has no dictionary entry
#[must_use]
pub fn not_found_message(text: &str) -> String {
    format!("[No translation found for \"{text}\"]")
}

/// Placeholder sent when the requested language is not supported
#[must_use]
pub fn unsupported_language_message(language: &str) -> String {
    format!("[Unsupported target language \"{language}\"]")
}

/// Resolves translation requests against a shared dictionary
#[derive(Debug, Clone)]
pub struct TranslationHandler {
    /// Read-only dictionary shared by all connections
    dictionary: Arc<DictionaryIndex>,
}

impl TranslationHandler {
    /// Create a handler over `dictionary`
    #[must_use]
    pub const fn new(dictionary: Arc<DictionaryIndex>) -> Self {
        Self { dictionary }
    }

    /// Compute the result for one request
    ///
    /// Empty or whitespace-only text never matches and yields `not-found`.
    #[must_use]
    pub fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        let language = match request.target_language.parse::<TargetLanguage>() {
            Ok(language) => language,
            Err(error) => {
                tracing::debug!(%error, "Rejecting translation request");
                return TranslationResult {
                    original: request.text.clone(),
                    translated: unsupported_language_message(&request.target_language),
                    target_language: request.target_language.clone(),
                    status: TranslationStatus::UnsupportedLanguage,
                };
            }
        };

        let key = normalize(&request.text);
        let (translated, status) = self.dictionary.lookup(&key).map_or_else(
            || (not_found_message(&request.text), TranslationStatus::NotFound),
            |translations| (translations.get(language).to_string(), TranslationStatus::Success),
        );

        TranslationResult {
            original: request.text.clone(),
            translated,
            target_language: request.target_language.clone(),
            status,
        }
    }

    /// Handle one `translate` event and reply on the same connection
    ///
    /// If the connection has already gone away the reply is silently dropped.
    pub fn handle_translate(
        &self,
        connection: ConnectionId,
        request: &TranslationRequest,
        emitter: &impl Emitter,
    ) {
        let result = self.translate(request);
        tracing::debug!(
            connection = %connection,
            text = %request.text,
            target_language = %request.target_language,
            status = ?result.status,
            "Translated"
        );
        emitter.emit(connection, ServerEvent::Translation(result));
    }
}
