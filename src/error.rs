use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Could not find `window.{variable} = JSON.parse(\"...\");` in the document")]
    EmbeddedStateNotFound { variable: String },
    /// `fragment` is the head of the unescaped payload, kept for manual inspection.
    #[error("Failed to parse the embedded state as JSON")]
    Decode {
        #[source]
        source: serde_json::Error,
        fragment: String,
    },
}
