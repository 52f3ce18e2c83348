//! Request extractors shared by the handlers.

pub mod validated_json;

pub use validated_json::ValidatedJson;
