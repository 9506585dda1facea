use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown clip: {name}")]
    UnknownClip { name: String },

    #[error("unknown morph target: {name}")]
    UnknownMorphTarget { name: String },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[error("speech provider failed: {message}")]
    Provider { message: String },

    #[cfg(feature = "json")]
    #[error("failed to parse JSON: {message}")]
    JsonParse { message: String },

    #[cfg(feature = "json")]
    #[error("duplicate {kind} '{name}'")]
    JsonDuplicate { kind: String, name: String },
}
