use thiserror::Error;

/// Failures while turning raw text into a [`crate::ParsedCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("missing argument <{argument}>")]
    MissingArgument {
        argument: &'static str,
        usage: String,
    },
    #[error("`{value}` is not a valid {expected} for <{argument}>")]
    InvalidArgumentType {
        argument: &'static str,
        expected: &'static str,
        value: String,
        usage: String,
    },
}

impl ParseError {
    pub fn usage(&self) -> Option<&str> {
        match self {
            Self::UnknownCommand(_) => None,
            Self::MissingArgument { usage, .. } | Self::InvalidArgumentType { usage, .. } => {
                Some(usage)
            }
        }
    }
}

/// Everything a handler can report back to the chat. None of these escape
/// the engine; each becomes a single error reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid {field} `{value}`! Use a valid {field}:\n{choices}")]
    InvalidEnumValue {
        field: &'static str,
        value: i64,
        choices: String,
    },
    #[error("{} not set! Set them with `{hint}`", missing.join(", "))]
    NotConfigured {
        missing: Vec<&'static str>,
        hint: String,
    },
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("shock failed: {0}")]
    ActuationFailed(String),
    #[error("the {0} file is absent or invalid; fix it before editing")]
    AbsentOrInvalid(&'static str),
    #[error("could not resolve user `{user}`: {cause}")]
    UserResolutionFailed { user: String, cause: String },
    #[error("you are not allowed to use `{0}`")]
    NotAuthorized(String),
    #[error("failed to save {what}: {cause}")]
    Storage { what: &'static str, cause: String },
    #[error("transport error: {0}")]
    Transport(String),
}

impl CommandError {
    /// Usage string for format errors, so the sender can self-correct.
    pub fn usage(&self) -> Option<&str> {
        match self {
            Self::Parse(err) => err.usage(),
            _ => None,
        }
    }
}
