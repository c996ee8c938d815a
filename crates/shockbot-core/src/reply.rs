use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Wrapped in a code block.
    Block,
    /// Sent as-is so the platform can unfurl links.
    Inline,
    Error,
}

/// The single message every handled command sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
    /// Close the transport once this reply is delivered.
    pub shutdown: bool,
}

impl Reply {
    pub fn block(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Block,
            text: text.into(),
            shutdown: false,
        }
    }

    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Inline,
            text: text.into(),
            shutdown: false,
        }
    }

    pub fn error(err: &CommandError) -> Self {
        let mut text = format!("Error: {err}");
        if let Some(usage) = err.usage() {
            text.push_str(&format!("\nUsage: {usage}"));
        }
        Self {
            kind: ReplyKind::Error,
            text,
            shutdown: false,
        }
    }

    pub fn then_shutdown(mut self) -> Self {
        self.shutdown = true;
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == ReplyKind::Error
    }

    pub fn render(&self) -> String {
        match self.kind {
            ReplyKind::Inline => self.text.clone(),
            ReplyKind::Block | ReplyKind::Error => format!("```{}```", self.text),
        }
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Self::error(&err)
    }
}
