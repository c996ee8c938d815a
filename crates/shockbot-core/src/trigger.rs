use std::collections::BTreeSet;

use shockbot_store::ListStore;

use crate::actuation::ActuationRequest;
use crate::error::{CommandError, ParseError};
use crate::parser::{CommandTable, ParsedCommand, parse};
use crate::transport::InboundMessage;

pub const TRIGGER_USAGE: &str = "<word> <intensity 1-100> <duration 1-15>";

/// Source of the two lists the trigger path reads on every message.
pub trait TriggerLists {
    fn authorization_set(&self) -> BTreeSet<String>;
    fn trigger_words(&self) -> Vec<String>;
}

impl TriggerLists for ListStore {
    fn authorization_set(&self) -> BTreeSet<String> {
        ListStore::authorization_set(self)
    }

    fn trigger_words(&self) -> Vec<String> {
        ListStore::trigger_words(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Empty,
    OwnMessage,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Ignored(IgnoreReason),
    Command(Result<ParsedCommand, ParseError>),
    Actuation(Result<ActuationRequest, CommandError>),
}

/// Decides what one inbound message means. Commands win over trigger words.
pub fn classify(
    message: &InboundMessage,
    bot_id: Option<&str>,
    table: &CommandTable,
    lists: &dyn TriggerLists,
) -> Dispatch {
    let body = message.body.trim();
    if body.is_empty() {
        return Dispatch::Ignored(IgnoreReason::Empty);
    }
    if bot_id.is_some_and(|id| id == message.sender_id) {
        return Dispatch::Ignored(IgnoreReason::OwnMessage);
    }

    if let Some(command_text) = table.recognize(body) {
        return Dispatch::Command(parse(command_text, table, &message.sender_id));
    }

    if !lists.authorization_set().contains(&message.sender_id) {
        return Dispatch::Ignored(IgnoreReason::NoMatch);
    }
    let lowered = body.to_lowercase();
    let armed = lists
        .trigger_words()
        .iter()
        .map(|word| word.trim().to_lowercase())
        .any(|word| !word.is_empty() && lowered.contains(&word));
    if !armed {
        return Dispatch::Ignored(IgnoreReason::NoMatch);
    }

    Dispatch::Actuation(extract_actuation(body))
}

/// Reads `<word> <intensity> <duration>` by position.
pub fn extract_actuation(body: &str) -> Result<ActuationRequest, CommandError> {
    let tokens: Vec<&str> = body.split_whitespace().collect();
    let intensity = positional_int(&tokens, 1, "intensity")?;
    let duration = positional_int(&tokens, 2, "duration")?;
    ActuationRequest::new(intensity, duration)
}

fn positional_int(tokens: &[&str], index: usize, name: &'static str) -> Result<i64, CommandError> {
    let token = tokens.get(index).ok_or_else(|| ParseError::MissingArgument {
        argument: name,
        usage: TRIGGER_USAGE.to_string(),
    })?;
    token.parse::<i64>().map_err(|_| {
        ParseError::InvalidArgumentType {
            argument: name,
            expected: "number",
            value: token.to_string(),
            usage: TRIGGER_USAGE.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CommandId;
    use crate::transport::ChannelRef;

    struct StaticLists {
        members: Vec<&'static str>,
        words: Vec<&'static str>,
    }

    impl TriggerLists for StaticLists {
        fn authorization_set(&self) -> BTreeSet<String> {
            self.members.iter().map(|m| m.to_string()).collect()
        }

        fn trigger_words(&self) -> Vec<String> {
            self.words.iter().map(|w| w.to_string()).collect()
        }
    }

    fn lists() -> StaticLists {
        StaticLists {
            members: vec!["100"],
            words: vec!["zap"],
        }
    }

    fn msg(sender: &str, body: &str) -> InboundMessage {
        InboundMessage::new(sender, body, ChannelRef::new("c1"))
    }

    fn table() -> CommandTable {
        CommandTable::standard(">", false)
    }

    #[test]
    fn empty_and_own_messages_are_ignored() {
        assert_eq!(
            classify(&msg("100", "   "), Some("1"), &table(), &lists()),
            Dispatch::Ignored(IgnoreReason::Empty)
        );
        assert_eq!(
            classify(&msg("1", ">ping"), Some("1"), &table(), &lists()),
            Dispatch::Ignored(IgnoreReason::OwnMessage)
        );
    }

    #[test]
    fn any_sender_may_issue_commands() {
        match classify(&msg("999", ">ping"), Some("1"), &table(), &lists()) {
            Dispatch::Command(Ok(parsed)) => assert_eq!(parsed.id, CommandId::Ping),
            other => panic!("unexpected dispatch: {other:?}"),
        }
    }

    #[test]
    fn command_wins_over_trigger_word() {
        match classify(&msg("100", ">add zap"), Some("1"), &table(), &lists()) {
            Dispatch::Command(Ok(parsed)) => assert_eq!(parsed.id, CommandId::AddWord),
            other => panic!("unexpected dispatch: {other:?}"),
        }
    }

    #[test]
    fn authorized_trigger_extracts_intensity_then_duration() {
        match classify(&msg("100", "ZAP 30 4"), Some("1"), &table(), &lists()) {
            Dispatch::Actuation(Ok(request)) => {
                assert_eq!(request.intensity(), 30);
                assert_eq!(request.duration_seconds(), 4);
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
    }

    #[test]
    fn unauthorized_sender_is_ignored_even_with_trigger_word() {
        assert_eq!(
            classify(&msg("200", "zap 30 4"), Some("1"), &table(), &lists()),
            Dispatch::Ignored(IgnoreReason::NoMatch)
        );
    }

    #[test]
    fn empty_authorization_set_rejects_everyone() {
        let lists = StaticLists {
            members: vec![],
            words: vec!["zap"],
        };
        assert_eq!(
            classify(&msg("100", "zap 30 4"), None, &table(), &lists),
            Dispatch::Ignored(IgnoreReason::NoMatch)
        );
    }

    #[test]
    fn text_without_trigger_word_is_ignored() {
        assert_eq!(
            classify(&msg("100", "hello 30 4"), Some("1"), &table(), &lists()),
            Dispatch::Ignored(IgnoreReason::NoMatch)
        );
    }

    #[test]
    fn unknown_prefixed_text_falls_through_to_trigger_matching() {
        assert!(matches!(
            classify(&msg("100", ">zap 5 5"), Some("1"), &table(), &lists()),
            Dispatch::Actuation(Ok(_))
        ));
    }

    #[test]
    fn bad_trigger_parameters_are_format_errors() {
        assert!(matches!(
            classify(&msg("100", "zap"), None, &table(), &lists()),
            Dispatch::Actuation(Err(CommandError::Parse(ParseError::MissingArgument {
                argument: "intensity",
                ..
            })))
        ));
        assert!(matches!(
            classify(&msg("100", "zap hard 4"), None, &table(), &lists()),
            Dispatch::Actuation(Err(CommandError::Parse(
                ParseError::InvalidArgumentType { .. }
            )))
        ));
        assert!(matches!(
            classify(&msg("100", "zap 150 4"), None, &table(), &lists()),
            Dispatch::Actuation(Err(CommandError::OutOfRange {
                field: "intensity",
                ..
            }))
        ));
    }
}
