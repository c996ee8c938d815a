use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Integer,
    FreeText { consumes_remainder: bool },
    UserReference,
    /// Falls back to the invoking participant when omitted.
    OptionalUserReference,
}

impl ArgKind {
    fn is_required(self) -> bool {
        !matches!(self, Self::OptionalUserReference)
    }

    fn expected(self) -> &'static str {
        match self {
            Self::Integer => "number",
            Self::FreeText { .. } => "text",
            Self::UserReference | Self::OptionalUserReference => "user ID or mention",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
}

impl ArgSpec {
    pub const fn new(name: &'static str, kind: ArgKind) -> Self {
        Self { name, kind }
    }
}

/// Who may run a command. Actuation through trigger words is always
/// `Authorized`; commands default to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Open,
    Authorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Ping,
    Status,
    Avatar,
    Banner,
    AddWord,
    RemoveWord,
    Test,
    SetShocker,
    SetUsername,
    Shocker,
    Help,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub id: CommandId,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub args: Vec<ArgSpec>,
    pub capability: Capability,
    pub summary: &'static str,
}

impl CommandSpec {
    fn new(id: CommandId, name: &'static str, summary: &'static str) -> Self {
        Self {
            id,
            name,
            aliases: &[],
            args: Vec::new(),
            capability: Capability::Open,
            summary,
        }
    }

    fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn arg(mut self, name: &'static str, kind: ArgKind) -> Self {
        self.args.push(ArgSpec::new(name, kind));
        self
    }

    fn capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    fn matches(&self, token: &str) -> bool {
        self.name.eq_ignore_ascii_case(token)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(token))
    }

    fn required_args(&self) -> usize {
        self.args.iter().filter(|arg| arg.kind.is_required()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub id: CommandId,
    /// Canonical command name, aliases already resolved.
    pub token: String,
    pub args: Vec<String>,
}

impl ParsedCommand {
    pub fn arg(&self, index: usize) -> &str {
        self.args.get(index).map(String::as_str).unwrap_or_default()
    }

    /// Integer arguments were checked during parsing.
    pub fn int_arg(&self, index: usize) -> i64 {
        self.arg(index).parse().unwrap_or_default()
    }
}

/// The closed set of commands plus the prefix that marks them in chat.
#[derive(Debug, Clone)]
pub struct CommandTable {
    prefix: String,
    commands: Vec<CommandSpec>,
}

impl CommandTable {
    pub fn standard(prefix: impl Into<String>, word_commands_require_authorization: bool) -> Self {
        use ArgKind::*;

        let word_capability = if word_commands_require_authorization {
            Capability::Authorized
        } else {
            Capability::Open
        };
        let commands = vec![
            CommandSpec::new(CommandId::Ping, "ping", "measure reply latency"),
            CommandSpec::new(CommandId::Status, "status", "set presence")
                .arg("type", Integer)
                .arg("status", FreeText {
                    consumes_remainder: true,
                }),
            CommandSpec::new(CommandId::Avatar, "avatar", "show a user's avatar")
                .aliases(&["pfp"])
                .arg("user", OptionalUserReference),
            CommandSpec::new(CommandId::Banner, "banner", "show a user's banner")
                .arg("user", OptionalUserReference),
            CommandSpec::new(CommandId::AddWord, "add", "add a trigger word")
                .arg("word", FreeText {
                    consumes_remainder: false,
                })
                .capability(word_capability),
            CommandSpec::new(CommandId::RemoveWord, "remove_word", "remove a trigger word")
                .arg("word", FreeText {
                    consumes_remainder: false,
                })
                .capability(word_capability),
            CommandSpec::new(CommandId::Test, "test", "send a test shock")
                .arg("duration", Integer)
                .arg("intensity", Integer),
            CommandSpec::new(CommandId::SetShocker, "setshocker", "set device api key and code")
                .arg("apikey", FreeText {
                    consumes_remainder: false,
                })
                .arg("code", FreeText {
                    consumes_remainder: false,
                }),
            CommandSpec::new(CommandId::SetUsername, "setusername", "set device account username")
                .aliases(&["username"])
                .arg("username", FreeText {
                    consumes_remainder: false,
                }),
            CommandSpec::new(CommandId::Shocker, "shocker", "show device settings"),
            CommandSpec::new(CommandId::Help, "help", "list commands"),
            CommandSpec::new(CommandId::Shutdown, "shutdown", "stop the bot"),
        ];
        Self {
            prefix: prefix.into(),
            commands,
        }
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    pub fn lookup(&self, token: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|spec| spec.matches(token))
    }

    pub fn get(&self, id: CommandId) -> Option<&CommandSpec> {
        self.commands.iter().find(|spec| spec.id == id)
    }

    /// Returns the text after the prefix when the first token is a known command.
    pub fn recognize<'a>(&self, body: &'a str) -> Option<&'a str> {
        let rest = body.trim_start().strip_prefix(self.prefix.as_str())?;
        let head = rest.split_whitespace().next()?;
        if rest.starts_with(head) && self.lookup(head).is_some() {
            Some(rest)
        } else {
            None
        }
    }

    pub fn usage(&self, spec: &CommandSpec) -> String {
        let mut usage = format!("{}{}", self.prefix, spec.name);
        for arg in &spec.args {
            if arg.kind.is_required() {
                usage.push_str(&format!(" <{}>", arg.name));
            } else {
                usage.push_str(&format!(" [{}]", arg.name));
            }
        }
        usage
    }

    pub fn help_text(&self) -> String {
        let mut out = String::from("Commands:");
        for spec in &self.commands {
            out.push_str(&format!("\n{} - {}", self.usage(spec), spec.summary));
        }
        out
    }
}

/// Splits `raw` (prefix already removed) into a command and checked arguments.
pub fn parse(raw: &str, table: &CommandTable, invoker: &str) -> Result<ParsedCommand, ParseError> {
    let mut tokens = raw.split_whitespace();
    let head = tokens.next().unwrap_or_default();
    let spec = table
        .lookup(head)
        .ok_or_else(|| ParseError::UnknownCommand(head.to_string()))?;
    let tokens: Vec<&str> = tokens.collect();
    let usage = || table.usage(spec);

    if tokens.len() < spec.required_args() {
        let missing = spec
            .args
            .iter()
            .filter(|arg| arg.kind.is_required())
            .nth(tokens.len())
            .map(|arg| arg.name)
            .unwrap_or_default();
        return Err(ParseError::MissingArgument {
            argument: missing,
            usage: usage(),
        });
    }

    let mut args = Vec::with_capacity(spec.args.len());
    for (index, arg) in spec.args.iter().enumerate() {
        let token = tokens.get(index).copied();
        let invalid = |value: &str| ParseError::InvalidArgumentType {
            argument: arg.name,
            expected: arg.kind.expected(),
            value: value.to_string(),
            usage: usage(),
        };
        let missing = || ParseError::MissingArgument {
            argument: arg.name,
            usage: usage(),
        };
        match arg.kind {
            ArgKind::Integer => {
                let token = token.ok_or_else(missing)?;
                token.parse::<i64>().map_err(|_| invalid(token))?;
                args.push(token.to_string());
            }
            ArgKind::FreeText {
                consumes_remainder: true,
            } => {
                let joined = tokens.get(index..).unwrap_or_default().join(" ");
                if joined.is_empty() {
                    return Err(missing());
                }
                args.push(joined);
                break;
            }
            ArgKind::FreeText {
                consumes_remainder: false,
            } => {
                let token = token.ok_or_else(missing)?;
                args.push(token.to_string());
            }
            ArgKind::UserReference => {
                let token = token.ok_or_else(missing)?;
                let id = unwrap_user_reference(token).ok_or_else(|| invalid(token))?;
                args.push(id.to_string());
            }
            ArgKind::OptionalUserReference => match token {
                Some(token) => {
                    let id = unwrap_user_reference(token).ok_or_else(|| invalid(token))?;
                    args.push(id.to_string());
                }
                None => args.push(invoker.to_string()),
            },
        }
    }

    Ok(ParsedCommand {
        id: spec.id,
        token: spec.name.to_string(),
        args,
    })
}

/// Accepts `123`, `<@123>` or `<@!123>` and returns the bare id.
pub fn unwrap_user_reference(token: &str) -> Option<&str> {
    let id = match token.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>')) {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => token,
    };
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        Some(id)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CommandTable {
        CommandTable::standard(">", false)
    }

    #[test]
    fn status_joins_remaining_text() {
        let parsed = parse("status 2 hello world", &table(), "1").expect("parse");
        assert_eq!(parsed.token, "status");
        assert_eq!(parsed.id, CommandId::Status);
        assert_eq!(parsed.args, vec!["2".to_string(), "hello world".to_string()]);
    }

    #[test]
    fn command_token_is_case_insensitive() {
        let parsed = parse("STATUS 1   spaced    out", &table(), "1").expect("parse");
        assert_eq!(parsed.token, "status");
        assert_eq!(parsed.arg(1), "spaced out");
    }

    #[test]
    fn arity_is_checked_before_types() {
        let err = parse("status nope", &table(), "1").expect_err("must fail");
        match err {
            ParseError::MissingArgument { argument, usage } => {
                assert_eq!(argument, "status");
                assert_eq!(usage, ">status <type> <status>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_integer_is_invalid_type() {
        let err = parse("test five 10", &table(), "1").expect_err("must fail");
        assert!(matches!(
            err,
            ParseError::InvalidArgumentType {
                argument: "duration",
                ..
            }
        ));
        assert_eq!(err.usage(), Some(">test <duration> <intensity>"));
    }

    #[test]
    fn optional_user_defaults_to_invoker() {
        let parsed = parse("avatar", &table(), "555").expect("parse");
        assert_eq!(parsed.args, vec!["555".to_string()]);
    }

    #[test]
    fn mentions_are_unwrapped() {
        let parsed = parse("pfp <@!1234>", &table(), "1").expect("parse");
        assert_eq!(parsed.id, CommandId::Avatar);
        assert_eq!(parsed.arg(0), "1234");
        assert_eq!(parse("banner <@77>", &table(), "1").expect("parse").arg(0), "77");
    }

    #[test]
    fn malformed_user_reference_is_rejected() {
        let err = parse("banner <@abc>", &table(), "1").expect_err("must fail");
        assert!(matches!(err, ParseError::InvalidArgumentType { .. }));
        assert!(unwrap_user_reference("<@>").is_none());
        assert!(unwrap_user_reference("@someone").is_none());
    }

    #[test]
    fn required_user_reference_is_checked() {
        let table = CommandTable {
            prefix: ">".to_string(),
            commands: vec![
                CommandSpec::new(CommandId::Avatar, "poke", "poke someone")
                    .arg("user", ArgKind::UserReference),
            ],
        };

        assert_eq!(
            parse("poke", &table, "1"),
            Err(ParseError::MissingArgument {
                argument: "user",
                usage: ">poke <user>".to_string(),
            })
        );
        assert!(matches!(
            parse("poke <@x>", &table, "1"),
            Err(ParseError::InvalidArgumentType {
                argument: "user",
                expected: "user ID or mention",
                ..
            })
        ));
        assert_eq!(
            parse("poke <@!5>", &table, "1").expect("parse").args,
            vec!["5".to_string()]
        );
    }

    #[test]
    fn extra_tokens_are_ignored_for_fixed_arity() {
        let parsed = parse("add zap please", &table(), "1").expect("parse");
        assert_eq!(parsed.args, vec!["zap".to_string()]);
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            parse("dance", &table(), "1"),
            Err(ParseError::UnknownCommand("dance".to_string()))
        );
    }

    #[test]
    fn recognize_requires_prefix_and_known_command() {
        let table = table();
        assert_eq!(table.recognize(">ping"), Some("ping"));
        assert_eq!(table.recognize("  >Status 1 x"), Some("Status 1 x"));
        assert_eq!(table.recognize("ping"), None);
        assert_eq!(table.recognize(">dance"), None);
        assert_eq!(table.recognize("> ping"), None);
        assert_eq!(table.recognize(">"), None);
    }

    #[test]
    fn word_commands_follow_policy() {
        let open = CommandTable::standard(">", false);
        let gated = CommandTable::standard(">", true);
        assert_eq!(
            open.get(CommandId::AddWord).map(|spec| spec.capability),
            Some(Capability::Open)
        );
        assert_eq!(
            gated.get(CommandId::RemoveWord).map(|spec| spec.capability),
            Some(Capability::Authorized)
        );
        assert_eq!(
            gated.get(CommandId::Test).map(|spec| spec.capability),
            Some(Capability::Open)
        );
    }

    #[test]
    fn help_lists_every_command_with_usage() {
        let help = table().help_text();
        assert!(help.contains(">status <type> <status>"));
        assert!(help.contains(">avatar [user]"));
        assert_eq!(help.lines().count(), table().commands().len() + 1);
    }
}
