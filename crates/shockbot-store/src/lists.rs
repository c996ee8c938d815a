use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// The two named collections kept on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListName {
    Whitelist,
    Wordlist,
}

impl ListName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist",
            Self::Wordlist => "wordlist",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist.json",
            Self::Wordlist => "wordlist.json",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist",
            Self::Wordlist => "words",
        }
    }
}

/// Result of reading a named list. `Absent` and `Invalid` are kept apart so
/// logs can tell a fresh install from a corrupted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListLoad {
    Present(Vec<String>),
    Absent,
    Invalid(String),
}

impl ListLoad {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Folds absent or malformed lists into an empty one.
    pub fn into_items(self) -> Vec<String> {
        match self {
            Self::Present(items) => items,
            Self::Absent | Self::Invalid(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

#[derive(Debug, Clone)]
pub struct ListStore {
    dir: PathBuf,
}

impl ListStore {
    pub fn at_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: ListName) -> PathBuf {
        self.dir.join(name.file_name())
    }

    pub fn load(&self, name: ListName) -> ListLoad {
        let path = self.path_for(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(list = name.as_str(), path = %path.display(), "list file not found");
                return ListLoad::Absent;
            }
            Err(err) => {
                warn!(list = name.as_str(), path = %path.display(), error = %err, "failed to read list file");
                return ListLoad::Invalid(err.to_string());
            }
        };
        match parse_list(&raw, name) {
            Ok(items) => ListLoad::Present(items),
            Err(reason) => {
                warn!(list = name.as_str(), path = %path.display(), %reason, "list file is malformed");
                ListLoad::Invalid(reason)
            }
        }
    }

    /// Replaces the named list. The new content becomes visible in one rename.
    pub fn save(&self, name: ListName, items: &[String]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create list dir {}", self.dir.display()))?;
        let path = self.path_for(name);

        let values: Vec<Value> = items
            .iter()
            .map(|item| match name {
                // Account ids are written as numbers so hand-edited files stay compatible.
                ListName::Whitelist => item
                    .parse::<u64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(item.as_str())),
                ListName::Wordlist => Value::from(item.as_str()),
            })
            .collect();
        let mut root = Map::new();
        root.insert(name.key().to_string(), Value::Array(values));
        let rendered = render_pretty(&Value::Object(root))?;

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("failed to stage {}", path.display()))?;
        tmp.write_all(rendered.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tmp.persist(&path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Fresh read of the authorization set; absent or malformed means nobody.
    pub fn authorization_set(&self) -> BTreeSet<String> {
        self.load(ListName::Whitelist).into_items().into_iter().collect()
    }

    pub fn trigger_words(&self) -> Vec<String> {
        self.load(ListName::Wordlist).into_items()
    }

    pub fn add_word(&self, word: &str) -> Result<MembershipChange> {
        let word = normalize_word(word)?;
        let mut words = self.trigger_words();
        if words.contains(&word) {
            return Ok(MembershipChange::AlreadyPresent);
        }
        words.push(word);
        self.save(ListName::Wordlist, &words)?;
        Ok(MembershipChange::Added)
    }

    pub fn remove_word(&self, word: &str) -> Result<MembershipChange> {
        let word = normalize_word(word)?;
        let mut words = self.trigger_words();
        let before = words.len();
        words.retain(|existing| existing != &word);
        if words.len() == before {
            return Ok(MembershipChange::NotPresent);
        }
        self.save(ListName::Wordlist, &words)?;
        Ok(MembershipChange::Removed)
    }

    pub fn add_member(&self, id: &str) -> Result<MembershipChange> {
        let id = normalize_member(id)?;
        let mut members = self.load(ListName::Whitelist).into_items();
        if members.contains(&id) {
            return Ok(MembershipChange::AlreadyPresent);
        }
        members.push(id);
        self.save(ListName::Whitelist, &members)?;
        Ok(MembershipChange::Added)
    }

    pub fn remove_member(&self, id: &str) -> Result<MembershipChange> {
        let id = normalize_member(id)?;
        let mut members = self.load(ListName::Whitelist).into_items();
        let before = members.len();
        members.retain(|existing| existing != &id);
        if members.len() == before {
            return Ok(MembershipChange::NotPresent);
        }
        self.save(ListName::Whitelist, &members)?;
        Ok(MembershipChange::Removed)
    }
}

fn normalize_word(word: &str) -> Result<String> {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        bail!("word cannot be empty");
    }
    Ok(word)
}

/// Accepts a bare account id or a `<@id>` / `<@!id>` mention.
fn normalize_member(id: &str) -> Result<String> {
    let raw = id.trim();
    let id = match raw.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>')) {
        Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
        None => raw,
    };
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        bail!("member id `{raw}` must be a numeric account id");
    }
    Ok(id.to_string())
}

fn parse_list(raw: &str, name: ListName) -> std::result::Result<Vec<String>, String> {
    let key = name.key();
    let root: Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let entries = match root.get(key) {
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(format!("`{key}` is not an array")),
        None => return Err(format!("missing `{key}` key")),
    };

    let mut items: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let item = match entry {
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            other => return Err(format!("unsupported `{key}` entry: {other}")),
        };
        // Trigger matching is case-insensitive.
        let item = match name {
            ListName::Wordlist => item.to_lowercase(),
            ListName::Whitelist => item,
        };
        if !item.is_empty() && !items.contains(&item) {
            items.push(item);
        }
    }
    Ok(items)
}

fn render_pretty(value: &Value) -> Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(value, &mut serializer)
        .with_context(|| "failed to serialize list")?;
    String::from_utf8(out).with_context(|| "serialized list is not utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_absent_not_invalid() {
        let tmp = tempdir().expect("tempdir");
        let store = ListStore::at_dir(tmp.path());
        assert_eq!(store.load(ListName::Wordlist), ListLoad::Absent);
        assert!(store.trigger_words().is_empty());
    }

    #[test]
    fn malformed_file_is_reported_and_reads_empty() {
        let tmp = tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("whitelist.json"), "{not json").expect("seed");
        let store = ListStore::at_dir(tmp.path());
        assert!(matches!(
            store.load(ListName::Whitelist),
            ListLoad::Invalid(_)
        ));
        assert!(store.authorization_set().is_empty());
    }

    #[test]
    fn wrong_shape_is_invalid() {
        let tmp = tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("wordlist.json"), r#"{"words": "zap"}"#).expect("seed");
        let store = ListStore::at_dir(tmp.path());
        match store.load(ListName::Wordlist) {
            ListLoad::Invalid(reason) => assert!(reason.contains("not an array")),
            other => panic!("unexpected load result: {other:?}"),
        }
    }

    #[test]
    fn numeric_and_string_ids_are_both_accepted() {
        let tmp = tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join("whitelist.json"),
            r#"{"whitelist": [123456789012345678, "42"]}"#,
        )
        .expect("seed");
        let store = ListStore::at_dir(tmp.path());
        let members = store.authorization_set();
        assert!(members.contains("123456789012345678"));
        assert!(members.contains("42"));
    }

    #[test]
    fn whitelist_is_saved_with_numeric_ids() {
        let tmp = tempdir().expect("tempdir");
        let store = ListStore::at_dir(tmp.path());
        assert_eq!(
            store.add_member("987").expect("add member"),
            MembershipChange::Added
        );
        let raw = std::fs::read_to_string(tmp.path().join("whitelist.json")).expect("read");
        let parsed: Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(parsed["whitelist"][0], Value::from(987_u64));
        assert!(raw.contains("\n        987"));
    }

    #[test]
    fn member_ids_must_be_numeric() {
        let tmp = tempdir().expect("tempdir");
        let store = ListStore::at_dir(tmp.path());
        assert!(store.add_member("abc").is_err());
        assert!(store.add_member("<@abc>").is_err());
        assert!(!tmp.path().join("whitelist.json").exists());

        assert_eq!(
            store.add_member("<@!555>").expect("mention"),
            MembershipChange::Added
        );
        assert_eq!(
            store.add_member("555").expect("bare id"),
            MembershipChange::AlreadyPresent
        );
        assert!(store.authorization_set().contains("555"));
    }

    #[test]
    fn words_are_lowercased_on_add() {
        let tmp = tempdir().expect("tempdir");
        let store = ListStore::at_dir(tmp.path());
        store.add_word("  ZAP ").expect("add");
        assert_eq!(store.trigger_words(), vec!["zap".to_string()]);
        assert_eq!(
            store.remove_word("Zap").expect("remove"),
            MembershipChange::Removed
        );
    }

    #[test]
    fn mixed_case_words_on_disk_are_folded() {
        let tmp = tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join("wordlist.json"),
            r#"{"words": ["ZAP", "zap", " Buzz "]}"#,
        )
        .expect("seed");
        let store = ListStore::at_dir(tmp.path());
        assert_eq!(
            store.trigger_words(),
            vec!["zap".to_string(), "buzz".to_string()]
        );
        assert_eq!(
            store.add_word("zap").expect("add"),
            MembershipChange::AlreadyPresent
        );
        assert_eq!(
            store.remove_word("zap").expect("remove"),
            MembershipChange::Removed
        );
        assert_eq!(store.trigger_words(), vec!["buzz".to_string()]);
    }

    #[test]
    fn empty_word_is_rejected() {
        let tmp = tempdir().expect("tempdir");
        let store = ListStore::at_dir(tmp.path());
        assert!(store.add_word("   ").is_err());
    }
}
