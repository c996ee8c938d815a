use shockbot_store::{ListLoad, ListName, ListStore, MembershipChange};
use tempfile::tempdir;

#[test]
fn add_then_remove_restores_previous_words() {
    let dir = tempdir().expect("tempdir");
    let store = ListStore::at_dir(dir.path());
    store.add_word("zap").expect("seed");
    store.add_word("buzz").expect("seed");
    let before = store.trigger_words();

    assert_eq!(store.add_word("ouch").expect("add"), MembershipChange::Added);
    assert_eq!(
        store.remove_word("ouch").expect("remove"),
        MembershipChange::Removed
    );
    assert_eq!(store.trigger_words(), before);
}

#[test]
fn second_add_is_reported_and_not_duplicated() {
    let dir = tempdir().expect("tempdir");
    let store = ListStore::at_dir(dir.path());
    assert_eq!(store.add_word("zap").expect("add"), MembershipChange::Added);
    assert_eq!(
        store.add_word("zap").expect("add again"),
        MembershipChange::AlreadyPresent
    );
    assert_eq!(store.trigger_words(), vec!["zap".to_string()]);
}

#[test]
fn removing_missing_word_leaves_no_file_behind() {
    let dir = tempdir().expect("tempdir");
    let store = ListStore::at_dir(dir.path());
    assert_eq!(
        store.remove_word("zap").expect("remove"),
        MembershipChange::NotPresent
    );
    assert_eq!(store.load(ListName::Wordlist), ListLoad::Absent);
}

#[test]
fn saved_lists_are_readable_by_a_fresh_store() {
    let dir = tempdir().expect("tempdir");
    let writer = ListStore::at_dir(dir.path().join("nested"));
    writer.add_member("123456789").expect("add member");
    writer.add_word("Zap").expect("add word");

    let reader = ListStore::at_dir(dir.path().join("nested"));
    assert!(reader.authorization_set().contains("123456789"));
    assert_eq!(
        reader.load(ListName::Wordlist),
        ListLoad::Present(vec!["zap".to_string()])
    );

    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    assert_eq!(leftovers.len(), 2, "temp files must not linger: {leftovers:?}");
}
