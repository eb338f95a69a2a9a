use tempfile::TempDir;
use workdeck_core::{ContextManager, JsonMap, JsonStore, ManagerError};

fn manager_in(dir: &TempDir) -> ContextManager {
    let store = JsonStore::new(dir.path().join("contexts.json"));
    ContextManager::new(Box::new(store)).unwrap()
}

fn create(manager: &mut ContextManager, name: &str) {
    manager.create(name, "", vec![], JsonMap::new()).unwrap();
}

#[test]
fn switch_pushes_the_previous_active_context() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "alpha");
    create(&mut manager, "beta");

    // Creation reassigns active without touching the stack.
    assert!(manager.peek_stack().is_empty());

    manager.switch("alpha").unwrap();
    assert_eq!(manager.peek_stack(), vec!["beta".to_string()]);
    assert_eq!(manager.active_name(), Some("alpha"));
}

#[test]
fn switch_to_the_active_context_leaves_the_stack_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "alpha");
    create(&mut manager, "beta");
    manager.switch("alpha").unwrap();

    manager.switch("alpha").unwrap();
    assert_eq!(manager.peek_stack(), vec!["beta".to_string()]);
}

#[test]
fn switch_to_missing_context_fails() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    let err = manager.switch("ghost").unwrap_err();
    assert!(matches!(err, ManagerError::NotFound(name) if name == "ghost"));
}

#[test]
fn push_is_an_alias_for_switch() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "alpha");
    create(&mut manager, "beta");

    manager.push("alpha").unwrap();
    assert_eq!(manager.active_name(), Some("alpha"));
    assert_eq!(manager.peek_stack(), vec!["beta".to_string()]);
}

#[test]
fn pop_restores_the_previous_context_and_repushes_the_current_one() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "alpha");
    create(&mut manager, "beta");
    manager.switch("alpha").unwrap();

    let restored = manager.pop().unwrap().unwrap();
    assert_eq!(restored.name, "beta");
    assert_eq!(manager.active_name(), Some("beta"));
    // Popping delegates to switch, which pushes the context being left.
    assert_eq!(manager.peek_stack(), vec!["alpha".to_string()]);
}

#[test]
fn pop_on_an_empty_stack_returns_none() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "alpha");
    assert!(manager.pop().unwrap().is_none());
    assert_eq!(manager.active_name(), Some("alpha"));
}

#[test]
fn pop_makes_a_single_attempt_on_stale_entries() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "alpha");
    create(&mut manager, "beta");
    create(&mut manager, "gamma");
    manager.switch("alpha").unwrap(); // stack: [gamma]
    manager.switch("beta").unwrap(); // stack: [gamma, alpha]

    manager.delete("alpha").unwrap();
    assert_eq!(
        manager.peek_stack(),
        vec!["gamma".to_string(), "alpha".to_string()]
    );

    // The stale tail is consumed, nothing deeper is tried.
    assert!(manager.pop().unwrap().is_none());
    assert_eq!(manager.active_name(), Some("beta"));
    assert_eq!(manager.peek_stack(), vec!["gamma".to_string()]);

    // A second pop reaches the still-live entry.
    let restored = manager.pop().unwrap().unwrap();
    assert_eq!(restored.name, "gamma");
}

#[test]
fn deleting_the_active_context_restores_past_dead_stack_entries() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "alpha");
    create(&mut manager, "beta");
    create(&mut manager, "gamma");
    manager.switch("alpha").unwrap(); // stack: [gamma]
    manager.switch("beta").unwrap(); // stack: [gamma, alpha]
    manager.delete("alpha").unwrap(); // alpha now dangles in the stack

    manager.delete("beta").unwrap();
    assert_eq!(manager.active_name(), Some("gamma"));
    assert!(manager.peek_stack().is_empty());
}

#[test]
fn deleting_the_active_context_falls_back_to_a_remaining_context() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "beta");
    create(&mut manager, "alpha");
    assert_eq!(manager.active_name(), Some("alpha"));

    manager.delete("alpha").unwrap();
    assert_eq!(manager.active_name(), Some("beta"));
}

#[test]
fn deleting_the_last_context_leaves_no_active_context() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "solo");
    manager.delete("solo").unwrap();
    assert_eq!(manager.active_name(), None);
    assert!(manager.get_active().is_none());
    assert!(manager.list().is_empty());
}

#[test]
fn deleting_an_inactive_context_keeps_the_active_pointer() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    create(&mut manager, "alpha");
    create(&mut manager, "beta");
    manager.delete("alpha").unwrap();
    assert_eq!(manager.active_name(), Some("beta"));
}

#[test]
fn stack_is_bounded_and_keeps_the_most_recent_entries() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager_in(&dir);
    let names: Vec<String> = (0..12).map(|idx| format!("ctx{idx:02}")).collect();
    for name in &names {
        manager.create(name, "", vec![], JsonMap::new()).unwrap();
    }
    for name in &names {
        manager.switch(name).unwrap();
    }

    let stack = manager.peek_stack();
    assert_eq!(stack.len(), 10);
    // The final switch targets ctx11, so the stack holds the ten entries
    // pushed before it, oldest first.
    assert_eq!(stack.first().map(String::as_str), Some("ctx01"));
    assert_eq!(stack.last().map(String::as_str), Some("ctx10"));
}

#[test]
fn stack_survives_a_reload_from_storage() {
    let dir = TempDir::new().unwrap();
    {
        let mut manager = manager_in(&dir);
        create(&mut manager, "alpha");
        create(&mut manager, "beta");
        manager.switch("alpha").unwrap();
    }
    let mut manager = manager_in(&dir);
    assert_eq!(manager.peek_stack(), vec!["beta".to_string()]);
    assert_eq!(manager.active_name(), Some("alpha"));
    let restored = manager.pop().unwrap().unwrap();
    assert_eq!(restored.name, "beta");
}
