use conversion_core::{find_tool, update, Msg, SessionState};

#[test]
fn update_is_noop() {
    let state = SessionState::new(find_tool("word-to-pdf").unwrap());
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
