use futures::FutureExt;

use super::*;

fn noop_loader() -> StageLoader {
    Arc::new(|_context: LoadContext| {
        async { Ok::<_, anyhow::Error>(StagePayload::List(Vec::new())) }.boxed()
    })
}

#[test]
fn register_rejects_duplicate_names() {
    let mut registry = StageRegistry::new();
    registry.register("list", noop_loader()).expect("first registration");

    let err = registry
        .register("list", noop_loader())
        .expect_err("duplicate must fail");
    assert_eq!(err, LoadError::DuplicateStage("list".into()));
}

#[test]
fn new_stages_start_unstarted() {
    let mut registry = StageRegistry::new();
    registry.register("modalDetail", noop_loader()).expect("register");

    let stage = registry.get("modalDetail").expect("stage");
    assert_eq!(stage.state(), StageState::Unstarted);
    assert!(!stage.is_loading());
    assert!(!stage.is_loaded());
    assert!(stage.last_error().is_none());
}

#[test]
fn loading_and_loaded_are_exclusive() {
    let mut registry = StageRegistry::new();
    registry.register("list", noop_loader()).expect("register");

    registry.mark_loading("list").expect("loading");
    let stage = registry.get("list").expect("stage");
    assert!(stage.is_loading() && !stage.is_loaded());
    assert!(registry.any_loading());

    registry.mark_loaded("list").expect("loaded");
    let stage = registry.get("list").expect("stage");
    assert!(!stage.is_loading() && stage.is_loaded());
    assert!(!registry.any_loading());
}

#[test]
fn mark_error_records_failure_until_next_load() {
    let mut registry = StageRegistry::new();
    registry.register("list", noop_loader()).expect("register");
    registry.mark_loading("list").expect("loading");

    let err = LoadError::Network {
        cause: "502 Bad Gateway".into(),
        status: Some(502),
    };
    registry.mark_error("list", err.clone()).expect("error");
    let stage = registry.get("list").expect("stage");
    assert_eq!(stage.state(), StageState::Failed);
    assert!(!stage.is_loaded());
    assert_eq!(stage.last_error(), Some(&err));

    registry.mark_loading("list").expect("retry");
    assert!(registry.get("list").expect("stage").last_error().is_none());
}

#[test]
fn transitions_on_unknown_stage_fail() {
    let mut registry = StageRegistry::new();
    assert_eq!(
        registry.mark_loading("audit"),
        Err(LoadError::UnknownStage("audit".into()))
    );
    assert!(registry.reset("audit").is_err());
}

#[test]
fn names_follow_registration_order() {
    let mut registry = StageRegistry::new();
    for name in ["list", "enums", "modalDetail"] {
        registry.register(name, noop_loader()).expect("register");
    }
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["list", "enums", "modalDetail"]
    );
}

#[test]
fn abandon_loading_restores_previous_state() {
    let mut registry = StageRegistry::new();
    for name in ["list", "enums", "modalDetail"] {
        registry.register(name, noop_loader()).expect("register");
    }
    registry.mark_loading("list").expect("loading");
    registry.mark_loaded("list").expect("loaded");
    registry.mark_loading("list").expect("reload");

    let err = LoadError::Network {
        cause: "503 Service Unavailable".into(),
        status: Some(503),
    };
    registry.mark_loading("enums").expect("loading");
    registry.mark_error("enums", err.clone()).expect("error");
    registry.mark_loading("enums").expect("retry");

    registry.mark_loading("modalDetail").expect("loading");

    assert_eq!(registry.abandon_loading(), 3);
    assert!(!registry.any_loading());
    let state = |name| registry.get(name).expect("stage").state();
    assert_eq!(state("list"), StageState::Loaded);
    assert_eq!(state("enums"), StageState::Failed);
    assert_eq!(state("modalDetail"), StageState::Unstarted);
    assert_eq!(registry.get("enums").expect("stage").last_error(), Some(&err));

    assert_eq!(registry.abandon_loading(), 0);
}
