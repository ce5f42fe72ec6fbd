//! Request lifecycle tests
//!
//! Drives the orchestrator the way a web layer would: render a form, submit
//! it, follow the redirect, reload.

use formgate_concurrency::{capture_versions, checked_write, RowRef};
use formgate_core::{
    FormgateError, Message, RowIdentity, SessionId, TenantScope, Value, VersionVector,
    CONTEXT_ID_PARAM, TRANSACTION_TOKEN_PARAM,
};
use formgate_engine::{
    ActionKind, FormgateConfig, IncomingRequest, Outcome, PageHandler, RedirectUrl,
    RequestLifecycleOrchestrator, RequiredRule, StaticMetadata, DATA_CHANGED_CODE,
    DUPLICATE_SUBMISSION_CODE, REQUIRED_CODE,
};
use formgate_session::{ContextId, MemorySessionStore, SessionRegistry};
use formgate_storage::{MemoryRowStore, RowStore, StoredRow, TableSchema};
use parking_lot::Mutex;
use std::sync::{Arc, Barrier};
use std::thread;

const LIST: &str = "/orders";
const EDIT: &str = "/orders/edit";

fn orchestrator() -> RequestLifecycleOrchestrator {
    let metadata = StaticMetadata::new()
        .field("order", "customer", "Customer", RequiredRule::Always)
        .field("order", "note", "Note", RequiredRule::Never);
    RequestLifecycleOrchestrator::new(
        &FormgateConfig::default(),
        Arc::new(SessionRegistry::new(Arc::new(MemorySessionStore::new()))),
        Arc::new(metadata),
    )
    .unwrap()
}

fn edit_page() -> PageHandler {
    PageHandler::edit_pair(LIST, EDIT, "order")
}

fn sid() -> SessionId {
    SessionId::new("session-1")
}

fn render_token(outcome: &Outcome) -> String {
    outcome
        .as_render()
        .and_then(|r| r.transaction_token.clone())
        .expect("render with token")
}

fn redirect_context(outcome: &Outcome) -> ContextId {
    match outcome {
        Outcome::Redirect { context_id, .. } => context_id.clone(),
        other => panic!("expected redirect, got {:?}", other),
    }
}

// ============================================================================
// Post/redirect/get
// ============================================================================

#[test]
fn test_edit_fail_correct_redirect_reload() {
    let o = orchestrator();
    let page = edit_page();

    // render edit form: token t1, nothing inherited
    let first = o.handle_page(&page, IncomingRequest::page(sid(), EDIT));
    let t1 = render_token(&first);
    assert!(first.as_render().unwrap().messages.is_empty());

    // submit t1 without the required customer
    let failed = o.handle(
        &page,
        IncomingRequest::submit(sid(), EDIT)
            .with_token(Some(&t1))
            .with_param("note", "rush"),
        |_| panic!("action must not run when validation fails"),
    );
    let render = failed.as_render().expect("validation re-renders");
    assert_eq!(render.view, EDIT);
    assert_eq!(render.messages.len(), 1);
    let required = render.messages.iter().next().unwrap();
    assert_eq!(required.code, REQUIRED_CODE);
    assert_eq!(required.field.as_deref(), Some("customer"));
    assert_eq!(render.view_state.get("note"), Some(&Value::from("rush")));
    let t2 = render_token(&failed);
    assert_ne!(t1, t2);

    // t1 is spent
    let replay = o.handle_page(
        &page,
        IncomingRequest::submit(sid(), EDIT)
            .with_token(Some(&t1))
            .with_param("customer", "ACME"),
    );
    assert_eq!(
        replay.as_render().unwrap().messages.iter().next().unwrap().code,
        DUPLICATE_SUBMISSION_CODE
    );

    // corrected submit with t2
    let success = o.handle(
        &page,
        IncomingRequest::submit(sid(), EDIT)
            .with_token(Some(&t2))
            .with_param("customer", "ACME"),
        |scope| {
            scope.view_state().insert("savedCustomer", "ACME");
            scope.push_message(Message::success("i.saved", "Order saved"));
            Ok(())
        },
    );
    let c1 = redirect_context(&success);
    let url = RedirectUrl::parse(success.redirect_url().unwrap());
    assert_eq!(url.path(), LIST);
    assert_eq!(url.count(CONTEXT_ID_PARAM), 1);
    assert_eq!(url.count(TRANSACTION_TOKEN_PARAM), 0);

    // GET carrying c1 inherits view-state and the one-time message
    let landed = o.handle_page(&page, IncomingRequest::page(sid(), LIST).with_context(&c1));
    let render = landed.as_render().unwrap();
    assert_eq!(render.view, LIST);
    assert_eq!(render.view_state.get("savedCustomer"), Some(&Value::from("ACME")));
    assert_eq!(render.messages.len(), 1);
    assert_eq!(render.messages.iter().next().unwrap().code, "i.saved");
    assert!(render.transaction_token.is_none());

    // reload with the same c1: nothing inherited
    let reload = o.handle_page(&page, IncomingRequest::page(sid(), LIST).with_context(&c1));
    let render = reload.as_render().unwrap();
    assert!(render.view_state.is_empty());
    assert!(render.messages.is_empty());
}

#[test]
fn test_current_request_wins_over_inherited() {
    let o = orchestrator();
    let page = PageHandler::single_form("/profile", "profile");
    let t = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), "/profile")));

    let saved = o.handle(
        &page,
        IncomingRequest::submit(sid(), "/profile").with_token(Some(&t)),
        |scope| {
            scope.view_state().insert("tab", "address");
            scope.view_state().insert("theme", "dark");
            scope.push_message(Message::success("i.saved", "Saved"));
            Ok(())
        },
    );
    let c = redirect_context(&saved);

    let mut current = formgate_core::ViewState::new();
    current.insert("tab", "security");
    let landed = o.handle_page(
        &page,
        IncomingRequest::page(sid(), "/profile")
            .with_context(&c)
            .with_view_state(current)
            .with_message(Message::info("i.fresh", "Fresh")),
    );
    let render = landed.as_render().unwrap();
    assert_eq!(render.view_state.get("tab"), Some(&Value::from("security")));
    assert_eq!(render.view_state.get("theme"), Some(&Value::from("dark")));
    assert_eq!(render.messages.len(), 1);
    assert_eq!(render.messages.iter().next().unwrap().code, "i.fresh");
}

#[test]
fn test_validation_failure_stacks_after_inherited_messages() {
    let o = orchestrator();
    let page = edit_page();

    let t1 = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), EDIT)));
    let saved = o.handle(
        &page,
        IncomingRequest::submit(sid(), EDIT)
            .with_token(Some(&t1))
            .with_param("customer", "ACME"),
        |scope| {
            scope.push_message(Message::success("i.saved", "Order saved"));
            Ok(())
        },
    );
    let c1 = redirect_context(&saved);

    // the next submit carries c1 and leaves the customer out
    let t2 = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), EDIT)));
    let failed = o.handle(
        &page,
        IncomingRequest::submit(sid(), EDIT)
            .with_token(Some(&t2))
            .with_context(&c1)
            .with_param("note", "rush"),
        |_| panic!("action must not run when validation fails"),
    );
    let render = failed.as_render().expect("validation re-renders");
    assert_eq!(render.view, EDIT);
    let codes: Vec<&str> = render.messages.iter().map(|m| m.code.as_str()).collect();
    assert_eq!(codes, vec!["i.saved", REQUIRED_CODE]);
    assert!(render.transaction_token.is_some());
}

#[test]
fn test_unknown_context_degrades_silently() {
    let o = orchestrator();
    let outcome = o.handle_page(
        &edit_page(),
        IncomingRequest::page(sid(), LIST).with_context(&ContextId::new("never-saved")),
    );
    let render = outcome.as_render().expect("plain render");
    assert!(render.view_state.is_empty());
}

#[test]
fn test_search_list_pair_redirects_without_token() {
    let o = orchestrator();
    let page = PageHandler::search_list_pair("/orders/search", LIST, "criteria");

    let search = o.handle(
        &page,
        IncomingRequest::new(sid(), "/orders/search", ActionKind::Search)
            .with_param("q", "acme")
            .with_param(CONTEXT_ID_PARAM, "stale"),
        |scope| {
            let q = scope.param("q").and_then(Value::as_str).unwrap_or_default().to_string();
            scope.redirect_param("q", q);
            Ok(())
        },
    );
    let url = RedirectUrl::parse(search.redirect_url().expect("search redirects"));
    assert_eq!(url.path(), LIST);
    assert_eq!(url.get("q"), Some("acme"));
    assert_eq!(url.count(CONTEXT_ID_PARAM), 1);
    assert_ne!(url.get(CONTEXT_ID_PARAM), Some("stale"));

    let list = o.handle_page(&page, IncomingRequest::page(sid(), LIST));
    assert!(list.as_render().unwrap().transaction_token.is_none());
}

// ============================================================================
// Forward, duplicate, data-changed, fatal
// ============================================================================

#[test]
fn test_forward_replays_consumed_token() {
    let o = orchestrator();
    let page = edit_page();
    let t = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), EDIT)));
    let submit = IncomingRequest::submit(sid(), EDIT)
        .with_token(Some(&t))
        .with_param("customer", "ACME");

    assert!(o.handle_page(&page, submit.clone()).redirect_url().is_some());
    assert!(o.handle_page(&page, submit.clone().forwarded()).redirect_url().is_some());
    assert!(o.handle_page(&page, submit).as_render().is_some());
}

#[test]
fn test_missing_token_is_duplicate_once_tokens_exist() {
    let o = orchestrator();
    let page = edit_page();
    o.handle_page(&page, IncomingRequest::page(sid(), EDIT));

    let outcome = o.handle_page(
        &page,
        IncomingRequest::submit(sid(), EDIT).with_param("customer", "ACME"),
    );
    let render = outcome.as_render().unwrap();
    assert_eq!(render.messages.iter().next().unwrap().code, DUPLICATE_SUBMISSION_CODE);
}

#[test]
fn test_stale_edit_renders_data_changed() {
    let o = orchestrator();
    let page = edit_page();
    let rows = MemoryRowStore::new();
    rows.register(TableSchema::new("orders").soft_delete());
    rows.begin()
        .insert(
            StoredRow::new("orders", RowIdentity::new("o1", TenantScope::new("t1")))
                .with_field("customer", "ACME"),
        )
        .unwrap();
    // both tabs render the edit form against the same version
    let rendered = capture_versions(&rows.begin(), &[RowRef::new("orders", "o1")]).unwrap();
    let tab_a = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), EDIT)));
    let tab_b = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), EDIT)));

    let save = |token: &str, customer: &str| {
        let client = rendered.clone();
        let rows = rows.clone();
        let customer = customer.to_string();
        let participants = [RowRef::new("orders", "o1")];
        o.handle(
            &page,
            IncomingRequest::submit(sid(), EDIT)
                .with_token(Some(token))
                .with_param("customer", customer.as_str()),
            move |_scope| {
                let mut uow = rows.begin_scoped(&TenantScope::new("t1"));
                checked_write(&mut uow, &participants, Some(&client), |uow, checked| {
                    let mut row = checked.lead().cloned().expect("lead row");
                    let expected = row.version.clone();
                    row.fields.insert("customer".into(), customer.as_str().into());
                    uow.update(row, &expected)
                })
                .map(|_| ())
            },
        )
    };

    assert!(save(&tab_a, "Initech").redirect_url().is_some());
    let stale = save(&tab_b, "Globex");
    let render = stale.as_render().expect("data-changed re-renders");
    assert_eq!(render.view, EDIT);
    assert_eq!(render.messages.iter().last().unwrap().code, DATA_CHANGED_CODE);
    assert!(render.transaction_token.is_some());
    assert_eq!(
        rows.physical_row("orders", "o1").unwrap().fields.get("customer"),
        Some(&Value::from("Initech"))
    );
}

#[test]
fn test_missing_version_vector_is_fatal() {
    let o = orchestrator();
    let page = edit_page();
    let rows = MemoryRowStore::new();
    rows.register(TableSchema::new("orders"));
    rows.begin()
        .insert(StoredRow::new("orders", RowIdentity::new("o1", TenantScope::new("t1"))))
        .unwrap();
    let t = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), EDIT)));

    let outcome = o.handle(
        &page,
        IncomingRequest::submit(sid(), EDIT)
            .with_token(Some(&t))
            .with_param("customer", "ACME"),
        |_| {
            let mut uow = rows.begin();
            checked_write(&mut uow, &[RowRef::new("orders", "o1")], None, |_, _| Ok(()))
        },
    );
    match outcome {
        Outcome::ErrorPage { message, .. } => assert_eq!(message.code, "e.genericFailure"),
        other => panic!("expected error page, got {:?}", other),
    }
}

#[test]
fn test_empty_version_vectors_match() {
    let rows = MemoryRowStore::new();
    let mut uow = rows.begin();
    let checked = checked_write(&mut uow, &[], Some(&VersionVector::new()), |_, checked| {
        Ok(checked.versions.len())
    });
    assert_eq!(checked, Ok(0));
}

#[test]
fn test_store_failure_is_fatal() {
    let o = orchestrator();
    let page = PageHandler::single_form("/profile", "profile");
    let t = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), "/profile")));
    let outcome = o.handle(
        &page,
        IncomingRequest::submit(sid(), "/profile").with_token(Some(&t)),
        |_| Err(FormgateError::store("connection reset")),
    );
    assert!(outcome.is_error_page());
}

// ============================================================================
// Two tabs, one session
// ============================================================================

#[test]
fn test_concurrent_double_submit_one_wins() {
    const TABS: usize = 4;
    for _ in 0..10 {
        let o = Arc::new(orchestrator());
        let page = Arc::new(edit_page());
        let t = render_token(&o.handle_page(&page, IncomingRequest::page(sid(), EDIT)));
        let barrier = Arc::new(Barrier::new(TABS));
        let performed = Arc::new(Mutex::new(0usize));

        let handles: Vec<_> = (0..TABS)
            .map(|_| {
                let o = Arc::clone(&o);
                let page = Arc::clone(&page);
                let t = t.clone();
                let barrier = Arc::clone(&barrier);
                let performed = Arc::clone(&performed);
                thread::spawn(move || {
                    barrier.wait();
                    o.handle(
                        &page,
                        IncomingRequest::submit(sid(), EDIT)
                            .with_token(Some(&t))
                            .with_param("customer", "ACME"),
                        |_| {
                            *performed.lock() += 1;
                            Ok(())
                        },
                    )
                })
            })
            .collect();

        let outcomes: Vec<Outcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let redirects = outcomes.iter().filter(|o| o.redirect_url().is_some()).count();
        let duplicates = outcomes
            .iter()
            .filter_map(Outcome::as_render)
            .filter(|r| {
                r.messages
                    .iter()
                    .any(|m| m.code == DUPLICATE_SUBMISSION_CODE)
            })
            .count();
        assert_eq!(redirects, 1);
        assert_eq!(duplicates, TABS - 1);
        assert_eq!(*performed.lock(), 1);
    }
}
