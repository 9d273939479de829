//! End-to-end tests for the debug session facade: one event per `stream`
//! call, pause/resume across segments, disposal, and state reporting.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use breakline_debug::{DebugSession, ExecutionEvent, StreamOptions};
use breakline_runtime::harness::{Function, ScriptDelegate, Step};
use breakline_runtime::value::Value;

fn project_root() -> PathBuf {
    std::env::temp_dir().join("breakline-session-tests")
}

fn main_file() -> PathBuf {
    project_root().join("main.flow")
}

fn linear_program() -> ScriptDelegate {
    ScriptDelegate::new(
        "main",
        vec![Function::new(
            "main",
            main_file(),
            vec![
                Step::run(2, |s| {
                    let v = s.input_int("value", 10);
                    s.set("x", v);
                }),
                Step::run(3, |s| {
                    let x = s.int("x");
                    s.set("y", x * 2);
                }),
                Step::run(4, |s| {
                    let y = s.int("y");
                    s.set("z", y + 5);
                }),
                Step::run(5, |s| {
                    let z = s.int("z");
                    s.ret(Value::Map(
                        [("result".to_string(), Value::Int(z))].into_iter().collect(),
                    ));
                }),
            ],
        )],
    )
}

/// Drive a session to its terminal event, re-invoking `stream` with
/// `resume = true` after every yielded event, the way a bridge would.
async fn drive(
    session: &mut DebugSession<ScriptDelegate>,
    input: &serde_json::Value,
    tokens: &[&str],
) -> Vec<ExecutionEvent> {
    let mut events = vec![
        session
            .stream(input, StreamOptions::with_breakpoints(tokens.to_vec()))
            .await,
    ];
    while !events.last().unwrap().is_terminal() {
        events.push(
            session
                .stream(input, StreamOptions::resuming(tokens.to_vec()))
                .await,
        );
    }
    events
}

#[tokio::test]
async fn breakpoint_reports_locals_then_result() {
    let mut session = DebugSession::new(linear_program());
    let events = drive(&mut session, &json!({"value": 7}), &["3"]).await;

    assert_eq!(events.len(), 2);
    match &events[0] {
        ExecutionEvent::Breakpoint { frame } => {
            assert_eq!(frame.line, 3);
            assert_eq!(frame.function, "main");
            assert_eq!(frame.locals.len(), 1);
            assert_eq!(frame.locals.get("x"), Some(&json!(7)));
        }
        other => panic!("expected breakpoint, got {other:?}"),
    }
    assert_eq!(
        events[1],
        ExecutionEvent::Completed {
            output: json!({"result": 19})
        }
    );
    assert!(!session.is_active());
}

#[tokio::test]
async fn breakpoints_fire_in_order_and_see_only_assigned_locals() {
    let delegate = ScriptDelegate::new(
        "main",
        vec![Function::new(
            "main",
            main_file(),
            vec![
                Step::run(2, |s| s.set("a", 1)),
                Step::run(3, |s| s.set("b", 2)),
                Step::run(4, |s| s.set("c", 3)),
                Step::run(5, |s| s.set("d", 4)),
                Step::run(6, |s| {
                    let total = s.int("a") + s.int("b") + s.int("c") + s.int("d");
                    s.ret(Value::Int(total));
                }),
            ],
        )],
    );
    let mut session = DebugSession::new(delegate);
    let events = drive(&mut session, &json!({}), &["3", "5"]).await;

    assert_eq!(events.len(), 3);
    match (&events[0], &events[1]) {
        (
            ExecutionEvent::Breakpoint { frame: first },
            ExecutionEvent::Breakpoint { frame: second },
        ) => {
            assert_eq!(first.line, 3);
            assert!(first.locals.contains_key("a"));
            assert!(!first.locals.contains_key("b"));
            assert_eq!(second.line, 5);
            assert!(second.locals.contains_key("c"));
            assert!(!second.locals.contains_key("d"));
        }
        other => panic!("expected two breakpoints, got {other:?}"),
    }
    assert_eq!(events[2], ExecutionEvent::Completed { output: json!(10) });
}

#[tokio::test]
async fn step_mode_pauses_every_statement_and_preserves_the_result() {
    let input = json!({"value": 7});
    let mut session = DebugSession::new(linear_program());
    let uninstrumented = session.execute(&input).await.unwrap();

    let events = drive(&mut session, &input, &["*"]).await;
    let pauses = events
        .iter()
        .filter(|event| matches!(event, ExecutionEvent::Breakpoint { .. }))
        .count();
    assert!(pauses >= 3, "expected at least 3 pauses, got {pauses}");
    assert_eq!(
        events.last(),
        Some(&ExecutionEvent::Completed {
            output: uninstrumented
        })
    );
}

#[tokio::test]
async fn bounce_back_onto_the_outer_line_pauses_once() {
    let delegate = ScriptDelegate::new(
        "main",
        vec![
            Function::new(
                "main",
                main_file(),
                vec![
                    // result = outer(inner(1)) spanning lines 5-9; the
                    // engine re-enters line 5 after each nested call.
                    Step::call_bind(5, "inner", "tmp", |_, _| {
                        vec![("v".into(), Value::Int(1))]
                    }),
                    Step::call_bind(5, "outer", "result", |locals, _| {
                        vec![("v".into(), locals["tmp"].clone())]
                    }),
                    Step::touch(5),
                    Step::run(10, |s| s.ret(Value::Int(s.int("result")))),
                ],
            ),
            Function::new(
                "inner",
                project_root().join("nested.flow"),
                vec![Step::run(20, |s| {
                    let v = s.int("v");
                    s.ret(Value::Int(v + 1));
                })],
            ),
            Function::new(
                "outer",
                project_root().join("nested.flow"),
                vec![Step::run(30, |s| {
                    let v = s.int("v");
                    s.ret(Value::Int(v * 10));
                })],
            ),
        ],
    );
    let mut session = DebugSession::new(delegate);
    let events = drive(&mut session, &json!({}), &["5"]).await;

    let pauses = events
        .iter()
        .filter(|event| matches!(event, ExecutionEvent::Breakpoint { .. }))
        .count();
    assert_eq!(pauses, 1);
    assert_eq!(
        events.last(),
        Some(&ExecutionEvent::Completed { output: json!(20) })
    );
}

#[tokio::test]
async fn no_breakpoints_takes_the_uninstrumented_fast_path() {
    let mut session = DebugSession::builder(linear_program())
        .state_anchor("main")
        .build();
    let event = session.stream(&json!({"value": 7}), StreamOptions::default()).await;
    // A single terminal event: no state updates, no pauses.
    assert_eq!(
        event,
        ExecutionEvent::Completed {
            output: json!({"result": 19})
        }
    );
    assert!(!session.is_active());
}

#[tokio::test]
async fn resume_continues_without_reexecuting_passed_statements() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let (first_effect, second_effect) = (first.clone(), second.clone());
    let delegate = ScriptDelegate::new(
        "main",
        vec![Function::new(
            "main",
            main_file(),
            vec![
                Step::run(2, move |s| {
                    first_effect.fetch_add(1, Ordering::SeqCst);
                    s.set("x", 1);
                }),
                Step::run(3, move |s| {
                    second_effect.fetch_add(1, Ordering::SeqCst);
                    let x = s.int("x");
                    s.ret(Value::Int(x));
                }),
            ],
        )],
    );
    let mut session = DebugSession::new(delegate);
    let events = drive(&mut session, &json!({}), &["3"]).await;

    assert_eq!(events.len(), 2);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resume_replaces_the_breakpoint_spec_wholesale() {
    let delegate = ScriptDelegate::new(
        "main",
        vec![Function::new(
            "main",
            main_file(),
            vec![
                Step::run(2, |s| s.set("a", 1)),
                Step::run(3, |s| s.set("b", 2)),
                Step::run(4, |s| s.set("c", 3)),
                Step::run(5, |s| s.ret(Value::Int(s.int("a")))),
            ],
        )],
    );
    let mut session = DebugSession::new(delegate);
    let input = json!({});

    let first = session
        .stream(&input, StreamOptions::with_breakpoints(["3", "4"]))
        .await;
    match &first {
        ExecutionEvent::Breakpoint { frame } => assert_eq!(frame.line, 3),
        other => panic!("expected breakpoint, got {other:?}"),
    }

    // Replacing with line 5 drops line 4 entirely.
    let second = session.stream(&input, StreamOptions::resuming(["5"])).await;
    match &second {
        ExecutionEvent::Breakpoint { frame } => assert_eq!(frame.line, 5),
        other => panic!("expected breakpoint, got {other:?}"),
    }

    let last = session
        .stream(&input, StreamOptions::resuming(Vec::<String>::new()))
        .await;
    assert!(last.is_terminal());
}

#[tokio::test]
async fn delegate_failure_arrives_as_a_failed_event_and_clears_the_session() {
    let delegate = ScriptDelegate::new(
        "main",
        vec![Function::new(
            "main",
            main_file(),
            vec![Step::run(2, |s| s.set("x", 1)), Step::fail(3, "boom")],
        )],
    );
    let mut session = DebugSession::new(delegate);
    let events = drive(&mut session, &json!({}), &["2"]).await;

    assert_eq!(events.len(), 2);
    match &events[1] {
        ExecutionEvent::Failed { error } => assert!(error.contains("boom")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!session.is_active());

    // A subsequent unrelated run starts clean.
    let event = session.stream(&json!({}), StreamOptions::default()).await;
    assert!(matches!(event, ExecutionEvent::Failed { .. }));
}

#[tokio::test]
async fn dispose_is_idempotent_and_unblocks_a_paused_worker() {
    let tail = Arc::new(AtomicUsize::new(0));
    let tail_effect = tail.clone();
    let delegate = ScriptDelegate::new(
        "main",
        vec![Function::new(
            "main",
            main_file(),
            vec![
                Step::run(2, |s| s.set("x", 1)),
                Step::run(3, move |_| {
                    tail_effect.fetch_add(1, Ordering::SeqCst);
                }),
            ],
        )],
    );
    let mut session = DebugSession::new(delegate);

    // Disposing before anything started is a no-op.
    session.dispose();

    let event = session
        .stream(&json!({}), StreamOptions::with_breakpoints(["3"]))
        .await;
    assert!(matches!(event, ExecutionEvent::Breakpoint { .. }));

    session.dispose();
    session.dispose();
    assert!(!session.is_active());
    assert_eq!(tail.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn state_updates_report_user_calls_and_skip_wrappers_and_libraries() {
    let helper_file = project_root().join("helpers.flow");
    let delegate = ScriptDelegate::new(
        "main",
        vec![
            Function::new(
                "main",
                main_file(),
                vec![
                    Step::call_bind(2, "traced_scale", "a", |_, _| {
                        vec![("v".into(), Value::Int(5))]
                    }),
                    Step::call(3, "json_dump", |locals, _| {
                        vec![("data".into(), locals["a"].clone())]
                    }),
                    Step::run(4, |s| s.ret(Value::Int(s.int("a")))),
                ],
            ),
            Function::wrapper("traced_scale", main_file(), 90, "scale"),
            Function::new(
                "scale",
                helper_file,
                vec![Step::run(10, |s| {
                    let v = s.int("v");
                    s.ret(Value::Int(v * 2));
                })],
            ),
            Function::new(
                "json_dump",
                project_root().join("site-packages/json/codec.flow"),
                vec![Step::run(70, |_| {})],
            ),
        ],
    );
    let mut session = DebugSession::builder(delegate)
        .project_root(project_root())
        .state_anchor("main")
        .call_graph(["scale", "traced_scale"])
        .build();

    let events = drive(&mut session, &json!({}), &["*"]).await;

    let nodes: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            ExecutionEvent::StateUpdate { node, .. } => Some(node.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(nodes, vec!["main", "scale"]);

    // The state update for a call precedes any breakpoint inside it.
    let scale_state = events
        .iter()
        .position(|event| matches!(event, ExecutionEvent::StateUpdate { node, .. } if node == "scale"))
        .unwrap();
    let scale_break = events
        .iter()
        .position(
            |event| matches!(event, ExecutionEvent::Breakpoint { frame } if frame.line == 10),
        )
        .unwrap();
    assert!(scale_state < scale_break);
}

#[tokio::test]
async fn without_an_anchor_the_state_reporter_is_inert() {
    let mut session = DebugSession::new(linear_program());
    let events = drive(&mut session, &json!({}), &["*"]).await;
    assert!(events
        .iter()
        .all(|event| !matches!(event, ExecutionEvent::StateUpdate { .. })));
}

#[tokio::test]
async fn execute_passes_straight_through_to_the_delegate() {
    let session = DebugSession::new(linear_program());
    let output = session.execute(&json!({"value": 3})).await.unwrap();
    assert_eq!(output, json!({"result": 11}));
}
