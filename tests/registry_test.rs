//! The asset registry contract: at-most-once completion, silent failure,
//! and no partial state from loads that never resolve.

use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;

use vignette::assets::{AssetServer, Dispatch, Mutation};
use vignette::panel::Panel;

struct ChannelDispatch(Mutex<Sender<Mutation>>);

impl Dispatch for ChannelDispatch {
    fn dispatch(&self, mutation: Mutation) {
        let _ = self.0.lock().unwrap().send(mutation);
    }
}

fn mk_server() -> (AssetServer, Receiver<Mutation>, tokio::runtime::Runtime) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (tx, rx) = channel();
    let server = AssetServer::new(
        std::sync::Arc::new(ChannelDispatch(Mutex::new(tx))),
        runtime.handle().clone(),
    );
    (server, rx, runtime)
}

#[test]
fn a_successful_load_completes_exactly_once() {
    let (server, rx, _runtime) = mk_server();

    server.spawn(
        "payload",
        async { Ok::<_, anyhow::Error>(42u32) },
        |value, _ctx, _state, _panel| assert_eq!(value, 42),
    );

    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn a_failed_load_dispatches_nothing() {
    let (server, rx, _runtime) = mk_server();

    server.spawn(
        "missing",
        async { Err::<u32, _>(anyhow::anyhow!("no such file")) },
        |_value, _ctx, _state, _panel| panic!("a failed load must not apply"),
    );

    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn a_load_that_never_resolves_leaves_no_bindings_behind() {
    let (server, rx, _runtime) = mk_server();
    let panel = Panel::new("Controls");

    server.spawn(
        "stuck",
        futures::future::pending::<anyhow::Result<u32>>(),
        |_value, _ctx, _state, panel| {
            panel.group("stuck").action("noop", |_| {});
        },
    );

    // The apply callback is the only thing that registers bindings; with no
    // completion the panel must stay exactly as it was.
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert!(panel.is_empty());
    assert!(!panel.has_group("stuck"));
}

#[test]
fn completions_from_concurrent_loads_all_arrive() {
    let (server, rx, _runtime) = mk_server();

    for i in 0..8u32 {
        server.spawn(
            format!("load-{i}"),
            async move { Ok::<_, anyhow::Error>(i) },
            |_value, _ctx, _state, _panel| {},
        );
    }

    // Order is unspecified; only the count is guaranteed.
    for _ in 0..8 {
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}
