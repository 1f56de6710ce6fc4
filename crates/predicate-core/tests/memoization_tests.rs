// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use predicate_core::{
    Arguments, CallFactory, Context, CustomCall, EvalError, Expr, Field, MergeGraph, NodeId,
    RequestLine, Transaction, TxId, Value,
};

/// Echoes a transaction field and counts how often it is calculated.
struct Counting {
    calls: Arc<AtomicUsize>,
    dynamic: bool,
}

impl CustomCall for Counting {
    fn name(&self) -> &str {
        if self.dynamic {
            "count_dynamic"
        } else {
            "count_static"
        }
    }

    fn reads_transaction(&self) -> bool {
        self.dynamic
    }

    fn calculate(&self, args: &mut Arguments<'_, '_, '_>) -> Result<Value, EvalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.dynamic {
            return Ok(Value::truthy());
        }
        let node = args.node();
        let tx = args.transaction().ok_or(EvalError::NoTransaction { node })?;
        Ok(Value::from(tx.field("request_uri")))
    }
}

struct Fixture {
    graph: MergeGraph,
    dynamic: NodeId,
    fixed: NodeId,
    dynamic_calls: Arc<AtomicUsize>,
    static_calls: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
    let dynamic_calls = Arc::new(AtomicUsize::new(0));
    let static_calls = Arc::new(AtomicUsize::new(0));
    let mut factory = CallFactory::with_standard();
    factory
        .register_custom(Arc::new(Counting {
            calls: Arc::clone(&dynamic_calls),
            dynamic: true,
        }))
        .expect("register");
    factory
        .register_custom(Arc::new(Counting {
            calls: Arc::clone(&static_calls),
            dynamic: false,
        }))
        .expect("register");
    let mut graph = MergeGraph::new();
    let dynamic = Expr::call("count_dynamic", vec![])
        .build(&mut graph, &factory, 8)
        .expect("build");
    let fixed = Expr::call("count_static", vec![])
        .build(&mut graph, &factory, 8)
        .expect("build");
    Fixture {
        graph,
        dynamic,
        fixed,
        dynamic_calls,
        static_calls,
    }
}

fn transaction(id: u64, uri: &str) -> Transaction {
    Transaction::new(
        TxId::from_raw(id),
        RequestLine::new("GET", uri.to_owned(), "HTTP/1.1").expect("line"),
    )
}

#[test]
fn dynamic_eval_is_memoized_per_context() {
    let f = fixture();
    let tx = transaction(1, "/a");
    let mut ctx = Context::new(&tx);

    let first = f.graph.eval(f.dynamic, &mut ctx).expect("eval");
    let second = f.graph.eval(f.dynamic, &mut ctx).expect("eval");
    assert_eq!(first, second);
    assert_eq!(f.dynamic_calls.load(Ordering::SeqCst), 1);

    ctx.reset(f.dynamic);
    assert!(!f.graph.has_value(f.dynamic, &ctx));
    f.graph.eval(f.dynamic, &mut ctx).expect("eval");
    assert_eq!(f.dynamic_calls.load(Ordering::SeqCst), 2);

    // A fresh context starts with an empty memo.
    let mut other = Context::new(&tx);
    f.graph.eval(f.dynamic, &mut other).expect("eval");
    assert_eq!(f.dynamic_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn static_eval_is_shared_across_contexts() {
    let mut f = fixture();
    let a = transaction(1, "/a");
    let b = transaction(2, "/b");
    f.graph.eval(f.fixed, &mut Context::new(&a)).expect("eval");
    f.graph.eval(f.fixed, &mut Context::new(&b)).expect("eval");
    f.graph.eval_static(f.fixed).expect("eval");
    assert_eq!(f.static_calls.load(Ordering::SeqCst), 1);

    f.graph.reset(f.fixed).expect("reset");
    f.graph.eval(f.fixed, &mut Context::detached()).expect("eval");
    assert_eq!(f.static_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_transactions_share_one_graph() {
    let f = fixture();
    let graph = &f.graph;
    let uris: Vec<String> = (0..8).map(|i| format!("/path/{i}")).collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = uris
            .iter()
            .enumerate()
            .map(|(i, uri)| {
                scope.spawn(move || {
                    let tx = transaction(i as u64, uri);
                    let mut ctx = Context::new(&tx);
                    let dynamic = graph.eval(f.dynamic, &mut ctx).expect("eval");
                    let fixed = graph.eval(f.fixed, &mut ctx).expect("eval");
                    (dynamic, fixed)
                })
            })
            .collect();
        for (handle, uri) in handles.into_iter().zip(&uris) {
            let (dynamic, fixed) = handle.join().expect("thread");
            assert_eq!(
                dynamic,
                Value::from(Field::byte_string("request_uri", Bytes::from(uri.clone())))
            );
            assert!(fixed.is_truthy());
        }
    });

    assert_eq!(f.dynamic_calls.load(Ordering::SeqCst), uris.len());
    // Racing first computations may each calculate; every thread still sees one value.
    let static_calls = f.static_calls.load(Ordering::SeqCst);
    assert!((1..=uris.len()).contains(&static_calls));
}
