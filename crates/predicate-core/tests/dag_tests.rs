// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use bytes::Bytes;
use predicate_core::{
    Arguments, Arity, Call, CallFactory, Context, CustomCall, EvalError, Field, Literal,
    MergeGraph, Node, RequestLine, Transaction, TxId, Value, ValueError,
};
use std::sync::Arc;

/// Zero-or-more-child call that always yields the same named field.
struct DummyCall;

impl CustomCall for DummyCall {
    fn name(&self) -> &str {
        "dummy_call"
    }

    fn calculate(&self, _args: &mut Arguments<'_, '_, '_>) -> Result<Value, EvalError> {
        Ok(Value::from(Field::byte_string("dummy", "value")))
    }
}

fn transaction() -> Transaction {
    Transaction::new(
        TxId::from_raw(1),
        RequestLine::new("GET", "/", "HTTP/1.1").expect("request line"),
    )
}

#[test]
fn node_value_requires_eval_and_reset_clears_it() {
    let mut graph = MergeGraph::new();
    let dummy = graph
        .register(Node::call(Call::Custom(Arc::new(DummyCall)), vec![]).expect("node"))
        .expect("register");
    let node = graph.node(dummy).expect("live");
    assert_eq!(node.to_s(), "(dummy_call)");
    assert!(node.children().is_empty());
    assert!(node.parents().is_empty());

    let tx = transaction();
    let mut ctx = Context::new(&tx);
    assert!(!graph.has_value(dummy, &ctx));
    assert_eq!(graph.value(dummy, &ctx), Err(ValueError::NotAvailable(dummy)));

    let value = graph.eval(dummy, &mut ctx).expect("eval");
    assert_eq!(value.as_bytes().map(Bytes::as_ref), Some(&b"value"[..]));
    assert!(graph.has_value(dummy, &ctx));

    // Custom calls without transaction reads are static: the cache lives in the graph.
    graph.reset(dummy).expect("reset");
    assert!(!graph.has_value(dummy, &ctx));
}

#[test]
fn string_literal_is_static_and_evaluates_without_transaction() {
    let mut graph = MergeGraph::new();
    let node = graph.register(Node::literal(Literal::string("node"))).expect("register");
    assert_eq!(graph.to_s(node).expect("live"), "'node'");
    assert!(graph.node(node).expect("live").is_static());
    let value = graph.eval(node, &mut Context::detached()).expect("eval");
    assert_eq!(value.as_bytes().map(Bytes::as_ref), Some(&b"node"[..]));
}

#[test]
fn literal_values_agree_across_contexts() {
    let mut graph = MergeGraph::new();
    let lit = graph.register(Node::literal(Literal::string("x"))).expect("register");
    let tx = transaction();
    let a = graph.eval(lit, &mut Context::new(&tx)).expect("eval");
    let b = graph.eval(lit, &mut Context::detached()).expect("eval");
    assert_eq!(a, b);
}

#[test]
fn call_rendering_includes_children() {
    let mut factory = CallFactory::with_standard();
    factory.register_custom(Arc::new(DummyCall)).expect("register dummy");
    let mut graph = MergeGraph::new();
    let inner = graph.register(factory.create("dummy_call", vec![]).expect("create")).expect("register");
    let foo = graph.register(Node::literal(Literal::string("foo"))).expect("register");
    let outer = graph
        .register(factory.create("dummy_call", vec![inner, foo]).expect("create"))
        .expect("register");
    assert_eq!(graph.to_s(outer).expect("live"), "(dummy_call (dummy_call) 'foo')");
    assert_eq!(format!("{}", graph.display(outer).expect("live")), "(dummy_call (dummy_call) 'foo')");
    assert_eq!(Call::Custom(Arc::new(DummyCall)).arity(), Arity::AtLeast(0));
}

#[test]
fn null_renders_and_is_falsy() {
    let mut graph = MergeGraph::new();
    let null = graph.register(Node::literal(Literal::Null)).expect("register");
    assert_eq!(graph.to_s(null).expect("live"), "null");
    assert!(graph.node(null).expect("live").is_static());
    assert!(!graph.eval(null, &mut Context::detached()).expect("eval").is_truthy());
}

#[test]
fn field_reads_transaction_and_is_dynamic() {
    let factory = CallFactory::with_standard();
    let mut graph = MergeGraph::new();
    let name = graph.register(Node::literal(Literal::string("request_method"))).expect("register");
    let field = graph.register(factory.create("field", vec![name]).expect("create")).expect("register");
    assert!(!graph.node(field).expect("live").is_static());
    let not = graph.register(factory.create("not", vec![field]).expect("create")).expect("register");
    assert!(!graph.node(not).expect("live").is_static(), "dynamic children make a call dynamic");

    let tx = transaction();
    let mut ctx = Context::new(&tx);
    let value = graph.eval(field, &mut ctx).expect("eval");
    assert_eq!(value.as_bytes().map(Bytes::as_ref), Some(&b"GET"[..]));
    assert!(!graph.eval(not, &mut ctx).expect("eval").is_truthy());
    assert_eq!(ctx.len(), 2);

    let missing = graph.register(Node::literal(Literal::string("nope"))).expect("register");
    let absent = graph.register(factory.create("field", vec![missing]).expect("create")).expect("register");
    assert!(graph.eval(absent, &mut ctx).expect("eval").is_null());
}
