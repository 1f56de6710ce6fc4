// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Standard operator library: `true`, `false`, `or`, `and`, `not`, `field`.
//!
//! `or` and `and` are abelian: their first transform sorts children by
//! rendering so that commutative variants of the same expression merge.
//! Literal children let the boolean operators fold to `''` (true) or `null`
//! (false) at load time.
use tracing::debug;

use crate::call::{Arguments, Call};
use crate::call_factory::CallFactory;
use crate::context::EvalError;
use crate::literal::Literal;
use crate::node::Node;
use crate::transform::{OptimizeError, TransformSite};
use crate::value::Value;

/// Registers the standard operators with `factory`.
///
/// Names already present are left alone.
pub fn load(factory: &mut CallFactory) {
    let ops: [(&str, fn() -> Call); 6] = [
        ("true", || Call::True),
        ("false", || Call::False),
        ("or", || Call::Or),
        ("and", || Call::And),
        ("not", || Call::Not),
        ("field", || Call::Field),
    ];
    for (name, make) in ops {
        if let Err(err) = factory.register(name, make) {
            debug!(op = name, %err, "keeping existing registration");
        }
    }
}

/// Computes the value of a call from its (lazily evaluated) children.
pub fn calculate(call: &Call, args: &mut Arguments<'_, '_, '_>) -> Result<Value, EvalError> {
    match call {
        Call::True => Ok(Value::truthy()),
        Call::False => Ok(Value::falsy()),
        Call::Or => {
            for i in 0..args.len() {
                if args.eval(i)?.is_truthy() {
                    return Ok(Value::truthy());
                }
            }
            Ok(Value::falsy())
        }
        Call::And => {
            for i in 0..args.len() {
                if !args.eval(i)?.is_truthy() {
                    return Ok(Value::falsy());
                }
            }
            Ok(Value::truthy())
        }
        Call::Not => Ok(Value::from_bool(!args.eval(0)?.is_truthy())),
        Call::Field => field(args),
        Call::Custom(custom) => custom.calculate(args),
    }
}

fn field(args: &mut Arguments<'_, '_, '_>) -> Result<Value, EvalError> {
    let node = args.node();
    let name = args.eval(0)?;
    let name = name
        .as_bytes()
        .and_then(|b| core::str::from_utf8(b).ok())
        .ok_or_else(|| EvalError::InvalidArgument {
            node,
            reason: "field name must be a UTF-8 string".to_owned(),
        })?;
    let tx = args.transaction().ok_or(EvalError::NoTransaction { node })?;
    Ok(Value::from(tx.field(name)))
}

/// Load-time rewrite for one call; returns `true` if the graph changed.
pub fn transform(call: &Call, site: &mut TransformSite<'_>) -> Result<bool, OptimizeError> {
    match call {
        Call::True => {
            site.replace_with_literal(Literal::truthy())?;
            Ok(true)
        }
        Call::False => {
            site.replace_with_literal(Literal::falsy())?;
            Ok(true)
        }
        // `or` is decided by any truthy literal, `and` by any falsy one.
        Call::Or => abelian(site, true),
        Call::And => abelian(site, false),
        Call::Not => {
            let Some(negated) = site.child_literal(0).map(|l| Literal::from_bool(!l.is_truthy()))
            else {
                return Ok(false);
            };
            site.replace_with_literal(negated)?;
            Ok(true)
        }
        Call::Field => {
            if !matches!(site.child_literal(0), Some(Literal::String(_))) {
                site.reporter()
                    .error("field name must be a string literal");
            }
            Ok(false)
        }
        Call::Custom(custom) => custom.transform(site),
    }
}

fn abelian(site: &mut TransformSite<'_>, decisive: bool) -> Result<bool, OptimizeError> {
    let mut changed = false;
    if !site.graph().node(site.node())?.is_ordered() {
        changed = site.order_children()?;
        // Reordering can make this node identical to one already live.
        if !site.is_alive() {
            return Ok(true);
        }
    }

    let children = site.children()?;
    let literal_truths: Vec<bool> = children
        .iter()
        .filter_map(|&c| site.graph().get(c).and_then(Node::as_literal))
        .map(Literal::is_truthy)
        .collect();
    if literal_truths.contains(&decisive) {
        site.replace_with_literal(Literal::from_bool(decisive))?;
        return Ok(true);
    }
    if literal_truths.len() == children.len() {
        site.replace_with_literal(Literal::from_bool(!decisive))?;
        return Ok(true);
    }
    Ok(changed)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::merge_graph::MergeGraph;

    fn build(g: &mut MergeGraph, f: &CallFactory, name: &str, children: Vec<crate::NodeId>) -> crate::NodeId {
        g.register(f.create(name, children).unwrap()).unwrap()
    }

    #[test]
    fn boolean_truth_tables() {
        let f = CallFactory::with_standard();
        let mut g = MergeGraph::new();
        let t = build(&mut g, &f, "true", vec![]);
        let n = g.register(Node::literal(Literal::Null)).unwrap();
        let mut ctx = Context::detached();
        for (name, children, expect) in [
            ("or", vec![t, n], true),
            ("or", vec![n, n], false),
            ("and", vec![t, n], false),
            ("and", vec![t, t], true),
            ("not", vec![n], true),
            ("not", vec![t], false),
        ] {
            let id = build(&mut g, &f, name, children);
            assert_eq!(g.eval(id, &mut ctx).unwrap().is_truthy(), expect, "{}", g.to_s(id).unwrap());
        }
    }

    #[test]
    fn load_keeps_existing_registrations() {
        let mut f = CallFactory::new();
        f.register("not", || Call::And).unwrap();
        load(&mut f);
        assert_eq!(f.create("not", vec![]).unwrap_err().to_string(), "`and` takes at least 2 children, got 0");
        assert!(f.contains("or"));
    }
}
