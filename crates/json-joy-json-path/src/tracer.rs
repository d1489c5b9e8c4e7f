//! Tracer (C3): recursive descent over a JSON document guided by a token
//! list, producing match records (spec.md §4.3).
//!
//! The dispatch function recurses through [`step`], which resolves every
//! parent-selector (`^`) sentinel returned by its own children against its
//! own `(value, path, parent, parent_property)` — except when the step's own
//! head token is itself [`Token::Parent`], in which case it has nothing of
//! its own to resolve against and bubbles the sentinel up one frame
//! unresolved (spec.md §9, "do not model `^` by mutating the active path").

use std::sync::OnceLock;

use json_expression::{Backend, Bindings, ExprError};
use regex::Regex;
use serde_json::Value;

use crate::normalizer::{self, tokenize};
use crate::types::{Error, MatchKind, MatchRecord, ParentSentinel, PathComponent, Token, TraceOutcome, TypeKind};

/// Caller-supplied hooks and the configured expression backend, threaded
/// through every recursive call. Borrowed rather than cloned since a trace
/// never needs to outlive the query that invoked it.
pub struct TraceOptions<'a> {
    pub backend: &'a dyn Backend,
    pub ignore_eval_errors: bool,
    pub sandbox: &'a serde_json::Map<String, Value>,
    pub other_type_callback: Option<&'a dyn Fn(&Value) -> bool>,
    pub undefined_callback: Option<&'a dyn Fn(&[PathComponent]) -> Option<Value>>,
}

#[derive(Clone)]
struct Ctx {
    value: Value,
    path: Vec<PathComponent>,
    parent: Option<Value>,
    parent_property: Option<PathComponent>,
    has_arr_expr: bool,
}

/// Runs a full trace and resolves every outstanding sentinel, so callers
/// never see [`TraceOutcome::Sentinel`] in the returned list.
pub fn trace(
    tokens: &[Token],
    root: &Value,
    parent: Option<Value>,
    parent_property: Option<PathComponent>,
    opts: &TraceOptions,
) -> Result<Vec<MatchRecord>, Error> {
    let ctx = Ctx {
        value: root.clone(),
        path: vec![],
        parent,
        parent_property,
        has_arr_expr: false,
    };
    let outcomes = step(tokens, &ctx, root, opts)?;
    Ok(outcomes
        .into_iter()
        .filter_map(|o| match o {
            TraceOutcome::Match(m) => Some(m),
            // A path that ascends with `^` past the root has nothing left
            // to resolve against; it contributes no match rather than
            // erroring, consistent with other over-traversal (e.g. indexing
            // past an array's end) yielding an empty result.
            TraceOutcome::Sentinel(_) => None,
        })
        .collect())
}

fn step(tokens: &[Token], ctx: &Ctx, root: &Value, opts: &TraceOptions) -> Result<Vec<TraceOutcome>, Error> {
    let Some((head, rest)) = tokens.split_first() else {
        return Ok(vec![TraceOutcome::Match(MatchRecord {
            path: ctx.path.clone(),
            value: ctx.value.clone(),
            parent: ctx.parent.clone(),
            parent_property: ctx.parent_property.clone(),
            has_arr_expr: ctx.has_arr_expr,
            kind: MatchKind::Value,
        })]);
    };

    if matches!(head, Token::Parent) {
        let mut truncated = ctx.path.clone();
        truncated.pop();
        return Ok(vec![TraceOutcome::Sentinel(ParentSentinel {
            truncated_path: truncated,
            remaining: rest.to_vec(),
        })]);
    }

    let raw = dispatch(head, rest, ctx, root, opts)?;
    resolve_sentinels(raw, ctx, root, opts)
}

/// After a frame gathers its children's raw results, splice any returned
/// sentinel in place of its own re-trace from this frame's own context —
/// the frame one level above wherever the `^` token actually fired.
fn resolve_sentinels(raw: Vec<TraceOutcome>, ctx: &Ctx, root: &Value, opts: &TraceOptions) -> Result<Vec<TraceOutcome>, Error> {
    let mut out = Vec::with_capacity(raw.len());
    for outcome in raw {
        match outcome {
            TraceOutcome::Match(m) => out.push(TraceOutcome::Match(m)),
            TraceOutcome::Sentinel(s) => {
                let resumed = step(&s.remaining, ctx, root, opts)?;
                out.extend(resumed);
            }
        }
    }
    Ok(out)
}

fn descend(
    rest: &[Token],
    value: Value,
    path: Vec<PathComponent>,
    parent: Option<Value>,
    parent_property: Option<PathComponent>,
    has_arr_expr: bool,
    root: &Value,
    opts: &TraceOptions,
) -> Result<Vec<TraceOutcome>, Error> {
    let child_ctx = Ctx { value, path, parent, parent_property, has_arr_expr };
    step(rest, &child_ctx, root, opts)
}

fn dispatch(head: &Token, rest: &[Token], ctx: &Ctx, root: &Value, opts: &TraceOptions) -> Result<Vec<TraceOutcome>, Error> {
    match head {
        Token::Root => descend(rest, ctx.value.clone(), ctx.path.clone(), None, None, ctx.has_arr_expr, root, opts),

        Token::Wildcard => trace_children(ctx, rest, root, opts),

        Token::Descendant => trace_descendant(ctx, rest, root, opts),

        Token::PropertyName => Ok(match &ctx.parent_property {
            Some(p) => vec![TraceOutcome::Match(MatchRecord {
                path: ctx.path.clone(),
                value: p.as_value(),
                parent: ctx.parent.clone(),
                parent_property: ctx.parent_property.clone(),
                has_arr_expr: ctx.has_arr_expr,
                kind: MatchKind::Property,
            })],
            None => vec![],
        }),

        Token::Slice { start, end, step: slice_step } => trace_slice(ctx, rest, *start, *end, *slice_step, root, opts),

        Token::Filter(src) => trace_filter(ctx, rest, src, root, opts),

        Token::Script(src) => trace_script(ctx, rest, src, root, opts),

        Token::TypePredicate(kind) => Ok(if matches_type(&ctx.value, *kind, opts)? {
            vec![TraceOutcome::Match(MatchRecord {
                path: ctx.path.clone(),
                value: ctx.value.clone(),
                parent: ctx.parent.clone(),
                parent_property: ctx.parent_property.clone(),
                has_arr_expr: ctx.has_arr_expr,
                kind: MatchKind::Value,
            })]
        } else {
            vec![]
        }),

        Token::LiteralProperty(name) => trace_property(ctx, rest, name, root, opts),

        Token::Union(members) => {
            let mut out = Vec::new();
            for member in members {
                let mut member_tokens = Vec::with_capacity(rest.len() + 1);
                member_tokens.push(member.clone());
                member_tokens.extend_from_slice(rest);
                let mut sub_ctx = ctx.clone();
                sub_ctx.has_arr_expr = true;
                out.extend(step(&member_tokens, &sub_ctx, root, opts)?);
            }
            Ok(out)
        }

        Token::Property(name) => trace_property(ctx, rest, name, root, opts),

        // Parent is handled in `step` before dispatch is ever reached.
        Token::Parent => unreachable!(),
    }
}

fn trace_property(ctx: &Ctx, rest: &[Token], name: &str, root: &Value, opts: &TraceOptions) -> Result<Vec<TraceOutcome>, Error> {
    match lookup_child(&ctx.value, name) {
        Some((child, component)) => {
            let mut path = ctx.path.clone();
            path.push(component.clone());
            descend(rest, child, path, Some(ctx.value.clone()), Some(component), ctx.has_arr_expr, root, opts)
        }
        None => match opts.undefined_callback {
            Some(cb) => {
                let mut path = ctx.path.clone();
                let component = PathComponent::Key(name.to_string());
                path.push(component.clone());
                match cb(&path) {
                    Some(synthesized) => descend(rest, synthesized, path, Some(ctx.value.clone()), Some(component), ctx.has_arr_expr, root, opts),
                    None => Ok(vec![]),
                }
            }
            None => Ok(vec![]),
        },
    }
}

fn lookup_child(value: &Value, name: &str) -> Option<(Value, PathComponent)> {
    match value {
        Value::Object(map) => map.get(name).map(|v| (v.clone(), PathComponent::Key(name.to_string()))),
        Value::Array(arr) => {
            let idx: i64 = name.parse().ok()?;
            let resolved = if idx < 0 { arr.len() as i64 + idx } else { idx };
            if resolved < 0 {
                return None;
            }
            let resolved = resolved as usize;
            arr.get(resolved).map(|v| (v.clone(), PathComponent::Index(resolved)))
        }
        _ => None,
    }
}

fn children_in_order(value: &Value) -> Vec<(PathComponent, Value)> {
    match value {
        Value::Array(arr) => arr.iter().enumerate().map(|(i, v)| (PathComponent::Index(i), v.clone())).collect(),
        Value::Object(map) => map.iter().map(|(k, v)| (PathComponent::Key(k.clone()), v.clone())).collect(),
        _ => vec![],
    }
}

fn trace_children(ctx: &Ctx, rest: &[Token], root: &Value, opts: &TraceOptions) -> Result<Vec<TraceOutcome>, Error> {
    let mut out = Vec::new();
    for (component, child) in children_in_order(&ctx.value) {
        let mut path = ctx.path.clone();
        path.push(component.clone());
        out.extend(descend(rest, child, path, Some(ctx.value.clone()), Some(component), true, root, opts)?);
    }
    Ok(out)
}

fn trace_descendant(ctx: &Ctx, rest: &[Token], root: &Value, opts: &TraceOptions) -> Result<Vec<TraceOutcome>, Error> {
    let mut out = descend(rest, ctx.value.clone(), ctx.path.clone(), ctx.parent.clone(), ctx.parent_property.clone(), true, root, opts)?;
    for (component, child) in children_in_order(&ctx.value) {
        let mut path = ctx.path.clone();
        path.push(component.clone());
        let mut descendant_tokens = Vec::with_capacity(rest.len() + 1);
        descendant_tokens.push(Token::Descendant);
        descendant_tokens.extend_from_slice(rest);
        let child_ctx = Ctx {
            value: child,
            path,
            parent: Some(ctx.value.clone()),
            parent_property: Some(component),
            has_arr_expr: true,
        };
        out.extend(step(&descendant_tokens, &child_ctx, root, opts)?);
    }
    Ok(out)
}

fn trace_slice(
    ctx: &Ctx,
    rest: &[Token],
    start: Option<i64>,
    end: Option<i64>,
    slice_step: Option<i64>,
    root: &Value,
    opts: &TraceOptions,
) -> Result<Vec<TraceOutcome>, Error> {
    let Value::Array(arr) = &ctx.value else {
        return Ok(vec![]);
    };
    let len = arr.len() as i64;
    let step_v = slice_step.unwrap_or(1);
    if step_v <= 0 {
        // Undefined behavior per spec.md §9; this engine yields no matches.
        return Ok(vec![]);
    }
    let normalize = |raw: i64| -> i64 {
        let v = if raw < 0 { len + raw } else { raw };
        v.clamp(0, len)
    };
    let a = normalize(start.unwrap_or(0));
    let b = normalize(end.unwrap_or(len));

    let mut out = Vec::new();
    let mut i = a;
    while i < b {
        let idx = i as usize;
        if let Some(child) = arr.get(idx) {
            let mut path = ctx.path.clone();
            let component = PathComponent::Index(idx);
            path.push(component.clone());
            out.extend(descend(rest, child.clone(), path, Some(ctx.value.clone()), Some(component), true, root, opts)?);
        }
        i += step_v;
    }
    Ok(out)
}

static NESTED_FILTER: OnceLock<Regex> = OnceLock::new();

fn looks_like_nested_filter(src: &str) -> bool {
    let re = NESTED_FILTER.get_or_init(|| Regex::new(r"\[\?\(").expect("valid nested-filter probe pattern"));
    re.is_match(src)
}

fn trace_filter(ctx: &Ctx, rest: &[Token], src: &str, root: &Value, opts: &TraceOptions) -> Result<Vec<TraceOutcome>, Error> {
    let mut out = Vec::new();
    for (component, child) in children_in_order(&ctx.value) {
        let mut path = ctx.path.clone();
        path.push(component.clone());
        let selected = if looks_like_nested_filter(src) {
            probe_nested_filter(src, &child, opts)?
        } else {
            evaluate_filter(src, &ctx.value, &component, &child, root, &path, opts)?
        };
        if selected {
            out.extend(descend(rest, child, path, Some(ctx.value.clone()), Some(component), true, root, opts)?);
        }
    }
    Ok(out)
}

/// Two-stage probe for `[?(@.a[?(@.b>1)])]`-style nesting (spec.md §4.3 item
/// 8): re-normalize the inner fragment as its own sub-path rooted at the
/// child, and select the child iff that sub-trace yields anything. This
/// only resolves one extra level of nesting, matching the documented limit
/// of the heuristic it replaces.
fn probe_nested_filter(src: &str, child: &Value, opts: &TraceOptions) -> Result<bool, Error> {
    let fragment = src.strip_prefix('@').unwrap_or(src);
    let probe_path = format!("${fragment}");
    let tokens = tokenize(&probe_path);
    let matches = trace(&tokens, child, None, None, opts)?;
    Ok(!matches.is_empty())
}

fn evaluate_filter(
    src: &str,
    parent: &Value,
    component: &PathComponent,
    child: &Value,
    root: &Value,
    path: &[PathComponent],
    opts: &TraceOptions,
) -> Result<bool, Error> {
    let bindings = build_bindings(src, child, Some(parent.clone()), Some(component.clone()), root, path, opts);
    let rewritten = rewrite_meta_tokens(src);
    match opts.backend.eval(&rewritten, &bindings) {
        Ok(value) => Ok(json_expression::is_truthy(&value)),
        Err(ExprError::Disabled) => Err(Error::Policy("filter steps are disabled".to_string())),
        Err(_) if opts.ignore_eval_errors => Ok(false),
        Err(e) => Err(Error::Expression { message: e.to_string(), source_fragment: src.to_string() }),
    }
}

fn trace_script(ctx: &Ctx, rest: &[Token], src: &str, root: &Value, opts: &TraceOptions) -> Result<Vec<TraceOutcome>, Error> {
    let bindings = build_bindings(src, &ctx.value, ctx.parent.clone(), ctx.parent_property.clone(), root, &ctx.path, opts);
    let rewritten = rewrite_meta_tokens(src);
    let result = match opts.backend.eval(&rewritten, &bindings) {
        Ok(value) => value,
        Err(ExprError::Disabled) => return Err(Error::Policy("script steps are disabled".to_string())),
        Err(_) if opts.ignore_eval_errors => return Ok(vec![]),
        Err(e) => return Err(Error::Expression { message: e.to_string(), source_fragment: src.to_string() }),
    };
    let next = match result {
        Value::String(s) => Token::Property(s),
        Value::Number(n) => Token::Property(n.to_string()),
        _ => return Ok(vec![]),
    };
    let mut tokens = Vec::with_capacity(rest.len() + 1);
    tokens.push(next);
    tokens.extend_from_slice(rest);
    descend(&tokens, ctx.value.clone(), ctx.path.clone(), ctx.parent.clone(), ctx.parent_property.clone(), ctx.has_arr_expr, root, opts)
}

fn build_bindings(
    src: &str,
    value: &Value,
    parent: Option<Value>,
    parent_property: Option<PathComponent>,
    root: &Value,
    path: &[PathComponent],
    opts: &TraceOptions,
) -> Bindings {
    let mut bindings = Bindings::new().with("_$_v", value.clone()).with("_$_root", root.clone());
    let vname = parent_property.as_ref().map(|p| p.as_value()).unwrap_or(Value::Null);
    bindings.set("_$_vname", vname.clone());
    bindings.set("_$_property", vname);
    bindings.set("_$_parent", parent.unwrap_or(Value::Null));
    bindings.set(
        "_$_parentProperty",
        parent_property.as_ref().map(|p| p.as_value()).unwrap_or(Value::Null),
    );
    if src.contains("@path") {
        let tokens_for_path: Vec<Token> = path.iter().map(|c| match c {
            PathComponent::Key(k) => Token::Property(k.clone()),
            PathComponent::Index(i) => Token::Property(i.to_string()),
        }).collect();
        let mut full = vec![Token::Root];
        full.extend(tokens_for_path);
        bindings.set("_$_path", Value::String(normalizer::canonical_path_string(&full)));
    }
    for (key, val) in opts.sandbox.iter() {
        bindings.set(key.clone(), val.clone());
    }
    bindings
}

/// Rewrites JSONPath meta-tokens in filter/script source to the plain
/// identifiers `json-expression` understands (spec.md §4.2's table). Longest
/// / most specific tokens are replaced first so `@parentProperty` never gets
/// clipped to `@parent` + a stray `Property` suffix.
fn rewrite_meta_tokens(src: &str) -> String {
    static BARE_AT: OnceLock<Regex> = OnceLock::new();
    let bare_at = BARE_AT.get_or_init(|| Regex::new(r"@(?P<d>[.\s)\[])").expect("valid bare-@ pattern"));

    let rewritten = src
        .replace("@parentProperty", "_$_parentProperty")
        .replace("@parent", "_$_parent")
        .replace("@property", "_$_property")
        .replace("@root", "_$_root")
        .replace("@path", "_$_path");
    bare_at.replace_all(&rewritten, "_$_v$d").into_owned()
}

fn matches_type(value: &Value, kind: TypeKind, opts: &TraceOptions) -> Result<bool, Error> {
    Ok(match kind {
        TypeKind::Null => value.is_null(),
        TypeKind::Boolean => value.is_boolean(),
        TypeKind::Number => value.is_number(),
        TypeKind::String => value.is_string(),
        TypeKind::Integer => value.as_f64().map(|n| n.is_finite() && n.fract() == 0.0).unwrap_or(false),
        TypeKind::Array => value.is_array(),
        TypeKind::Object => value.is_object() && !value.is_null(),
        // serde_json::Value has no NaN/Infinity, "undefined", or function
        // representation, so these classes never match.
        TypeKind::Undefined | TypeKind::NonFinite | TypeKind::Function => false,
        TypeKind::Scalar => !value.is_object() && !value.is_array(),
        TypeKind::Other => match opts.other_type_callback {
            Some(cb) => cb(value),
            None => return Err(Error::Classifier("@other() used without a classifier".to_string())),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_expression::SafeBackend;
    use serde_json::json;

    fn opts(backend: &dyn Backend) -> TraceOptions<'_> {
        TraceOptions {
            backend,
            ignore_eval_errors: false,
            sandbox: Box::leak(Box::new(serde_json::Map::new())),
            other_type_callback: None,
            undefined_callback: None,
        }
    }

    #[test]
    fn direct_property_chain() {
        let doc = json!({"a": {"b": {"c": 7}}});
        let tokens = tokenize("$.a.b.c");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, json!(7));
        assert_eq!(
            matches[0].path,
            vec![PathComponent::Key("a".into()), PathComponent::Key("b".into()), PathComponent::Key("c".into())]
        );
    }

    #[test]
    fn slice_selects_subrange() {
        let doc = json!({"a": [1, 2, 3, 4, 5]});
        let tokens = tokenize("$.a[1:4]");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        let values: Vec<_> = matches.into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec![json!(2), json!(3), json!(4)]);
    }

    #[test]
    fn descendant_finds_every_matching_key() {
        let doc = json!({"a": {"b": 1, "c": 2}, "d": {"b": 3}});
        let tokens = tokenize("$..b");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        let values: Vec<_> = matches.into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec![json!(1), json!(3)]);
    }

    #[test]
    fn parent_selector_returns_ancestor() {
        let doc = json!({"a": {"b": {"c": {"d": 9}}}});
        let tokens = tokenize("$.a.b.c.d.^");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, json!({"d": 9}));
    }

    #[test]
    fn property_name_selector_yields_key() {
        let doc = json!({"k": "v"});
        let tokens = tokenize("$.k~");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, json!("k"));
        assert_eq!(matches[0].kind, MatchKind::Property);
    }

    #[test]
    fn union_step_selects_each_alternative_in_order() {
        let doc = json!({"a": 1, "b": 2, "c": 3});
        let tokens = tokenize("$['a','c']");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        let values: Vec<_> = matches.into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec![json!(1), json!(3)]);
    }

    #[test]
    fn filter_step_keeps_truthy_children() {
        let doc = json!({"x": [{"n": 1}, {"n": 2}, {"n": 3}]});
        let backend = SafeBackend::new();
        let query_opts = opts(&backend);
        let array_tokens = tokenize("$.x[?(@.n>1)]");
        let array_matches = trace(&array_tokens[1..], &doc, None, None, &query_opts).unwrap();
        assert_eq!(array_matches.len(), 2);

        let n_tokens = tokenize("n");
        let mut ns = Vec::new();
        for m in &array_matches {
            ns.extend(trace(&n_tokens, &m.value, None, None, &query_opts).unwrap());
        }
        let values: Vec<_> = ns.into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec![json!(2), json!(3)]);
    }

    #[test]
    fn filter_sees_the_current_childs_own_path_via_at_path() {
        let doc = json!({"x": [{"n": 1}, {"n": 2}]});
        let tokens = tokenize("$.x[?(@path=='$[\\'x\\'][1]')]");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, json!({"n": 2}));
    }

    #[test]
    fn disabled_backend_raises_policy_error_for_filter_steps() {
        let doc = json!({"x": [{"n": 1}]});
        let disabled = json_expression::DisabledBackend;
        let err = trace(&tokenize("$.x[?(@.n>0)]")[1..], &doc, None, None, &opts(&disabled)).unwrap_err();
        assert!(matches!(err, Error::Policy(_)));
    }

    #[test]
    fn type_predicate_matches_runtime_type() {
        let doc = json!({"a": "hello"});
        let tokens = tokenize("$.a@string()");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, json!("hello"));
    }

    #[test]
    fn script_step_selects_dynamic_index() {
        let doc = json!({"a": ["x", "y", "z"], "i": 1});
        let tokens = tokenize("$.a[(1)]");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, json!("y"));
    }

    #[test]
    fn negative_index_counts_from_the_end() {
        let doc = json!([10, 20, 30]);
        let tokens = tokenize("$[-1::1]");
        let backend = SafeBackend::new();
        let matches = trace(&tokens[1..], &doc, None, None, &opts(&backend)).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, json!(30));
    }

    #[test]
    fn rewrite_handles_parent_property_before_parent() {
        assert_eq!(rewrite_meta_tokens("@parentProperty == 'x'"), "_$_parentProperty == 'x'");
        assert_eq!(rewrite_meta_tokens("@.n > 1"), "_$_v.n > 1");
        assert_eq!(rewrite_meta_tokens("@parent.n"), "_$_parent.n");
    }
}
