//! Evaluates a parsed path against a value, threading a node set through each
//! segment in turn.

use value::Value;

use crate::ast::{Atom, CmpOp, FilterExpr, Path, ScriptExpr, Segment, Selector, Slice};

pub(crate) fn query<'v>(path: &Path, root: &'v Value) -> Vec<&'v Value> {
    let mut nodes = vec![root];
    for segment in &path.segments {
        nodes = apply_segment(segment, nodes);
    }
    nodes
}

fn apply_segment<'v>(segment: &Segment, nodes: Vec<&'v Value>) -> Vec<&'v Value> {
    match segment {
        Segment::Property(name) => nodes
            .into_iter()
            .filter_map(|node| node.as_object().and_then(|obj| obj.get(name)))
            .collect(),
        Segment::Wildcard => nodes.into_iter().flat_map(wildcard_children).collect(),
        Segment::Index(index) => nodes
            .into_iter()
            .filter_map(|node| array_index(node, *index))
            .collect(),
        Segment::Slice(slice) => nodes.into_iter().flat_map(|node| array_slice(node, slice)).collect(),
        Segment::Union(selectors) => nodes
            .into_iter()
            .flat_map(|node| selectors.iter().filter_map(move |selector| apply_selector(node, selector)))
            .collect(),
        Segment::RecursiveDescent(target) => {
            let mut collected = Vec::new();
            for node in nodes {
                recursive_descend(node, &mut collected);
            }
            apply_segment(target, collected)
        }
        Segment::Filter(expr) => nodes.into_iter().flat_map(|node| filter_children(node, expr)).collect(),
        Segment::Script(ScriptExpr::LastIndex) => nodes
            .into_iter()
            .filter_map(|node| node.as_array().and_then(|arr| arr.last()))
            .collect(),
        Segment::Script(ScriptExpr::Noop) => {
            eprintln!("jsonpath: unsupported script expression segment is a no-op, passing nodes through unchanged");
            nodes
        }
    }
}

fn wildcard_children(node: &Value) -> Vec<&Value> {
    if let Some(obj) = node.as_object() {
        obj.values().collect()
    } else if let Some(arr) = node.as_array() {
        arr.iter().collect()
    } else {
        Vec::new()
    }
}

fn array_index(node: &Value, index: i64) -> Option<&Value> {
    let arr = node.as_array()?;
    let len = arr.len() as i64;
    let normalized = normalize(index, len);
    if normalized < 0 || normalized >= len {
        return None;
    }
    arr.get(normalized as usize)
}

fn array_slice<'v>(node: &'v Value, slice: &Slice) -> Vec<&'v Value> {
    let Some(arr) = node.as_array() else {
        return Vec::new();
    };
    let len = arr.len() as i64;
    let step = slice.step.unwrap_or(1);
    if step == 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    if step > 0 {
        let start = clamp(normalize(slice.start.unwrap_or(0), len), 0, len);
        let end = clamp(normalize(slice.end.unwrap_or(len), len), 0, len);
        let mut i = start;
        while i < end {
            if let Some(item) = arr.get(i as usize) {
                out.push(item);
            }
            i += step;
        }
    } else {
        let start = clamp(normalize(slice.start.unwrap_or(len - 1), len), -1, len - 1);
        let end = clamp(normalize(slice.end.unwrap_or(-1), len), -1, len - 1);
        let mut i = start;
        while i > end {
            if i >= 0 {
                if let Some(item) = arr.get(i as usize) {
                    out.push(item);
                }
            }
            i += step;
        }
    }
    out
}

fn normalize(index: i64, len: i64) -> i64 {
    if index < 0 {
        index + len
    } else {
        index
    }
}

fn clamp(value: i64, min: i64, max: i64) -> i64 {
    value.max(min).min(max)
}

fn apply_selector<'v>(node: &'v Value, selector: &Selector) -> Option<&'v Value> {
    match selector {
        Selector::Property(name) => node.as_object().and_then(|obj| obj.get(name)),
        Selector::Index(index) => array_index(node, *index),
    }
}

fn recursive_descend<'v>(node: &'v Value, out: &mut Vec<&'v Value>) {
    out.push(node);
    if let Some(obj) = node.as_object() {
        for child in obj.values() {
            recursive_descend(child, out);
        }
    } else if let Some(arr) = node.as_array() {
        for child in arr {
            recursive_descend(child, out);
        }
    }
}

fn filter_children<'v>(node: &'v Value, expr: &FilterExpr) -> Vec<&'v Value> {
    let Some(arr) = node.as_array() else {
        return Vec::new();
    };
    arr.iter().filter(|item| eval_filter(expr, item)).collect()
}

fn eval_filter(expr: &FilterExpr, current: &Value) -> bool {
    match expr {
        FilterExpr::Or(left, right) => eval_filter(left, current) || eval_filter(right, current),
        FilterExpr::And(left, right) => eval_filter(left, current) && eval_filter(right, current),
        FilterExpr::Not(inner) => !eval_filter(inner, current),
        FilterExpr::Exists(atom) => resolve(atom, current).map(|v| !v.is_null()).unwrap_or(false),
        FilterExpr::Compare(left, op, right) => compare(left, *op, right, current),
    }
}

fn compare(left: &Atom, op: CmpOp, right: &Atom, current: &Value) -> bool {
    let (Some(left), Some(right)) = (resolve(left, current), resolve(right, current)) else {
        return false;
    };
    compare_values(left, op, right)
}

fn resolve<'a>(atom: &'a Atom, current: &'a Value) -> Option<&'a Value> {
    match atom {
        Atom::Current(path) => resolve_current(current, path),
        Atom::Literal(value) => Some(value),
    }
}

fn resolve_current<'a>(current: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut node = current;
    for segment in path {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn compare_values(left: &Value, op: CmpOp, right: &Value) -> bool {
    if let (Some(left), Some(right)) = (left.as_number(), right.as_number()) {
        return match value::numbers_cmp(left, right) {
            Some(ordering) => match op {
                CmpOp::Eq => ordering.is_eq(),
                CmpOp::Ne => ordering.is_ne(),
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
            },
            None => matches!(op, CmpOp::Ne),
        };
    }
    if let (Some(left), Some(right)) = (left.as_str(), right.as_str()) {
        return match op {
            CmpOp::Eq => left == right,
            CmpOp::Ne => left != right,
            CmpOp::Lt => left < right,
            CmpOp::Le => left <= right,
            CmpOp::Gt => left > right,
            CmpOp::Ge => left >= right,
        };
    }
    match op {
        CmpOp::Eq => value::equal(left, right),
        CmpOp::Ne => !value::equal(left, right),
        _ => false,
    }
}
