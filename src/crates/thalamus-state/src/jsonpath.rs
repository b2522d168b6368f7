//! JSONPath subset used to address into the state tree.
//!
//! Supported syntax: an optional leading `$`, dot steps (`.name`),
//! bracketed name/index steps (`['name']`, `[3]`), and bracketed filter
//! steps (`[?@.name == 'wave' && @.Running == true]`). Filter predicates
//! are `||`/`&&` combinations of comparisons between singular queries
//! (`@...` relative, `$...` absolute) and literals (integer, quoted
//! string, `true`, `false`, `null`).
//!
//! Reads over missing structure yield [`Value::None`]; writes create
//! intermediate maps as needed; deleting a missing leaf is a no-op.

use crate::error::{Result, StateError};
use crate::value::{Key, ObservableMap, Value};

#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Name(String),
    Index(i64),
    Filter(FilterExpr),
}

/// Disjunction of conjunctions, as parsed: `a && b || c` is
/// `[[a, b], [c]]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterExpr {
    pub clauses: Vec<Vec<Comparison>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub lhs: Operand,
    pub op: CompareOp,
    pub rhs: Operand,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Literal(Literal),
    /// `$a.b[0]` — evaluated from the root.
    Absolute(Vec<PathStep>),
    /// `@.a['b']` — evaluated from the candidate element.
    Relative(Vec<PathStep>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PathStep {
    Name(String),
    Index(i64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> StateError {
        StateError::PathParse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c as char)))
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.input[self.pos..].starts_with(token.as_bytes()) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse_query(&mut self) -> Result<Vec<Segment>> {
        self.skip_ws();
        if self.peek() == Some(b'$') {
            self.pos += 1;
        }
        let mut segments = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'.') => {
                    self.pos += 1;
                    segments.push(Segment::Name(self.parse_member_name()?));
                }
                Some(b'[') => {
                    self.pos += 1;
                    segments.push(self.parse_bracketed()?);
                    self.expect(b']')?;
                }
                None => break,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c as char))),
            }
        }
        Ok(segments)
    }

    fn parse_member_name(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(c) if c == b'_' || c.is_ascii_alphabetic() => {
                self.pos += 1;
            }
            _ => return Err(self.error("expected member name")),
        }
        while matches!(self.peek(), Some(c) if c == b'_' || c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn parse_bracketed(&mut self) -> Result<Segment> {
        self.skip_ws();
        match self.peek() {
            Some(b'\'') | Some(b'"') => Ok(Segment::Name(self.parse_string_literal()?)),
            Some(b'?') => {
                self.pos += 1;
                Ok(Segment::Filter(self.parse_filter()?))
            }
            Some(c) if c == b'-' || c.is_ascii_digit() => Ok(Segment::Index(self.parse_int()?)),
            _ => Err(self.error("expected selector")),
        }
    }

    fn parse_string_literal(&mut self) -> Result<String> {
        let quote = self.bump().ok_or_else(|| self.error("expected quote"))?;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let text =
                    String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                self.pos += 1;
                return Ok(text);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated string literal"))
    }

    fn parse_int(&mut self) -> Result<i64> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected integer"));
        }
        String::from_utf8_lossy(&self.input[start..self.pos])
            .parse()
            .map_err(|_| self.error("invalid integer"))
    }

    fn parse_filter(&mut self) -> Result<FilterExpr> {
        let mut clauses = vec![self.parse_and_clause()?];
        while self.eat("||") {
            clauses.push(self.parse_and_clause()?);
        }
        Ok(FilterExpr { clauses })
    }

    fn parse_and_clause(&mut self) -> Result<Vec<Comparison>> {
        let mut comparisons = vec![self.parse_comparison()?];
        while self.eat("&&") {
            comparisons.push(self.parse_comparison()?);
        }
        Ok(comparisons)
    }

    fn parse_comparison(&mut self) -> Result<Comparison> {
        let lhs = self.parse_operand()?;
        self.skip_ws();
        let op = if self.eat("==") {
            CompareOp::Eq
        } else if self.eat("!=") {
            CompareOp::Ne
        } else if self.eat("<=") {
            CompareOp::Le
        } else if self.eat(">=") {
            CompareOp::Ge
        } else if self.eat("<") {
            CompareOp::Lt
        } else if self.eat(">") {
            CompareOp::Gt
        } else {
            return Err(self.error("expected comparison operator"));
        };
        let rhs = self.parse_operand()?;
        Ok(Comparison { lhs, op, rhs })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        self.skip_ws();
        match self.peek() {
            Some(b'@') => {
                self.pos += 1;
                Ok(Operand::Relative(self.parse_singular_steps()?))
            }
            Some(b'$') => {
                self.pos += 1;
                Ok(Operand::Absolute(self.parse_singular_steps()?))
            }
            Some(b'\'') | Some(b'"') => {
                Ok(Operand::Literal(Literal::String(self.parse_string_literal()?)))
            }
            Some(c) if c == b'-' || c.is_ascii_digit() => {
                Ok(Operand::Literal(Literal::Int(self.parse_int()?)))
            }
            _ => {
                if self.eat("true") {
                    Ok(Operand::Literal(Literal::Bool(true)))
                } else if self.eat("false") {
                    Ok(Operand::Literal(Literal::Bool(false)))
                } else if self.eat("null") {
                    Ok(Operand::Literal(Literal::Null))
                } else {
                    Err(self.error("expected operand"))
                }
            }
        }
    }

    fn parse_singular_steps(&mut self) -> Result<Vec<PathStep>> {
        let mut steps = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'.') => {
                    self.pos += 1;
                    steps.push(PathStep::Name(self.parse_member_name()?));
                }
                Some(b'[') => {
                    self.pos += 1;
                    self.skip_ws();
                    let step = match self.peek() {
                        Some(b'\'') | Some(b'"') => PathStep::Name(self.parse_string_literal()?),
                        _ => PathStep::Index(self.parse_int()?),
                    };
                    self.expect(b']')?;
                    steps.push(step);
                }
                _ => break,
            }
        }
        Ok(steps)
    }
}

/// Parses a path into segments.
pub fn parse(path: &str) -> Result<Vec<Segment>> {
    let mut parser = Parser::new(path);
    let segments = parser.parse_query()?;
    parser.skip_ws();
    if parser.pos != parser.input.len() {
        return Err(parser.error("trailing input"));
    }
    Ok(segments)
}

/// Evaluates `path` against `root`. Missing structure yields
/// [`Value::None`].
pub fn get(root: &Value, path: &str) -> Result<Value> {
    let segments = parse(path)?;
    Ok(get_segments(root, &segments))
}

fn get_segments(root: &Value, segments: &[Segment]) -> Value {
    let mut current = root.clone();
    for segment in segments {
        current = step(root, &current, segment);
        if current.is_none() {
            return Value::None;
        }
    }
    current
}

fn step(root: &Value, current: &Value, segment: &Segment) -> Value {
    match segment {
        Segment::Name(name) => match current {
            Value::Map(map) => map.try_at(name.as_str()).unwrap_or(Value::None),
            _ => Value::None,
        },
        Segment::Index(index) => match current {
            Value::List(list) => {
                if *index < 0 {
                    return Value::None;
                }
                list.try_at(*index as usize).unwrap_or(Value::None)
            }
            Value::Map(map) => map.try_at(Key::Int(*index)).unwrap_or(Value::None),
            _ => Value::None,
        },
        Segment::Filter(filter) => match current {
            Value::List(list) => list
                .values()
                .into_iter()
                .find(|candidate| eval_filter(root, candidate, filter))
                .unwrap_or(Value::None),
            Value::Map(map) => map
                .entries()
                .into_iter()
                .map(|(_, v)| v)
                .find(|candidate| eval_filter(root, candidate, filter))
                .unwrap_or(Value::None),
            _ => Value::None,
        },
    }
}

fn eval_filter(root: &Value, candidate: &Value, filter: &FilterExpr) -> bool {
    filter.clauses.iter().any(|clause| {
        clause
            .iter()
            .all(|comparison| eval_comparison(root, candidate, comparison))
    })
}

fn eval_comparison(root: &Value, candidate: &Value, comparison: &Comparison) -> bool {
    let lhs = eval_operand(root, candidate, &comparison.lhs);
    let rhs = eval_operand(root, candidate, &comparison.rhs);
    compare(&lhs, comparison.op, &rhs)
}

fn eval_operand(root: &Value, candidate: &Value, operand: &Operand) -> Value {
    match operand {
        Operand::Literal(Literal::Int(i)) => Value::Int(*i),
        Operand::Literal(Literal::String(s)) => Value::String(s.clone()),
        Operand::Literal(Literal::Bool(b)) => Value::Bool(*b),
        Operand::Literal(Literal::Null) => Value::None,
        Operand::Relative(steps) => walk_steps(candidate, steps),
        Operand::Absolute(steps) => walk_steps(root, steps),
    }
}

fn walk_steps(start: &Value, steps: &[PathStep]) -> Value {
    let mut current = start.clone();
    for s in steps {
        current = match (&current, s) {
            (Value::Map(map), PathStep::Name(name)) => {
                map.try_at(name.as_str()).unwrap_or(Value::None)
            }
            (Value::Map(map), PathStep::Index(i)) => {
                map.try_at(Key::Int(*i)).unwrap_or(Value::None)
            }
            (Value::List(list), PathStep::Index(i)) if *i >= 0 => {
                list.try_at(*i as usize).unwrap_or(Value::None)
            }
            _ => Value::None,
        };
        if current.is_none() {
            return Value::None;
        }
    }
    current
}

fn compare(lhs: &Value, op: CompareOp, rhs: &Value) -> bool {
    use std::cmp::Ordering;
    let ordering = match (lhs, rhs) {
        (Value::None, Value::None) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    match ordering {
        Some(ordering) => match op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        },
        // Incomparable kinds: only != holds.
        None => op == CompareOp::Ne,
    }
}

/// Writes `value` at `path`, creating intermediate maps as needed.
pub fn set(root: &Value, path: &str, value: Value, from_remote: bool) -> Result<()> {
    let segments = parse(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(StateError::PathEval("cannot set the root value".to_string()));
    };

    let mut current = root.clone();
    for segment in parents {
        let next = step(root, &current, segment);
        current = if next.as_collection().is_some() {
            next
        } else {
            // Missing or primitive intermediates are replaced by a fresh
            // map; filters cannot create structure.
            let created = Value::Map(ObservableMap::new());
            write_child(&current, segment, created.clone(), from_remote, root)?;
            created
        };
    }
    write_child(&current, last, value, from_remote, root)
}

fn write_child(
    parent: &Value,
    segment: &Segment,
    value: Value,
    from_remote: bool,
    root: &Value,
) -> Result<()> {
    match (parent, segment) {
        (Value::Map(map), Segment::Name(name)) => {
            map.assign_with(Key::String(name.clone()), value, None, from_remote);
            Ok(())
        }
        (Value::Map(map), Segment::Index(index)) => {
            map.assign_with(Key::Int(*index), value, None, from_remote);
            Ok(())
        }
        (Value::List(list), Segment::Index(index)) => {
            if *index < 0 {
                return Err(StateError::PathEval("negative list index".to_string()));
            }
            list.set_with(*index as usize, value, None, from_remote);
            Ok(())
        }
        (Value::List(list), Segment::Filter(filter)) => {
            let position = list
                .values()
                .iter()
                .position(|candidate| eval_filter(root, candidate, filter));
            match position {
                Some(i) => {
                    list.set_with(i, value, None, from_remote);
                    Ok(())
                }
                None => Err(StateError::PathEval("filter matched nothing".to_string())),
            }
        }
        _ => Err(StateError::PathEval(format!(
            "cannot write through a {} with this selector",
            parent.kind()
        ))),
    }
}

/// Deletes the leaf at `path`. Deleting a missing leaf is a no-op.
pub fn delete(root: &Value, path: &str, from_remote: bool) -> Result<()> {
    let segments = parse(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(StateError::PathEval("cannot delete the root value".to_string()));
    };
    let parent = get_segments(root, parents);
    if parent.is_none() {
        return Ok(());
    }
    match (&parent, last) {
        (Value::Map(map), Segment::Name(name)) => {
            map.erase_with(Key::String(name.clone()), None, from_remote);
            Ok(())
        }
        (Value::Map(map), Segment::Index(index)) => {
            map.erase_with(Key::Int(*index), None, from_remote);
            Ok(())
        }
        (Value::List(list), Segment::Index(index)) => {
            if *index >= 0 {
                list.erase_with(*index as usize, None, from_remote);
            }
            Ok(())
        }
        (Value::List(list), Segment::Filter(filter)) => {
            let position = list
                .values()
                .iter()
                .position(|candidate| eval_filter(root, candidate, filter));
            if let Some(i) = position {
                list.erase_with(i, None, from_remote);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObservableList;

    fn sample_tree() -> Value {
        Value::from_json(&serde_json::json!({
            "nodes": [
                {"type": "WAVE", "name": "wave", "Running": true, "Frequency": 10},
                {"type": "STORAGE", "name": "storage", "Running": false}
            ],
            "port": 50050
        }))
    }

    #[test]
    fn test_get_dot_and_bracket() {
        let root = sample_tree();
        assert_eq!(get(&root, "$.port").unwrap(), Value::Int(50050));
        assert_eq!(
            get(&root, "$['nodes'][0]['name']").unwrap(),
            Value::String("wave".to_string())
        );
        assert_eq!(
            get(&root, "$.nodes[1].type").unwrap(),
            Value::String("STORAGE".to_string())
        );
        assert_eq!(get(&root, "$.missing.deeper").unwrap(), Value::None);
    }

    #[test]
    fn test_set_then_get() {
        let root = sample_tree();
        set(&root, "$.nodes[0].Amplitude", Value::Float(2.0), false).unwrap();
        assert_eq!(get(&root, "$.nodes[0].Amplitude").unwrap(), Value::Float(2.0));
    }

    #[test]
    fn test_set_creates_intermediates() {
        let root = Value::Map(crate::value::ObservableMap::new());
        set(&root, "$.a.b.c", Value::Int(1), false).unwrap();
        assert_eq!(get(&root, "$.a.b.c").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_delete_then_absent() {
        let root = sample_tree();
        delete(&root, "$.nodes[0].Running", false).unwrap();
        assert_eq!(get(&root, "$.nodes[0].Running").unwrap(), Value::None);
        // Deleting a missing leaf is a no-op.
        delete(&root, "$.nodes[0].Running", false).unwrap();
        delete(&root, "$.not.there", false).unwrap();
    }

    #[test]
    fn test_filter_by_name() {
        let root = sample_tree();
        let node = get(&root, "$.nodes[?@.name == 'storage']").unwrap();
        let map = node.as_map().expect("expected a map");
        assert_eq!(map.get_string("type"), Some("STORAGE".to_string()));
    }

    #[test]
    fn test_filter_conjunction_and_numeric_compare() {
        let root = sample_tree();
        let node = get(&root, "$.nodes[?@.type == 'WAVE' && @.Frequency >= 5]").unwrap();
        assert!(node.as_map().is_some());
        let none = get(&root, "$.nodes[?@.type == 'WAVE' && @.Frequency > 100]").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_filter_disjunction() {
        let root = sample_tree();
        let node = get(&root, "$.nodes[?@.name == 'none' || @.Running == false]").unwrap();
        let map = node.as_map().expect("expected a map");
        assert_eq!(map.get_string("name"), Some("storage".to_string()));
    }

    #[test]
    fn test_filter_write() {
        let root = sample_tree();
        set(
            &root,
            "$.nodes[?@.name == 'storage'].Running",
            Value::Bool(true),
            false,
        )
        .unwrap();
        assert_eq!(get(&root, "$.nodes[1].Running").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_set_on_list_appends() {
        let root = Value::Map(crate::value::ObservableMap::new());
        let list = ObservableList::new();
        root.as_map().unwrap().assign("xs", list);
        set(&root, "$.xs[0]", Value::Int(1), false).unwrap();
        set(&root, "$.xs[1]", Value::Int(2), false).unwrap();
        assert_eq!(get(&root, "$.xs[1]").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("$.").is_err());
        assert!(parse("$[").is_err());
        assert!(parse("$.a trailing").is_err());
        assert!(parse("$.a[?@.x ~ 1]").is_err());
    }
}
