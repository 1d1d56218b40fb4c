//! A line-oriented operation script driving an [`ImplicitTreap`]
//!
//! One command per line; `#` starts a comment and blank lines are skipped.
//! Positions are 0-based and the `L R` pairs name inclusive ranges.
//!
//! ```text
//! insert POS VALUE    push VALUE       erase POS
//! add L R DELTA       reverse L R
//! sum L R             min L R          max L R
//! kth K               get POS          len          print
//! ```
//!
//! Query commands, and `erase` (which echoes the removed value), each produce
//! one output line.

use std::sync::OnceLock;

use log::{debug, trace};
use regex::Regex;
use thiserror::Error;

use crate::{AggregateKind, ImplicitTreap, TreapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Insert { pos: usize, value: i64 },
    Push { value: i64 },
    Erase { pos: usize },
    Add { l: usize, r: usize, delta: i64 },
    Reverse { l: usize, r: usize },
    Query { kind: AggregateKind, l: usize, r: usize },
    Kth { k: usize },
    Get { pos: usize },
    Len,
    Print,
}

/// A parsed command together with the 1-based script line it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub line: usize,
    pub op: Op,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{name}`")]
    UnknownCommand { line: usize, name: String },
    #[error("line {line}: `{name}` takes {expected} argument(s), got {found}")]
    Arity {
        line: usize,
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: `{token}` is not a valid {what}")]
    BadNumber {
        line: usize,
        token: String,
        what: &'static str,
    },
    #[error("line {line}: cannot parse `{text}`")]
    Malformed { line: usize, text: String },
    #[error("line {line}: {source}")]
    Execution {
        line: usize,
        #[source]
        source: TreapError,
    },
}

fn statement() -> &'static Regex {
    static STATEMENT: OnceLock<Regex> = OnceLock::new();
    STATEMENT.get_or_init(|| {
        Regex::new(r"^\s*([a-z]+)((?:\s+[+-]?\d+)*)\s*$").expect("statement pattern is valid")
    })
}

/// Parse a whole script, stopping at the first bad line
pub fn parse(source: &str) -> Result<Vec<Command>, ScriptError> {
    let mut commands = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let text = match raw.find('#') {
            Some(cut) => &raw[..cut],
            None => raw,
        };
        if text.trim().is_empty() {
            continue;
        }
        let op = parse_line(line, text)?;
        trace!("line {line}: {op:?}");
        commands.push(Command { line, op });
    }
    debug!("parsed {} command(s)", commands.len());
    Ok(commands)
}

fn parse_line(line: usize, text: &str) -> Result<Op, ScriptError> {
    let caps = statement().captures(text).ok_or_else(|| ScriptError::Malformed {
        line,
        text: text.trim().to_owned(),
    })?;
    let name = &caps[1];
    let args: Vec<&str> = caps
        .get(2)
        .map_or("", |m| m.as_str())
        .split_whitespace()
        .collect();
    let args = Args { line, args: &args };

    let op = match name {
        "insert" => {
            args.expect("insert", 2)?;
            Op::Insert {
                pos: args.index(0)?,
                value: args.value(1)?,
            }
        }
        "push" => {
            args.expect("push", 1)?;
            Op::Push { value: args.value(0)? }
        }
        "erase" => {
            args.expect("erase", 1)?;
            Op::Erase { pos: args.index(0)? }
        }
        "add" => {
            args.expect("add", 3)?;
            Op::Add {
                l: args.index(0)?,
                r: args.index(1)?,
                delta: args.value(2)?,
            }
        }
        "reverse" => {
            args.expect("reverse", 2)?;
            Op::Reverse {
                l: args.index(0)?,
                r: args.index(1)?,
            }
        }
        "sum" | "min" | "max" => {
            let (name, kind) = match name {
                "sum" => ("sum", AggregateKind::Sum),
                "min" => ("min", AggregateKind::Min),
                _ => ("max", AggregateKind::Max),
            };
            args.expect(name, 2)?;
            Op::Query {
                kind,
                l: args.index(0)?,
                r: args.index(1)?,
            }
        }
        "kth" => {
            args.expect("kth", 1)?;
            Op::Kth { k: args.index(0)? }
        }
        "get" => {
            args.expect("get", 1)?;
            Op::Get { pos: args.index(0)? }
        }
        "len" => {
            args.expect("len", 0)?;
            Op::Len
        }
        "print" => {
            args.expect("print", 0)?;
            Op::Print
        }
        _ => {
            return Err(ScriptError::UnknownCommand {
                line,
                name: name.to_owned(),
            })
        }
    };
    Ok(op)
}

struct Args<'a> {
    line: usize,
    args: &'a [&'a str],
}

impl Args<'_> {
    fn expect(&self, name: &'static str, expected: usize) -> Result<(), ScriptError> {
        if self.args.len() == expected {
            Ok(())
        } else {
            Err(ScriptError::Arity {
                line: self.line,
                name,
                expected,
                found: self.args.len(),
            })
        }
    }

    fn index(&self, at: usize) -> Result<usize, ScriptError> {
        let token = self.args[at];
        token.parse().map_err(|_| ScriptError::BadNumber {
            line: self.line,
            token: token.to_owned(),
            what: "position",
        })
    }

    fn value(&self, at: usize) -> Result<i64, ScriptError> {
        let token = self.args[at];
        token.parse().map_err(|_| ScriptError::BadNumber {
            line: self.line,
            token: token.to_owned(),
            what: "value",
        })
    }
}

/// Execute `commands` against `treap`, collecting one line per query
///
/// Execution stops at the first rejected command. Commands before it have
/// already been applied; the rejected one has not.
pub fn run(
    treap: &mut ImplicitTreap<i64>,
    commands: &[Command],
) -> Result<Vec<String>, ScriptError> {
    let mut output = Vec::new();
    for &Command { line, op } in commands {
        let at = |source| ScriptError::Execution { line, source };
        match op {
            Op::Insert { pos, value } => {
                treap.insert_at(pos, value).map_err(at)?;
            }
            Op::Push { value } => {
                treap.push_back(value);
            }
            Op::Erase { pos } => {
                let removed = treap.erase_at(pos).map_err(at)?;
                output.push(removed.to_string());
            }
            Op::Add { l, r, delta } => treap.range_add(l..=r, delta).map_err(at)?,
            Op::Reverse { l, r } => treap.range_reverse(l..=r).map_err(at)?,
            Op::Query { kind, l, r } => {
                let answer = treap.range_query(l..=r, kind).map_err(at)?;
                output.push(answer.to_string());
            }
            Op::Kth { k } => {
                let value = treap.kth_element(k).map_err(at)?;
                output.push(value.to_string());
            }
            Op::Get { pos } => {
                let len = treap.len();
                let value = treap
                    .get(pos)
                    .ok_or(at(TreapError::IndexOutOfBounds { index: pos, len }))?;
                output.push(value.to_string());
            }
            Op::Len => output.push(treap.len().to_string()),
            Op::Print => {
                let values: Vec<String> = treap.iter().map(|v| v.to_string()).collect();
                output.push(values.join(" "));
            }
        }
    }
    Ok(output)
}
