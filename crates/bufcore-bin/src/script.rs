//! Line-oriented edit scripts replayed against a [`Buffers`] registry.
//!
//! One command per line; blank lines and lines starting with `#` are
//! skipped. Every line that succeeds closes an undo group, the way an
//! interactive command loop would. Commands other than `root` act on the
//! current buffer.
//!
//! ```text
//! root notes
//! insert hello\nworld
//! narrow 0 5
//! overlay hl 0 5
//! put hl face bold
//! undo
//! print
//! ```

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result, anyhow, bail};
use core_state::{Buffers, OverlayId, Truncation, UndoLimits, Value, ViewId};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Root(String),
    Indirect { base: String, name: String },
    Switch(String),
    Kill(String),
    Insert(String),
    Goto(usize),
    Delete(usize, usize),
    Erase,
    Narrow(usize, usize),
    Widen,
    ReadOnly(bool),
    Overlay { name: String, start: usize, end: usize },
    Put { overlay: String, key: String, value: Value },
    DeleteOverlay(String),
    ClearOverlays,
    Property { begin: usize, end: usize, key: String, old: Value },
    Undo,
    Truncate,
    Reclaim,
    Print,
    Overlays,
}

impl Command {
    /// Parse one script line. `Ok(None)` for blanks and comments.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let args: Vec<&str> = rest.split_whitespace().collect();
        let cmd = match word {
            "root" => Command::Root(one(&args)?.to_owned()),
            "indirect" => {
                let [base, name] = two(&args)?;
                Command::Indirect {
                    base: base.to_owned(),
                    name: name.to_owned(),
                }
            }
            "switch" => Command::Switch(one(&args)?.to_owned()),
            "kill" => Command::Kill(one(&args)?.to_owned()),
            "insert" => Command::Insert(unescape(rest)),
            "goto" => Command::Goto(position(one(&args)?)?),
            "delete" => {
                let [b, e] = two(&args)?;
                Command::Delete(position(b)?, position(e)?)
            }
            "erase" => Command::Erase,
            "narrow" => {
                let [b, e] = two(&args)?;
                Command::Narrow(position(b)?, position(e)?)
            }
            "widen" => Command::Widen,
            "read-only" => match one(&args)? {
                "true" => Command::ReadOnly(true),
                "false" => Command::ReadOnly(false),
                other => bail!("read-only takes true or false, not `{other}`"),
            },
            "overlay" => match args.as_slice() {
                [name, start, end] => Command::Overlay {
                    name: (*name).to_owned(),
                    start: position(start)?,
                    end: position(end)?,
                },
                _ => bail!("usage: overlay <name> <start> <end>"),
            },
            "put" => match args.as_slice() {
                [overlay, key, value @ ..] if !value.is_empty() => Command::Put {
                    overlay: (*overlay).to_owned(),
                    key: (*key).to_owned(),
                    value: parse_value(&value.join(" ")),
                },
                _ => bail!("usage: put <overlay> <key> <value>"),
            },
            "delete-overlay" => Command::DeleteOverlay(one(&args)?.to_owned()),
            "clear-overlays" => Command::ClearOverlays,
            "property" => match args.as_slice() {
                [begin, end, key, old @ ..] if !old.is_empty() => Command::Property {
                    begin: position(begin)?,
                    end: position(end)?,
                    key: (*key).to_owned(),
                    old: parse_value(&old.join(" ")),
                },
                _ => bail!("usage: property <begin> <end> <key> <old-value>"),
            },
            "undo" => Command::Undo,
            "truncate" => Command::Truncate,
            "reclaim" => Command::Reclaim,
            "print" => Command::Print,
            "overlays" => Command::Overlays,
            other => bail!("unknown command `{other}`"),
        };
        Ok(Some(cmd))
    }
}

fn one<'a>(args: &[&'a str]) -> Result<&'a str> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(anyhow!("expected one argument, got {}", args.len())),
    }
}

fn two<'a>(args: &[&'a str]) -> Result<[&'a str; 2]> {
    match args {
        [a, b] => Ok([*a, *b]),
        _ => Err(anyhow!("expected two arguments, got {}", args.len())),
    }
}

fn position(arg: &str) -> Result<usize> {
    arg.parse()
        .with_context(|| format!("`{arg}` is not a position"))
}

/// Integers, `true`/`false` and `nil` are typed; anything else is a string.
fn parse_value(raw: &str) -> Value {
    match raw {
        "nil" => Value::Nil,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Str(unescape(raw))),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn render(value: &Value) -> String {
    match value {
        Value::Nil => "nil".into(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Str(s) => format!("{s:?}"),
        Value::Symbol(s) => s.to_string(),
    }
}

/// Registry plus the script's overlay names and output sink.
pub struct Session<W: Write> {
    buffers: Buffers,
    overlays: HashMap<String, OverlayId>,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(limits: UndoLimits, out: W) -> Self {
        Self {
            buffers: Buffers::with_limits(limits),
            overlays: HashMap::new(),
            out,
        }
    }

    pub fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run every line of `script`, stopping at the first failure.
    pub fn run(&mut self, script: &str) -> Result<()> {
        let mut executed = 0usize;
        for (idx, line) in script.lines().enumerate() {
            let lineno = idx + 1;
            let Some(cmd) = Command::parse(line).with_context(|| format!("line {lineno}"))? else {
                continue;
            };
            self.execute(&cmd)
                .with_context(|| format!("line {lineno}: {}", line.trim()))?;
            if let Some(view) = self.buffers.current() {
                self.buffers.undo_boundary(view)?;
            }
            executed += 1;
        }
        info!(target: "script", executed, "script_complete");
        self.out.flush()?;
        Ok(())
    }

    pub fn execute(&mut self, cmd: &Command) -> Result<()> {
        debug!(target: "script", ?cmd, "execute");
        match cmd {
            Command::Root(name) => {
                let view = self.buffers.create_root(name);
                self.buffers.set_current(view)?;
            }
            Command::Indirect { base, name } => {
                let base = self.lookup(base)?;
                let view = self.buffers.create_indirect(base, name)?;
                self.buffers.set_current(view)?;
            }
            Command::Switch(name) => {
                let view = self.lookup(name)?;
                self.buffers.set_current(view)?;
            }
            Command::Kill(name) => {
                let view = self.lookup(name)?;
                self.buffers.kill(view)?;
            }
            Command::Insert(text) => {
                let view = self.current()?;
                self.buffers.insert(view, text)?;
            }
            Command::Goto(pos) => {
                let view = self.current()?;
                self.buffers.goto_char(view, *pos)?;
            }
            Command::Delete(begin, end) => {
                let view = self.current()?;
                self.buffers.delete_region(view, *begin, *end)?;
            }
            Command::Erase => {
                let view = self.current()?;
                self.buffers.erase(view)?;
            }
            Command::Narrow(begin, end) => {
                let view = self.current()?;
                self.buffers.narrow(view, *begin, *end)?;
            }
            Command::Widen => {
                let view = self.current()?;
                self.buffers.widen(view)?;
            }
            Command::ReadOnly(read_only) => {
                let view = self.current()?;
                self.buffers.set_read_only(view, *read_only)?;
            }
            Command::Overlay { name, start, end } => {
                let view = self.current()?;
                let id = self.buffers.make_overlay(view, *start, *end)?;
                self.overlays.insert(name.clone(), id);
            }
            Command::Put {
                overlay,
                key,
                value,
            } => {
                let id = self.overlay(overlay)?;
                self.buffers.overlay_put(id, key.as_str(), value.clone())?;
            }
            Command::DeleteOverlay(name) => {
                let id = self.overlay(name)?;
                self.buffers.delete_overlay(id)?;
            }
            Command::ClearOverlays => {
                let view = self.current()?;
                self.buffers.delete_all_overlays(view)?;
            }
            Command::Property {
                begin,
                end,
                key,
                old,
            } => {
                let view = self.current()?;
                let length = end.checked_sub(*begin).ok_or_else(|| {
                    anyhow!("property range {begin}..{end} is reversed")
                })?;
                self.buffers
                    .record_property_change(view, *begin, length, key.as_str(), old.clone())?;
            }
            Command::Undo => {
                let view = self.current()?;
                self.buffers.undo(view)?;
            }
            Command::Truncate => {
                let view = self.current()?;
                let outcome = self.buffers.truncate_undo(view)?;
                let name = self.buffers.name(view)?.to_owned();
                self.report_truncation(&name, outcome)?;
            }
            Command::Reclaim => {
                for (root, outcome) in self.buffers.reclaim()? {
                    let name = self.buffers.name(root)?.to_owned();
                    self.report_truncation(&name, outcome)?;
                }
            }
            Command::Print => {
                let view = self.current()?;
                let name = self.buffers.name(view)?;
                let text = self.buffers.text(view)?;
                let point = self.buffers.point(view)?;
                writeln!(self.out, "{name} [{point}]: {text:?}")?;
            }
            Command::Overlays => self.print_overlays()?,
        }
        Ok(())
    }

    fn print_overlays(&mut self) -> Result<()> {
        let view = self.current()?;
        let (begin, end) = (self.buffers.point_min(view)?, self.buffers.point_max(view)?);
        let live = self.buffers.overlays_in(view, begin, end)?;
        let mut named: Vec<(&String, &OverlayId)> = self
            .overlays
            .iter()
            .filter(|(_, id)| live.contains(id))
            .collect();
        named.sort_by_key(|(_, id)| **id);
        for (name, id) in named {
            let start = self.buffers.overlay_start(*id)?.unwrap_or_default();
            let end = self.buffers.overlay_end(*id)?.unwrap_or_default();
            let props: Vec<String> = self
                .buffers
                .overlay_properties(*id)?
                .iter()
                .map(|(k, v)| format!("{k}={}", render(v)))
                .collect();
            writeln!(self.out, "{name} {start}..{end} {}", props.join(" "))?;
        }
        Ok(())
    }

    fn report_truncation(&mut self, name: &str, outcome: Truncation) -> Result<()> {
        match outcome {
            Truncation::Unchanged => writeln!(self.out, "{name}: undo unchanged")?,
            Truncation::Handled { size } => {
                writeln!(self.out, "{name}: undo handled at {size}")?
            }
            Truncation::Severed { kept, discarded } => writeln!(
                self.out,
                "{name}: undo kept {kept}, discarded {discarded}"
            )?,
        }
        Ok(())
    }

    fn current(&self) -> Result<ViewId> {
        self.buffers
            .current()
            .ok_or_else(|| anyhow!("no current buffer; start with `root <name>`"))
    }

    fn lookup(&self, name: &str) -> Result<ViewId> {
        self.buffers
            .get_buffer(name)
            .ok_or_else(|| anyhow!("no buffer named `{name}`"))
    }

    fn overlay(&self, name: &str) -> Result<OverlayId> {
        self.overlays
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("no overlay named `{name}`"))
    }
}
