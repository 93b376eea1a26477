use crate::config::Config;
use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Args;
use colored::Colorize;
use redline_editor::{
    AnnotationKind, AnnotationSpan, Batch, Document, Editor, EditorError, HighlightRequest,
    ManualClock, ReviewScope, Selection, Step,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Script to replay (JSON)
    pub script: PathBuf,

    /// Output format (text, json)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Config file (defaults to redline.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Scripted editing session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Initial document text
    pub text: String,

    /// Clock start in epoch milliseconds (defaults to now)
    #[serde(default)]
    pub start_ms: Option<i64>,

    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    Track {
        enabled: bool,
    },
    Author {
        id: String,
        name: String,
    },
    Insert {
        at: usize,
        text: String,
    },
    Delete {
        from: usize,
        to: usize,
    },
    Replace {
        from: usize,
        to: usize,
        text: String,
    },
    /// Raw steps submitted as one batch
    Batch {
        steps: Vec<Step>,
        #[serde(default)]
        selection: Option<Selection>,
    },
    Select {
        anchor: usize,
        #[serde(default)]
        head: Option<usize>,
    },
    CompositionStart,
    CompositionUpdate,
    CompositionEnd,
    Accept {
        #[serde(flatten)]
        target: ReviewTarget,
    },
    Reject {
        #[serde(flatten)]
        target: ReviewTarget,
    },
    Undo,
    Redo,
    Remote {
        steps: Vec<Step>,
    },
    Highlight {
        #[serde(flatten)]
        request: HighlightRequest,
    },
    Advance {
        ms: i64,
    },
    Tick,
}

/// Explicit range, or a scope (selection when omitted)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewTarget {
    #[serde(default)]
    pub scope: Option<ReviewScope>,

    #[serde(default)]
    pub from: Option<usize>,

    #[serde(default)]
    pub to: Option<usize>,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Track { .. } => "track",
            Action::Author { .. } => "author",
            Action::Insert { .. } => "insert",
            Action::Delete { .. } => "delete",
            Action::Replace { .. } => "replace",
            Action::Batch { .. } => "batch",
            Action::Select { .. } => "select",
            Action::CompositionStart => "compositionStart",
            Action::CompositionUpdate => "compositionUpdate",
            Action::CompositionEnd => "compositionEnd",
            Action::Accept { .. } => "accept",
            Action::Reject { .. } => "reject",
            Action::Undo => "undo",
            Action::Redo => "redo",
            Action::Remote { .. } => "remote",
            Action::Highlight { .. } => "highlight",
            Action::Advance { .. } => "advance",
            Action::Tick => "tick",
        }
    }
}

/// What one action did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepLog {
    pub index: usize,
    pub action: &'static str,
    pub detail: String,
    pub ok: bool,
}

/// Final state after a replay
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutput {
    pub text: String,
    pub accepted_text: String,
    pub original_text: String,
    pub annotations: Vec<AnnotationSpan>,
    pub selection: Selection,
    pub version: u64,
    pub tracking: bool,
    pub log: Vec<StepLog>,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd, args.config.as_deref())?;
    let format = args
        .format
        .or_else(|| config.format.clone())
        .unwrap_or_else(|| "text".to_string());

    let script = load_script(&args.script)?;
    let output = run_script(&script, &config)?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&output)?),
        "text" => print_text(&args.script, &output),
        other => return Err(anyhow::anyhow!("Unknown format: {}. Use: text or json", other)),
    }

    Ok(())
}

fn load_script(path: &Path) -> Result<Script> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Cannot read script {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid script {}", path.display()))
}

/// Run every action of `script` against a fresh editor
pub fn run_script(script: &Script, config: &Config) -> Result<ReplayOutput> {
    let start = match script.start_ms {
        Some(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| anyhow::anyhow!("Invalid startMs: {}", ms))?,
        None => Utc::now(),
    };
    let clock = ManualClock::new(start);
    let mut editor = Editor::with_clock(
        Document::from_text(&script.text),
        &config.editor,
        Arc::new(clock.clone()),
    );

    let mut log = Vec::with_capacity(script.actions.len());
    for (index, action) in script.actions.iter().enumerate() {
        debug!(index, action = action.name(), "Replaying action");
        let entry = match apply(&mut editor, &clock, action) {
            Ok(detail) => StepLog {
                index,
                action: action.name(),
                detail,
                ok: true,
            },
            // Nothing to review is reported, not fatal
            Err(err) if err.is_noop() => StepLog {
                index,
                action: action.name(),
                detail: err.to_string(),
                ok: false,
            },
            Err(err) => {
                return Err(err).with_context(|| format!("Action #{} ({}) failed", index, action.name()))
            }
        };
        log.push(entry);
    }

    let document = editor.document();
    Ok(ReplayOutput {
        text: document.text(),
        accepted_text: document.accepted_text(),
        original_text: document.original_text(),
        annotations: editor.annotations().to_vec(),
        selection: editor.selection(),
        version: editor.version(),
        tracking: editor.tracking_enabled(),
        log,
    })
}

fn apply(editor: &mut Editor, clock: &ManualClock, action: &Action) -> Result<String, EditorError> {
    let detail = match action {
        Action::Track { enabled } => {
            editor.set_tracking_enabled(*enabled);
            format!("tracking {}", if *enabled { "on" } else { "off" })
        }
        Action::Author { id, name } => {
            editor.update_author(id, name);
            format!("author {} ({})", name, id)
        }
        Action::Insert { at, text } => {
            let report = editor.submit(Batch::insert(*at, text))?;
            format!("{:?} at {} → caret {}", text, at, report.selection.head)
        }
        Action::Delete { from, to } => {
            let report = editor.submit(Batch::delete(*from, *to))?;
            format!("{}..{} → caret {}", from, to, report.selection.head)
        }
        Action::Replace { from, to, text } => {
            let report = editor.submit(Batch::replace(*from, *to, text))?;
            format!("{}..{} with {:?} → caret {}", from, to, text, report.selection.head)
        }
        Action::Batch { steps, selection } => {
            let mut batch = Batch::new(steps.clone());
            if let Some(selection) = selection {
                batch = batch.with_selection(*selection);
            }
            let report = editor.submit(batch)?;
            format!("{} steps → {:?}", steps.len(), report.outcome)
        }
        Action::Select { anchor, head } => {
            let selection = Selection::range(*anchor, head.unwrap_or(*anchor));
            editor.set_selection(selection)?;
            format!("{}..{}", selection.anchor, selection.head)
        }
        Action::CompositionStart => {
            editor.composition_start();
            "composition started".to_string()
        }
        Action::CompositionUpdate => {
            editor.composition_update();
            "composition updated".to_string()
        }
        Action::CompositionEnd => {
            editor.composition_end();
            "composition ended".to_string()
        }
        Action::Accept { target } | Action::Reject { target } => {
            let accept = matches!(action, Action::Accept { .. });
            let report = match (target.from, target.to) {
                (Some(from), Some(to)) if accept => editor.accept_range(from, to)?,
                (Some(from), Some(to)) => editor.reject_range(from, to)?,
                _ => {
                    let scope = target.scope.unwrap_or(ReviewScope::Selection);
                    if accept {
                        editor.accept(scope)?
                    } else {
                        editor.reject(scope)?
                    }
                }
            };
            format!(
                "{} change(s) in {}..{}, {} removed",
                report.acted.len(),
                report.resolved.0,
                report.resolved.1,
                report.removed
            )
        }
        Action::Undo => {
            let label = history_label(editor.history().undo_description());
            match editor.undo()? {
                Some(report) => format!("{}→ version {}", label, report.version),
                None => "nothing to undo".to_string(),
            }
        }
        Action::Redo => {
            let label = history_label(editor.history().redo_description());
            match editor.redo()? {
                Some(report) => format!("{}→ version {}", label, report.version),
                None => "nothing to redo".to_string(),
            }
        }
        Action::Remote { steps } => {
            editor.apply_remote(steps.clone())?;
            format!("{} remote steps", steps.len())
        }
        Action::Highlight { request } => match editor.highlight_lines(request.clone())? {
            Some(_) => format!("lines {}..={}", request.start_line, request.end_line),
            None => "empty line range".to_string(),
        },
        Action::Advance { ms } => {
            clock.advance(chrono::Duration::milliseconds(*ms));
            let fired = editor.tick()?;
            format!("+{}ms, {} timer(s) fired", ms, fired.len())
        }
        Action::Tick => {
            let fired = editor.tick()?;
            format!("{} timer(s) fired", fired.len())
        }
    };
    Ok(detail)
}

fn history_label(description: Option<&str>) -> String {
    description.map(|label| format!("{} ", label)).unwrap_or_default()
}

fn print_text(script: &Path, output: &ReplayOutput) {
    println!("▶️  {} {}", "Replaying".green().bold(), script.display());
    println!();

    for entry in &output.log {
        let mark = if entry.ok { "✓".green() } else { "✗".yellow() };
        println!("  {} {:>3} {:<18} {}", mark, entry.index, entry.action, entry.detail);
    }

    println!();
    println!("{}", "Document".bright_white().bold());
    println!("  {}", render_marked(output));
    println!();

    if output.annotations.is_empty() {
        println!("  No tracked changes");
    } else {
        println!("{}", "Tracked changes".bright_white().bold());
        for span in &output.annotations {
            let kind = match span.kind {
                AnnotationKind::Insertion => "insertion".green(),
                AnnotationKind::Deletion => "deletion".red(),
            };
            println!(
                "  {:<10} {:>4}..{:<4} {} ({}) minute {}",
                kind, span.from, span.to, span.author_name, span.author_id, span.minute
            );
        }
    }

    println!();
    println!("   Accepted: {:?}", output.accepted_text);
    println!("   Rejected: {:?}", output.original_text);
    println!(
        "   Tracking: {}   Version: {}   Selection: {}..{}",
        if output.tracking { "on" } else { "off" },
        output.version,
        output.selection.anchor,
        output.selection.head
    );
}

/// Document text with insertions as `{+...+}` and deletions as `[-...-]`
fn render_marked(output: &ReplayOutput) -> String {
    let chars: Vec<char> = output.text.chars().collect();
    let mut rendered = String::new();
    let mut pos = 0;
    for span in &output.annotations {
        rendered.extend(&chars[pos..span.from]);
        let inner: String = chars[span.from..span.to].iter().collect();
        let marked = match span.kind {
            AnnotationKind::Insertion => format!("{{+{}+}}", inner).green().to_string(),
            AnnotationKind::Deletion => format!("[-{}-]", inner).red().strikethrough().to_string(),
        };
        rendered.push_str(&marked);
        pos = span.to;
    }
    rendered.extend(&chars[pos..]);
    rendered.replace('\n', "⏎\n  ")
}
