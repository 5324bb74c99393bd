//! Interactive shell for a loaded session
//!
//! ```text
//! .tables                       List tables
//! .sheet [name]                 Show or select the active sheet
//! .edit <row> <column> = <val>  Edit a cell of the active sheet
//! .export [sheet]               Export the last result, or a sheet
//! .context <request>            Show the text-to-SQL prompt for a request
//! .history [n]                  Show recent statements
//! .history save <path>          Write the history as JSON lines
//! .help                         Show help
//! .quit                         Exit
//! <sql>                         Run a statement
//! ```

use std::borrow::Cow;
use std::io::BufWriter;
use std::path::PathBuf;

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{Highlighter, MatchingBracketHighlighter};
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::DefaultHistory;
use rustyline::validate::{MatchingBracketValidator, ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, CompletionType, Config, Context, EditMode, Editor, KeyEvent};
use sheetql::{CellValue, ExportTarget, Result, Session, SheetqlError};

use crate::cli_format::{format_result, format_tables, OutputFormat};

const MAX_HISTORY: usize = 1000;
const DEFAULT_HISTORY_ROWS: usize = 20;

const DOT_COMMANDS: &[&str] = &[
    ".tables", ".sheet", ".edit", ".export", ".context", ".history", ".help", ".quit",
];

/// Input parsed from one shell line
#[derive(Debug, PartialEq)]
enum Command {
    Tables,
    Sheet(Option<String>),
    Edit {
        row: usize,
        column: String,
        value: String,
    },
    Export(Option<String>),
    Context(String),
    History(usize),
    SaveHistory(PathBuf),
    Help,
    Quit,
    Sql(String),
    Unknown(String),
}

impl Command {
    fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if !trimmed.starts_with('.') {
            return Command::Sql(trimmed.to_string());
        }

        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        match head.to_lowercase().as_str() {
            ".tables" | ".t" => Command::Tables,
            ".sheet" | ".use" => Command::Sheet(arg),
            ".edit" => Self::parse_edit(rest),
            ".export" => Command::Export(arg),
            ".context" => match arg {
                Some(request) => Command::Context(request),
                None => Command::Unknown(".context: missing request".to_string()),
            },
            ".history" => match rest {
                "" => Command::History(DEFAULT_HISTORY_ROWS),
                "save" => Command::Unknown(".history save: missing path".to_string()),
                save if save.starts_with("save ") => {
                    Command::SaveHistory(PathBuf::from(save["save ".len()..].trim()))
                }
                n => match n.parse() {
                    Ok(n) => Command::History(n),
                    Err(_) => Command::Unknown(format!(".history: not a number: {}", n)),
                },
            },
            ".help" | ".h" | ".?" => Command::Help,
            ".quit" | ".exit" | ".q" => Command::Quit,
            other => Command::Unknown(format!("unknown command: {}", other)),
        }
    }

    fn parse_edit(rest: &str) -> Self {
        const USAGE: &str = ".edit: expected '<row> <column> = <value>'";
        let Some((target, value)) = rest.split_once('=') else {
            return Command::Unknown(USAGE.to_string());
        };
        let Some((row, column)) = target.trim().split_once(char::is_whitespace) else {
            return Command::Unknown(USAGE.to_string());
        };
        match row.parse() {
            Ok(row) if !column.trim().is_empty() => Command::Edit {
                row,
                column: column.trim().to_string(),
                value: value.trim().to_string(),
            },
            _ => Command::Unknown(USAGE.to_string()),
        }
    }
}

/// Completions for dot-commands, sheet names and column names
struct ShellHelper {
    sheets: Vec<String>,
    words: Vec<String>,
    highlighter: MatchingBracketHighlighter,
    hinter: HistoryHinter,
    validator: MatchingBracketValidator,
}

impl rustyline::Helper for ShellHelper {}

impl ShellHelper {
    fn new(session: &Session) -> Self {
        let mut helper = Self {
            sheets: Vec::new(),
            words: Vec::new(),
            highlighter: MatchingBracketHighlighter::new(),
            hinter: HistoryHinter::new(),
            validator: MatchingBracketValidator::new(),
        };
        helper.refresh(session);
        helper
    }

    fn refresh(&mut self, session: &Session) {
        self.sheets = session.sheet_names().into_iter().map(str::to_string).collect();
        self.words = session
            .tables()
            .into_iter()
            .flat_map(|t| {
                std::iter::once(t.canonical_name)
                    .chain(t.columns.into_iter().map(|c| c.canonical_name))
            })
            .collect();
        self.words.sort();
        self.words.dedup();
    }
}

fn pairs<'a>(candidates: impl Iterator<Item = &'a str>, prefix: &str) -> Vec<Pair> {
    let prefix = prefix.to_lowercase();
    candidates
        .filter(|c| c.to_lowercase().starts_with(&prefix))
        .map(|c| Pair {
            display: c.to_string(),
            replacement: c.to_string(),
        })
        .collect()
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<Pair>), ReadlineError> {
        let line_up_to_cursor = &line[..pos];
        let start = line_up_to_cursor
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line_up_to_cursor[start..];

        if start == 0 && word.starts_with('.') {
            return Ok((0, pairs(DOT_COMMANDS.iter().copied(), word)));
        }
        if line_up_to_cursor.starts_with(".sheet ") || line_up_to_cursor.starts_with(".export ") {
            return Ok((start, pairs(self.sheets.iter().map(String::as_str), word)));
        }
        if word.is_empty() {
            return Ok((pos, vec![]));
        }
        Ok((start, pairs(self.words.iter().map(String::as_str), word)))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        self.highlighter.highlight(line, pos)
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(&'s self, prompt: &'p str, default: bool) -> Cow<'b, str> {
        if default {
            Cow::Owned(prompt.green().bold().to_string())
        } else {
            Cow::Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }

    fn highlight_char(&self, line: &str, pos: usize, forced: bool) -> bool {
        self.highlighter.highlight_char(line, pos, forced)
    }
}

impl Validator for ShellHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        self.validator.validate(ctx)
    }

    fn validate_while_typing(&self) -> bool {
        self.validator.validate_while_typing()
    }
}

fn shell_error(err: ReadlineError) -> SheetqlError {
    SheetqlError::Io(std::io::Error::other(err))
}

fn history_file() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("sheetql").join("shell_history"))
}

fn prompt(session: &Session) -> String {
    match session.active_sheet() {
        Some(sheet) => format!("sheetql({})> ", sheet),
        None => "sheetql> ".to_string(),
    }
}

/// Run the interactive shell until `.quit` or end of input.
pub(crate) fn run_shell(session: &mut Session) -> Result<()> {
    let rl_config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .max_history_size(MAX_HISTORY)
        .map_err(shell_error)?
        .build();

    let mut rl: Editor<ShellHelper, DefaultHistory> =
        Editor::with_config(rl_config).map_err(shell_error)?;
    rl.set_helper(Some(ShellHelper::new(session)));
    rl.bind_sequence(KeyEvent::ctrl('c'), Cmd::Interrupt);

    let history_path = history_file();
    if let Some(ref path) = history_path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let _ = rl.load_history(path);
    }

    println!();
    println!("{}", "SheetQL Interactive Shell".cyan().bold());
    println!("Type '.help' for commands, '.quit' to quit");
    println!();

    loop {
        match rl.readline(&prompt(session)) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line).map_err(shell_error)?;

                let command = Command::parse(line);
                if command == Command::Quit {
                    println!("Goodbye!");
                    break;
                }
                let refresh = matches!(command, Command::Sql(_));
                dispatch(session, command);
                if refresh {
                    // Statements may create or drop tables.
                    if let Some(helper) = rl.helper_mut() {
                        helper.refresh(session);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("{} {}", "✗".red(), err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }
    Ok(())
}

fn dispatch(session: &mut Session, command: Command) {
    match command {
        Command::Tables => println!("{}", format_tables(&session.tables(), OutputFormat::Text)),
        Command::Sheet(None) => match session.active_sheet() {
            Some(sheet) => println!("Active sheet: {}", sheet),
            None => println!("No active sheet"),
        },
        Command::Sheet(Some(name)) => match session.select_sheet(&name) {
            Ok(()) => println!("Selected sheet: {}", session.active_sheet().unwrap_or(&name)),
            Err(e) => report(&e),
        },
        Command::Edit { row, column, value } => {
            let Some(sheet) = session.active_sheet().map(str::to_string) else {
                println!("No sheet selected. Use '.sheet <name>' first.");
                return;
            };
            match session.set_cell(&sheet, row, &column, CellValue::infer_from_text(&value)) {
                Ok(()) => println!("{} Updated {}[{}].{}", "✓".green(), sheet, row, column),
                Err(e) => report(&e),
            }
        }
        Command::Export(target) => {
            let target = match target {
                Some(sheet) => ExportTarget::Sheet(sheet),
                None => ExportTarget::LastResult,
            };
            match session.export_to_dir(&target) {
                Ok(path) => println!("{} Exported to {}", "✓".green(), path.display()),
                Err(e) => report(&e),
            }
        }
        Command::Context(request) => match session.prompt_context(&request).and_then(|c| c.render()) {
            Ok(text) => println!("{}", text),
            Err(e) => report(&e),
        },
        Command::History(n) => {
            if session.history().is_empty() {
                println!("No statements yet");
            }
            for entry in session.history().recent(n) {
                let mark = if entry.success { "✓".green() } else { "✗".red() };
                println!(
                    "{} {} {}",
                    entry.executed_at.format("%H:%M:%S").to_string().dimmed(),
                    mark,
                    truncate(&entry.statement, 100)
                );
            }
        }
        Command::SaveHistory(path) => {
            let written = std::fs::File::create(&path)
                .map_err(SheetqlError::from)
                .and_then(|file| session.history().write_json_lines(BufWriter::new(file)));
            match written {
                Ok(()) => println!("{} Saved history to {}", "✓".green(), path.display()),
                Err(e) => report(&e),
            }
        }
        Command::Help => print_help(),
        Command::Quit => {}
        Command::Sql(sql) => {
            let outcome = session.execute(&sql);
            println!("{}", format_result(&outcome.result, OutputFormat::Text));
            if let Some(notice) = outcome.notice {
                println!("{} {}", "ℹ".blue(), notice);
            }
        }
        Command::Unknown(msg) => {
            if !msg.is_empty() {
                println!("{}", msg);
            }
        }
    }
}

fn report(err: &SheetqlError) {
    println!("{} {}", "✗".red(), err);
    if let Some(hint) = err.hint() {
        println!("  {} {}", "hint:".yellow(), hint);
    }
}

fn print_help() {
    println!();
    println!("{}", "Commands".bold());
    println!("  .tables                        List tables");
    println!("  .sheet [name]                  Show or select the active sheet");
    println!("  .edit <row> <column> = <value> Edit a cell of the active sheet");
    println!("  .export [sheet]                Export the last result, or a sheet");
    println!("  .context <request>             Show the text-to-SQL prompt for a request");
    println!("  .history [n]                   Show recent statements");
    println!("  .history save <path>           Write the history as JSON lines");
    println!("  .help                          Show this help");
    println!("  .quit                          Exit the shell");
    println!();
    println!("Anything else runs as SQL, e.g.");
    println!("  select * from sales where amount > 100");
    println!();
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
