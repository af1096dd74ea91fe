//! Parser for `.pipe` configuration files.
//!
//! Format:
//! ```text
//! # keep the two youngest, count them by name
//! SELECT Age 18 20
//! SELECT "Zip Code" "10027"
//! COMPUTE Name COUNT
//! ```
//!
//! - Lines starting with `#` are comments; blank lines are skipped
//! - Tokens are separated by whitespace; `"..."` quotes a token containing spaces
//! - Keywords and terminal names are case-insensitive
//! - `SELECT <column> <value>...` - keep records whose column equals one of the values.
//!   Quoted values are strings, bare values that parse as 64-bit integers are longs,
//!   other bare values are strings
//! - `COMPUTE <column> <terminal>` - one of COUNT, SUM, MIN, MAX, ALLSAME, FIRSTDIFF, STATS

use crate::computation::Terminal;
use crate::config::PipelineConfigBuilder;
use crate::error::{PipelineError, PipelineResult};
use crate::filter::Literal;

/// One parsed configuration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SELECT column value...
    Select { column: String, values: Vec<Literal> },
    /// COMPUTE column terminal
    Compute { column: String, terminal: Terminal },
}

impl Command {
    /// Keyword for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Select { .. } => "SELECT",
            Command::Compute { .. } => "COMPUTE",
        }
    }
}

/// A parsed command with the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub line: usize,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Bare(String),
    Quoted(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Bare(s) | Token::Quoted(s) => s,
        }
    }

    fn into_text(self) -> String {
        match self {
            Token::Bare(s) | Token::Quoted(s) => s,
        }
    }

    fn into_literal(self) -> Literal {
        match self {
            Token::Quoted(s) => Literal::Str(s),
            Token::Bare(s) => match s.parse::<i64>() {
                Ok(v) => Literal::Long(v),
                Err(_) => Literal::Str(s),
            },
        }
    }
}

/// Parse configuration text into commands.
pub fn parse_commands(text: &str) -> PipelineResult<Vec<Located>> {
    let mut commands = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = parse_command(line).map_err(|message| PipelineError::Parse {
            line: line_num + 1,
            message,
        })?;
        commands.push(Located {
            line: line_num + 1,
            command,
        });
    }

    Ok(commands)
}

/// Parse a single command line.
fn parse_command(line: &str) -> Result<Command, String> {
    let mut tokens = tokenize(line)?.into_iter();
    let keyword = tokens.next().ok_or("empty command")?;

    match keyword.text().to_ascii_uppercase().as_str() {
        "SELECT" => parse_select(tokens),
        "COMPUTE" => parse_compute(tokens),
        other => Err(format!("unknown command: {other} (expected SELECT or COMPUTE)")),
    }
}

/// Parse SELECT command.
fn parse_select(mut tokens: impl Iterator<Item = Token>) -> Result<Command, String> {
    let column = tokens
        .next()
        .ok_or("SELECT requires a column and at least one value")?
        .into_text();
    let values: Vec<Literal> = tokens.map(Token::into_literal).collect();
    if values.is_empty() {
        return Err(format!("SELECT {column} requires at least one value"));
    }
    Ok(Command::Select { column, values })
}

/// Parse COMPUTE command.
fn parse_compute(mut tokens: impl Iterator<Item = Token>) -> Result<Command, String> {
    let (Some(column), Some(terminal), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err("COMPUTE requires exactly a column and a terminal".to_string());
    };
    let terminal = terminal
        .text()
        .parse::<Terminal>()
        .map_err(|e| match e {
            PipelineError::Configuration { message } => message,
            other => other.to_string(),
        })?;
    Ok(Command::Compute {
        column: column.into_text(),
        terminal,
    })
}

/// Split a line into whitespace-separated tokens, honoring double quotes.
fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => text.push(ch),
                    None => return Err(format!("unterminated quote in: {line}")),
                }
            }
            tokens.push(Token::Quoted(text));
        } else {
            let mut text = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                text.push(ch);
                chars.next();
            }
            tokens.push(Token::Bare(text));
        }
    }

    Ok(tokens)
}

/// Apply parsed commands to a builder, in order.
///
/// Builder rejections are reported against the line that caused them.
pub fn apply_commands(
    mut builder: PipelineConfigBuilder,
    commands: &[Located],
) -> PipelineResult<PipelineConfigBuilder> {
    for Located { line, command } in commands {
        builder = match command.clone() {
            Command::Select { column, values } => {
                builder
                    .select_any(column, values)
                    .map_err(|e| PipelineError::Parse {
                        line: *line,
                        message: e.to_string(),
                    })?
            }
            Command::Compute { column, terminal } => builder.compute(column, terminal),
        };
    }
    Ok(builder)
}

/// Parse `text` and apply it to `builder`.
pub fn configure(
    builder: PipelineConfigBuilder,
    text: &str,
) -> PipelineResult<PipelineConfigBuilder> {
    let commands = parse_commands(text)?;
    apply_commands(builder, &commands)
}
