//! Shell-style splitting of command lines into argv tokens.
//!
//! Grammar (a POSIX `shlex` subset, no shell is ever invoked):
//!
//! * tokens are separated by runs of whitespace;
//! * a token is one or more adjacent pieces, concatenated;
//! * a piece is a bare run of characters (no whitespace, quotes or `\`),
//!   an escaped character `\x` (yields `x`), a single-quoted string (fully
//!   literal), or a double-quoted string in which `\` only escapes `"` and
//!   `\` (any other `\x` is kept as written);
//! * `''` and `""` yield an empty token.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:"(?:[^"\\]|\\[\s\S])*"|'[^']*'|\\[\s\S]|[^\s"'\\])+"#)
        .expect("word pattern is valid")
});

static PIECE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""((?:[^"\\]|\\[\s\S])*)"|'([^']*)'|\\([\s\S])|([^\s"'\\]+)"#)
        .expect("piece pattern is valid")
});

static DQUOTE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\([\s\S])"#).expect("escape pattern is valid"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unterminated quote or escape at byte {offset}")]
    Unterminated { offset: usize },
}

/// Split `line` into tokens.
pub fn split(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut argv = Vec::new();
    let mut cursor = 0;

    for word in WORD.find_iter(line) {
        check_gap(line, cursor, word.start())?;
        argv.push(unquote(word.as_str()));
        cursor = word.end();
    }
    check_gap(line, cursor, line.len())?;

    Ok(argv)
}

// Anything the word pattern skipped over must be whitespace, otherwise a
// quote or backslash was left open.
fn check_gap(line: &str, from: usize, to: usize) -> Result<(), TokenizeError> {
    match line[from..to].find(|c: char| !c.is_whitespace()) {
        Some(pos) => Err(TokenizeError::Unterminated { offset: from + pos }),
        None => Ok(()),
    }
}

fn unquote(word: &str) -> String {
    let mut token = String::with_capacity(word.len());
    for cap in PIECE.captures_iter(word) {
        if let Some(m) = cap.get(1) {
            token.push_str(&DQUOTE_ESCAPE.replace_all(m.as_str(), |c: &regex::Captures| {
                match &c[1] {
                    esc @ ("\"" | "\\") => esc.to_string(),
                    other => format!("\\{other}"),
                }
            }));
        } else if let Some(m) = cap.get(2).or(cap.get(3)).or(cap.get(4)) {
            token.push_str(m.as_str());
        }
    }
    token
}
