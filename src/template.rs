//! Positional string templates.
//!
//! `{0}`, `{1}`, ... are replaced by the argument at that position; `{}`
//! takes the next argument in order. `{{` and `}}` produce literal braces.
//! A template must reference exactly as many distinct positions as it is
//! given arguments.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("invalid template '{template}': {message}")]
    Invalid { template: String, message: String },

    #[error("template expects {expected} value(s) but {found} were supplied")]
    ArityMismatch { expected: usize, found: usize },
}

#[derive(Debug, PartialEq, Eq)]
enum Piece<'a> {
    Literal(&'a str),
    Brace(char),
    Slot(usize),
}

/// Number of distinct argument positions `template` expects.
pub fn arity(template: &str) -> Result<usize, TemplateError> {
    let pieces = parse(template)?;
    Ok(expected_args(&pieces))
}

pub fn render(template: &str, args: &[String]) -> Result<String, TemplateError> {
    let pieces = parse(template)?;
    let expected = expected_args(&pieces);
    if expected != args.len() {
        return Err(TemplateError::ArityMismatch {
            expected,
            found: args.len(),
        });
    }

    let mut out = String::with_capacity(template.len());
    for piece in pieces {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Brace(ch) => out.push(ch),
            Piece::Slot(idx) => out.push_str(&args[idx]),
        }
    }
    Ok(out)
}

fn expected_args(pieces: &[Piece<'_>]) -> usize {
    let mut seen: Vec<usize> = pieces
        .iter()
        .filter_map(|piece| match piece {
            Piece::Slot(idx) => Some(*idx),
            _ => None,
        })
        .collect();
    seen.sort_unstable();
    seen.dedup();
    let highest = seen.last().map_or(0, |max| max + 1);
    highest.max(seen.len())
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let invalid = |message: &str| TemplateError::Invalid {
        template: template.to_string(),
        message: message.to_string(),
    };

    let mut pieces = Vec::new();
    let mut next_auto = 0;
    let mut literal_start = 0;
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                if literal_start < i {
                    pieces.push(Piece::Literal(&template[literal_start..i]));
                }
                pieces.push(Piece::Brace(bytes[i] as char));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                if literal_start < i {
                    pieces.push(Piece::Literal(&template[literal_start..i]));
                }
                let close = template[i..]
                    .find('}')
                    .map(|offset| i + offset)
                    .ok_or_else(|| invalid("unterminated '{'"))?;
                let body = template[i + 1..close].trim();
                let idx = if body.is_empty() {
                    next_auto += 1;
                    next_auto - 1
                } else {
                    body.parse::<usize>()
                        .map_err(|_| invalid(&format!("invalid placeholder '{{{body}}}'")))?
                };
                pieces.push(Piece::Slot(idx));
                i = close + 1;
                literal_start = i;
            }
            b'}' => return Err(invalid("unmatched '}'")),
            _ => i += 1,
        }
    }

    if literal_start < bytes.len() {
        pieces.push(Piece::Literal(&template[literal_start..]));
    }

    Ok(pieces)
}
