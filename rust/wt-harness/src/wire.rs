//! Text protocol spoken with the solver.
//!
//! Input (stdin of the solver):
//! - integer list: `[ v0 v1 ... ]`
//! - merge: `[ a0 a1 ... ] [ b0 b1 ... ]`
//! - search: `[ v0 v1 ... ] key p`
//! - points: `[ { x0 y0 } { x1 y1 } ... ]`
//!
//! Output (stdout of the solver): a leading answer followed by anything the
//! runtime prints, with work and span always the final two tokens:
//! - scalar: `value ... work span`
//! - sequence: `[ v0 v1 ... ] ... work span`
//! - points: `count { x y } ... ... work span`

use std::fmt::Write as _;

use crate::family::{Answer, AnswerShape, Instance, Metrics, SolverResponse};
use crate::geometry::Point;

/// Errors raised while decoding a solver response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("response too short: expected at least {expected} tokens, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("expected '{expected}' at token {position}, found '{found}'")]
    MissingDelimiter {
        expected: char,
        position: usize,
        found: String,
    },

    #[error("token {position} is not a valid number: '{token}'")]
    InvalidNumber { position: usize, token: String },

    #[error("{name} must be a finite non-negative number, got '{token}'")]
    InvalidMetric { name: &'static str, token: String },
}

fn write_int_list(out: &mut String, values: impl IntoIterator<Item = i64>) {
    out.push('[');
    for v in values {
        let _ = write!(out, " {}", v);
    }
    out.push_str(" ]");
}

fn write_point(out: &mut String, p: &Point) {
    let _ = write!(out, "{{ {:.6} {:.6} }}", p.x, p.y);
}

/// Encode a point list on its own (used for both hull halves).
pub fn encode_points(points: &[Point]) -> String {
    let mut out = String::from("[");
    for p in points {
        out.push(' ');
        write_point(&mut out, p);
    }
    out.push_str(" ]");
    out
}

/// Serialize an instance into the solver's input format.
pub fn encode_instance(instance: &Instance) -> String {
    let mut out = String::new();
    match instance {
        Instance::CircularList { next } => write_int_list(&mut out, next.iter().map(|&v| v as i64)),
        Instance::Values { values } => write_int_list(&mut out, values.iter().copied()),
        Instance::Merge { a, b } => {
            write_int_list(&mut out, a.iter().copied());
            out.push(' ');
            write_int_list(&mut out, b.iter().copied());
        }
        Instance::Search {
            values,
            key,
            fan_out,
        } => {
            write_int_list(&mut out, values.iter().copied());
            let _ = write!(out, " {} {}", key, fan_out);
        }
        Instance::Points { points } => return encode_points(points),
    }
    out
}

/// Serialize a response in the format a solver prints it.
///
/// In-process solvers use this so their answers go through the same decoder
/// as real subprocess output.
pub fn encode_response(response: &SolverResponse) -> String {
    let mut out = String::new();
    match &response.answer {
        Answer::Scalar { value } => {
            let _ = write!(out, "{}", value);
        }
        Answer::Sequence { values } => write_int_list(&mut out, values.iter().copied()),
        Answer::Points { points } => {
            let _ = write!(out, "{}", points.len());
            for p in points {
                out.push(' ');
                write_point(&mut out, p);
            }
        }
    }
    let _ = writeln!(out, "\n{} {}", response.metrics.work, response.metrics.span);
    out
}

fn parse_int(tokens: &[&str], position: usize) -> Result<i64, ProtocolError> {
    tokens[position]
        .parse::<i64>()
        .map_err(|_| ProtocolError::InvalidNumber {
            position,
            token: tokens[position].to_string(),
        })
}

fn parse_float(tokens: &[&str], position: usize) -> Result<f64, ProtocolError> {
    tokens[position]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProtocolError::InvalidNumber {
            position,
            token: tokens[position].to_string(),
        })
}

fn parse_metric(name: &'static str, token: &str) -> Result<f64, ProtocolError> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ProtocolError::InvalidMetric {
            name,
            token: token.to_string(),
        }),
    }
}

fn expect_token(tokens: &[&str], position: usize, expected: char) -> Result<(), ProtocolError> {
    if tokens[position] == expected.to_string() {
        Ok(())
    } else {
        Err(ProtocolError::MissingDelimiter {
            expected,
            position,
            found: tokens[position].to_string(),
        })
    }
}

/// Parse a bracketed integer list. Brackets may stand alone or hug the
/// first/last element (`[1 2 3]`). Returns the values and tokens consumed.
fn parse_sequence(tokens: &[&str]) -> Result<(Vec<i64>, usize), ProtocolError> {
    let first = tokens.first().ok_or(ProtocolError::Truncated {
        expected: 3,
        found: 2,
    })?;
    if !first.starts_with('[') {
        return Err(ProtocolError::MissingDelimiter {
            expected: '[',
            position: 0,
            found: first.to_string(),
        });
    }

    let mut values = Vec::new();
    for (position, raw) in tokens.iter().enumerate() {
        let mut tok = *raw;
        if position == 0 {
            tok = &tok[1..];
        }
        let closes = tok.ends_with(']');
        if closes {
            tok = &tok[..tok.len() - 1];
        }
        if !tok.is_empty() {
            let value = tok.parse::<i64>().map_err(|_| ProtocolError::InvalidNumber {
                position,
                token: raw.to_string(),
            })?;
            values.push(value);
        }
        if closes {
            return Ok((values, position + 1));
        }
    }

    Err(ProtocolError::MissingDelimiter {
        expected: ']',
        position: tokens.len(),
        found: String::new(),
    })
}

/// Parse `count { x y } ...`. Returns the points and tokens consumed.
fn parse_points(tokens: &[&str]) -> Result<(Vec<Point>, usize), ProtocolError> {
    if tokens.is_empty() {
        return Err(ProtocolError::Truncated {
            expected: 3,
            found: 2,
        });
    }
    let count = tokens[0]
        .parse::<usize>()
        .map_err(|_| ProtocolError::InvalidNumber {
            position: 0,
            token: tokens[0].to_string(),
        })?;

    let needed = count.saturating_mul(4).saturating_add(1);
    if tokens.len() < needed {
        return Err(ProtocolError::Truncated {
            expected: needed.saturating_add(2),
            found: tokens.len() + 2,
        });
    }

    let mut points = Vec::with_capacity(count);
    for i in 0..count {
        let base = 1 + 4 * i;
        expect_token(tokens, base, '{')?;
        let x = parse_float(tokens, base + 1)?;
        let y = parse_float(tokens, base + 2)?;
        expect_token(tokens, base + 3, '}')?;
        points.push(Point::new(x, y));
    }
    Ok((points, needed))
}

/// Decode solver stdout into an answer of the given shape plus work/span.
pub fn decode_response(shape: AnswerShape, output: &str) -> Result<SolverResponse, ProtocolError> {
    let tokens: Vec<&str> = output.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ProtocolError::Truncated {
            expected: 3,
            found: tokens.len(),
        });
    }

    let (body, tail) = tokens.split_at(tokens.len() - 2);
    let metrics = Metrics::new(parse_metric("work", tail[0])?, parse_metric("span", tail[1])?);

    let (answer, consumed) = match shape {
        AnswerShape::Scalar => (Answer::Scalar { value: parse_int(body, 0)? }, 1),
        AnswerShape::Sequence => {
            let (values, used) = parse_sequence(body)?;
            (Answer::Sequence { values }, used)
        }
        AnswerShape::Points => {
            let (points, used) = parse_points(body)?;
            (Answer::Points { points }, used)
        }
    };

    if consumed < body.len() {
        log::debug!(
            "ignoring {} token(s) between answer and metrics: {:?}",
            body.len() - consumed,
            &body[consumed..]
        );
    }

    Ok(SolverResponse { answer, metrics })
}
