//! Deliberately limited arithmetic evaluator.
//!
//! LLM responses occasionally put an unevaluated calculation where a number
//! belongs, e.g. `"increase_amount": "(2650 + 265) * 0.05"`. This module
//! evaluates exactly that class of string: the four binary operators and at
//! most one parenthesized group. Anything outside the grammar is rejected
//! rather than interpreted.
//!
//! Grammar (no nesting, no operator precedence beyond the single group):
//!
//! ```text
//! expr  := atom (op atom)*
//! atom  := number | '(' number op number ')'
//! ```
//!
//! Left-to-right application; at most one parenthesized atom per expression.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '+' | '*' | '/' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '-' => {
                // A minus is a sign only at the start of an atom position.
                let at_atom = matches!(
                    tokens.last(),
                    None | Some(Token::Op(_)) | Some(Token::LParen)
                );
                chars.next();
                if at_atom {
                    let num = read_number(&mut chars)?;
                    tokens.push(Token::Num(-num));
                } else {
                    tokens.push(Token::Op('-'));
                }
            }
            '0'..='9' | '.' => {
                let num = read_number(&mut chars)?;
                tokens.push(Token::Num(num));
            }
            _ => return None,
        }
    }

    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<f64> {
    let mut buf = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            buf.push(c);
            chars.next();
        } else {
            break;
        }
    }
    buf.parse().ok()
}

fn apply(lhs: f64, op: char, rhs: f64) -> f64 {
    match op {
        '+' => lhs + rhs,
        '-' => lhs - rhs,
        '*' => lhs * rhs,
        // Division by zero yields zero rather than poisoning the record.
        '/' => {
            if rhs == 0.0 {
                0.0
            } else {
                lhs / rhs
            }
        }
        _ => lhs,
    }
}

/// Evaluates a restricted arithmetic string. Returns `None` when the input
/// does not fit the grammar; a bare number evaluates to itself.
pub fn evaluate(input: &str) -> Option<f64> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let mut groups_seen = 0;

    let mut value = parse_atom(&tokens, &mut pos, &mut groups_seen)?;
    while pos < tokens.len() {
        let Token::Op(op) = tokens[pos] else {
            return None;
        };
        pos += 1;
        let rhs = parse_atom(&tokens, &mut pos, &mut groups_seen)?;
        value = apply(value, op, rhs);
    }

    Some(value)
}

/// True when the string is an arithmetic expression (not just a number)
/// that [`evaluate`] accepts.
pub fn is_expression(input: &str) -> bool {
    match tokenize(input) {
        Some(tokens) => tokens.len() > 1 && evaluate(input).is_some(),
        None => false,
    }
}

fn parse_atom(tokens: &[Token], pos: &mut usize, groups_seen: &mut usize) -> Option<f64> {
    match tokens.get(*pos)? {
        Token::Num(n) => {
            *pos += 1;
            Some(*n)
        }
        Token::LParen => {
            if *groups_seen > 0 {
                return None;
            }
            *groups_seen += 1;
            *pos += 1;
            let Token::Num(lhs) = *tokens.get(*pos)? else {
                return None;
            };
            *pos += 1;
            let Token::Op(op) = *tokens.get(*pos)? else {
                return None;
            };
            *pos += 1;
            let Token::Num(rhs) = *tokens.get(*pos)? else {
                return None;
            };
            *pos += 1;
            let Token::RParen = *tokens.get(*pos)? else {
                return None;
            };
            *pos += 1;
            Some(apply(lhs, op, rhs))
        }
        _ => None,
    }
}
