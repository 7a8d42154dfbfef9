use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    True,
    False,
    Null,
    Undefined,
    Dot,
    Not,
    And,
    Or,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Split an expression into tokens
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let next = chars.get(pos + 1).copied();
        let after = chars.get(pos + 2).copied();

        match c {
            c if c.is_whitespace() => pos += 1,
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            '.' if !next.is_some_and(|n| n.is_ascii_digit()) => {
                tokens.push(Token::Dot);
                pos += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                pos += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                pos += 2;
            }
            '=' if next == Some('=') => {
                if after == Some('=') {
                    tokens.push(Token::StrictEq);
                    pos += 3;
                } else {
                    tokens.push(Token::Eq);
                    pos += 2;
                }
            }
            '!' => {
                if next == Some('=') {
                    if after == Some('=') {
                        tokens.push(Token::StrictNe);
                        pos += 3;
                    } else {
                        tokens.push(Token::Ne);
                        pos += 2;
                    }
                } else {
                    tokens.push(Token::Not);
                    pos += 1;
                }
            }
            '<' | '>' => {
                let inclusive = next == Some('=');
                tokens.push(match (c, inclusive) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    ('>', false) => Token::Gt,
                    _ => Token::Ge,
                });
                pos += if inclusive { 2 } else { 1 };
            }
            '"' | '\'' => {
                let (text, end) = read_string(&chars, pos)?;
                tokens.push(Token::Str(text));
                pos = end;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Num(value));
            }
            c if is_ident_start(c) => {
                let start = pos;
                while pos < chars.len() && is_ident_char(chars[pos]) {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                tokens.push(match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "undefined" => Token::Undefined,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(ExprError::UnexpectedChar(other, pos)),
        }
    }

    Ok(tokens)
}

/// Read a quoted string starting at `start`, returning its contents and the index after the closing quote
fn read_string(chars: &[char], start: usize) -> Result<(String, usize), ExprError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut pos = start + 1;
    while pos < chars.len() {
        match chars[pos] {
            '\\' => {
                let escaped = chars.get(pos + 1).ok_or(ExprError::UnterminatedString)?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                pos += 2;
            }
            c if c == quote => return Ok((text, pos + 1)),
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }
    Err(ExprError::UnterminatedString)
}
