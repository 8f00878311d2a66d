//! Expression tokenizer

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Question,
    QuestionQuestion,
    Colon,
    Assign,
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Semicolon,
}

/// Token with its byte position inside the expression source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c.is_ascii_digit() {
            let mut end = pos;
            let mut is_float = false;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    end = i + 1;
                    chars.next();
                } else if d == '.' && !is_float {
                    // Only a fraction if a digit follows the dot
                    let next_is_digit = source[i + 1..]
                        .chars()
                        .next()
                        .is_some_and(|n| n.is_ascii_digit());
                    if !next_is_digit {
                        break;
                    }
                    is_float = true;
                    end = i + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[pos..end];
            let token = if is_float {
                text.parse()
                    .map(Token::Float)
                    .map_err(|_| ExprError::InvalidNumber(text.to_string()))?
            } else {
                text.parse()
                    .map(Token::Int)
                    .map_err(|_| ExprError::InvalidNumber(text.to_string()))?
            };
            tokens.push(Spanned { token, pos });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut end = pos;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Spanned {
                token: Token::Ident(source[pos..end].to_string()),
                pos,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, d)) = chars.next() {
                match d {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => text.push('\n'),
                        Some((_, 't')) => text.push('\t'),
                        Some((_, other)) => text.push(other),
                        None => break,
                    },
                    d if d == c => {
                        closed = true;
                        break;
                    }
                    d => text.push(d),
                }
            }
            if !closed {
                return Err(ExprError::UnterminatedString(pos));
            }
            tokens.push(Spanned {
                token: Token::Str(text),
                pos,
            });
            continue;
        }

        chars.next();
        let next = chars.peek().map(|&(_, n)| n);
        let (token, wide) = match (c, next) {
            ('=', Some('=')) => (Token::EqEq, true),
            ('!', Some('=')) => (Token::NotEq, true),
            ('<', Some('=')) => (Token::Le, true),
            ('>', Some('=')) => (Token::Ge, true),
            ('&', Some('&')) => (Token::AndAnd, true),
            ('|', Some('|')) => (Token::OrOr, true),
            ('?', Some('?')) => (Token::QuestionQuestion, true),
            ('=', _) => (Token::Assign, false),
            ('!', _) => (Token::Bang, false),
            ('<', _) => (Token::Lt, false),
            ('>', _) => (Token::Gt, false),
            ('?', _) => (Token::Question, false),
            ('+', _) => (Token::Plus, false),
            ('-', _) => (Token::Minus, false),
            ('*', _) => (Token::Star, false),
            ('/', _) => (Token::Slash, false),
            ('%', _) => (Token::Percent, false),
            (':', _) => (Token::Colon, false),
            ('.', _) => (Token::Dot, false),
            ('[', _) => (Token::LBracket, false),
            (']', _) => (Token::RBracket, false),
            ('(', _) => (Token::LParen, false),
            (')', _) => (Token::RParen, false),
            (';', _) => (Token::Semicolon, false),
            _ => return Err(ExprError::UnexpectedChar(c, pos)),
        };
        if wide {
            chars.next();
        }
        tokens.push(Spanned { token, pos });
    }

    Ok(tokens)
}
