//! Tokeniser and recursive-descent parser for console expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/" | "%") unary)*
//! unary   := "-" unary | primary
//! primary := INTEGER | STRING | NAME | NAME "(" args? ")" | "(" expr ")"
//! args    := expr ("," expr)*
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Token {
    Integer(i64),
    Str(String),
    Name(String),
    Operator(BinaryOp),
    Minus,
    LeftParen,
    RightParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Str(text) => write!(f, "'{text}'"),
            Self::Name(name) => f.write_str(name),
            Self::Operator(op) => write!(f, "{op}"),
            Self::Minus => f.write_str("-"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::Comma => f.write_str(","),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Remainder => "%",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Expr {
    Integer(i64),
    Str(String),
    Name(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

pub(super) fn tokenise(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut chars = source.char_indices().peekable();
    let mut tokens = Vec::new();
    while let Some(&(offset, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' => integer(&mut chars)?,
            '\'' | '"' => string(&mut chars, ch)?,
            c if c == '_' || c.is_ascii_alphabetic() => Token::Name(take_while(&mut chars, |c| {
                c == '_' || c.is_ascii_alphanumeric()
            })),
            _ => {
                chars.next();
                match ch {
                    '+' => Token::Operator(BinaryOp::Add),
                    '-' => Token::Minus,
                    '*' => Token::Operator(BinaryOp::Multiply),
                    '/' => Token::Operator(BinaryOp::Divide),
                    '%' => Token::Operator(BinaryOp::Remainder),
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    ',' => Token::Comma,
                    other => {
                        return Err(ExpressionError::UnexpectedCharacter {
                            character: other,
                            offset,
                        });
                    }
                }
            }
        };
        tokens.push(token);
    }
    Ok(tokens)
}

fn take_while(chars: &mut Peekable<CharIndices<'_>>, accept: impl Fn(char) -> bool) -> String {
    let mut text = String::new();
    while let Some((_, ch)) = chars.next_if(|&(_, ch)| accept(ch)) {
        text.push(ch);
    }
    text
}

fn integer(chars: &mut Peekable<CharIndices<'_>>) -> Result<Token, ExpressionError> {
    let digits = take_while(chars, |c| c.is_ascii_digit());
    digits
        .parse()
        .map(Token::Integer)
        .map_err(|_| ExpressionError::IntegerTooLarge { literal: digits })
}

fn string(chars: &mut Peekable<CharIndices<'_>>, quote: char) -> Result<Token, ExpressionError> {
    chars.next();
    let mut text = String::new();
    while let Some((_, ch)) = chars.next() {
        match ch {
            c if c == quote => return Ok(Token::Str(text)),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            other => text.push(other),
        }
    }
    Err(ExpressionError::UnterminatedString)
}

pub(super) fn parse(source: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenise(source)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
    };
    let expr = parser.expr()?;
    match parser.tokens.next() {
        None => Ok(expr),
        Some(token) => Err(ExpressionError::UnexpectedToken {
            token: token.to_string(),
        }),
    }
}

struct Parser {
    tokens: Peekable<std::vec::IntoIter<Token>>,
}

impl Parser {
    fn expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.tokens.peek() {
                Some(Token::Operator(BinaryOp::Add)) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => return Ok(lhs),
            };
            self.tokens.next();
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Operator(
            op @ (BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Remainder),
        )) = self.tokens.peek().cloned()
        {
            self.tokens.next();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.tokens.next_if_eq(&Token::Minus).is_some() {
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.tokens.next() {
            Some(Token::Integer(value)) => Ok(Expr::Integer(value)),
            Some(Token::Str(text)) => Ok(Expr::Str(text)),
            Some(Token::Name(name)) => {
                if self.tokens.next_if_eq(&Token::LeftParen).is_some() {
                    let args = self.arguments()?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LeftParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RightParen)?;
                Ok(inner)
            }
            Some(token) => Err(ExpressionError::UnexpectedToken {
                token: token.to_string(),
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExpressionError> {
        let mut args = Vec::new();
        if self.tokens.next_if_eq(&Token::RightParen).is_some() {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.tokens.next_if_eq(&Token::Comma).is_some() {
                continue;
            }
            self.expect(&Token::RightParen)?;
            return Ok(args);
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExpressionError> {
        match self.tokens.next() {
            Some(token) if &token == expected => Ok(()),
            Some(token) => Err(ExpressionError::UnexpectedToken {
                token: token.to_string(),
            }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse("1 + 2 * 3").expect("parse");
        assert_eq!(
            expr,
            binary(
                BinaryOp::Add,
                Expr::Integer(1),
                binary(BinaryOp::Multiply, Expr::Integer(2), Expr::Integer(3)),
            )
        );
    }

    #[test]
    fn calls_collect_their_arguments() {
        let expr = parse("cmd('h1', \"echo\", -1)").expect("parse");
        assert_eq!(
            expr,
            Expr::Call {
                name: String::from("cmd"),
                args: vec![
                    Expr::Str(String::from("h1")),
                    Expr::Str(String::from("echo")),
                    Expr::Negate(Box::new(Expr::Integer(1))),
                ],
            }
        );
    }

    #[test]
    fn string_escapes_are_decoded() {
        let tokens = tokenise(r"'it\'s\n'").expect("tokenise");
        assert_eq!(tokens, [Token::Str(String::from("it's\n"))]);
    }

    #[rstest]
    #[case("", ExpressionError::Empty)]
    #[case("1 +", ExpressionError::UnexpectedEnd)]
    #[case("(1", ExpressionError::UnexpectedEnd)]
    #[case("1 2", ExpressionError::UnexpectedToken { token: String::from("2") })]
    #[case("'open", ExpressionError::UnterminatedString)]
    #[case("1 $ 2", ExpressionError::UnexpectedCharacter { character: '$', offset: 2 })]
    #[case(
        "99999999999999999999",
        ExpressionError::IntegerTooLarge { literal: String::from("99999999999999999999") }
    )]
    fn malformed_expressions_are_rejected(#[case] source: &str, #[case] expected: ExpressionError) {
        assert_eq!(parse(source), Err(expected));
    }
}
