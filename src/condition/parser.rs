use serde_json::Value;

use super::ExprError;
use super::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Undefined,
    Path(Vec<String>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
}

/// Recursive-descent parser.
///
/// ```text
/// or         := and ( "||" and )*
/// and        := equality ( "&&" equality )*
/// equality   := relational ( ("==" | "===" | "!=" | "!==") relational )*
/// relational := unary ( ("<" | "<=" | ">" | ">=") unary )*
/// unary      := "!" unary | primary
/// primary    := literal | path | "(" or ")"
/// path       := ident ( "." ident )*
/// ```
///
/// Every `!`, parenthesised group and chained binary operator counts towards the
/// nesting depth of the tree, which is capped at [`MAX_DEPTH`].
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

/// Deepest expression tree accepted
pub(crate) const MAX_DEPTH: usize = 64;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    /// Parse a left-associative chain, one nesting level per operator
    fn chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, ExprError>,
        operator: fn(Option<&Token>) -> Option<fn(Box<Expr>, Box<Expr>) -> Expr>,
    ) -> Result<Expr, ExprError> {
        let start = self.depth;
        let mut left = operand(self)?;
        while let Some(build) = operator(self.peek()) {
            self.pos += 1;
            self.descend()?;
            left = build(Box::new(left), Box::new(operand(self)?));
        }
        self.depth = start;
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        self.chain(Self::and, |token| match token {
            Some(Token::Or) => Some(Expr::Or),
            _ => None,
        })
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        self.chain(Self::equality, |token| match token {
            Some(Token::And) => Some(Expr::And),
            _ => None,
        })
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        self.chain(Self::relational, |token| match token {
            Some(Token::Eq | Token::StrictEq) => Some(|l, r| Expr::Compare(CompareOp::Eq, l, r)),
            Some(Token::Ne | Token::StrictNe) => Some(|l, r| Expr::Compare(CompareOp::Ne, l, r)),
            _ => None,
        })
    }

    fn relational(&mut self) -> Result<Expr, ExprError> {
        self.chain(Self::unary, |token| match token {
            Some(Token::Lt) => Some(|l, r| Expr::Compare(CompareOp::Lt, l, r)),
            Some(Token::Le) => Some(|l, r| Expr::Compare(CompareOp::Le, l, r)),
            Some(Token::Gt) => Some(|l, r| Expr::Compare(CompareOp::Gt, l, r)),
            Some(Token::Ge) => Some(|l, r| Expr::Compare(CompareOp::Ge, l, r)),
            _ => None,
        })
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Undefined) => Ok(Expr::Undefined),
            Some(Token::Str(text)) => Ok(Expr::Literal(Value::String(text))),
            Some(Token::Num(n)) => serde_json::Number::from_f64(n)
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or_else(|| ExprError::InvalidNumber(n.to_string())),
            Some(Token::Ident(name)) => {
                let mut path = vec![name];
                while self.peek() == Some(&Token::Dot) {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(segment)) => path.push(segment),
                        Some(other) => return Err(ExprError::UnexpectedToken(format!("{other:?}"))),
                        None => return Err(ExprError::UnexpectedEnd),
                    }
                }
                Ok(Expr::Path(path))
            }
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExprError::UnexpectedToken(format!("{other:?}"))),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExprError::UnexpectedToken(format!("{other:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Parse a token stream into an expression tree, rejecting trailing tokens
pub(crate) fn parse(tokens: Vec<Token>) -> Result<Expr, ExprError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExprError::UnexpectedToken(format!("{token:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::lexer::tokenize;

    fn parse_str(input: &str) -> Result<Expr, ExprError> {
        parse(tokenize(input)?)
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_str("a || b && c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(
                Box::new(Expr::Path(vec!["a".to_string()])),
                Box::new(Expr::And(
                    Box::new(Expr::Path(vec!["b".to_string()])),
                    Box::new(Expr::Path(vec!["c".to_string()])),
                )),
            )
        );
    }

    #[test]
    fn test_dangling_operator_is_an_error() {
        assert!(matches!(parse_str("invalid &&"), Err(ExprError::UnexpectedEnd)));
    }

    #[test]
    fn test_unbalanced_parens() {
        assert!(parse_str("(a && b").is_err());
        assert!(parse_str("a && b)").is_err());
    }

    #[test]
    fn test_trailing_dot_is_an_error() {
        assert!(parse_str("attachState.").is_err());
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let nested = |depth: usize| format!("{}a{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_str(&nested(MAX_DEPTH)).is_ok());
        assert_eq!(parse_str(&nested(MAX_DEPTH + 1)), Err(ExprError::TooDeep(MAX_DEPTH)));
        assert_eq!(parse_str(&"(".repeat(10_000)), Err(ExprError::TooDeep(MAX_DEPTH)));

        let negated = format!("{}a", "!".repeat(500));
        assert_eq!(parse_str(&negated), Err(ExprError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_long_chains_count_towards_depth() {
        let chain = |len: usize| vec!["a"; len].join(" && ");
        assert!(parse_str(&chain(MAX_DEPTH)).is_ok());
        assert_eq!(parse_str(&chain(1_000)), Err(ExprError::TooDeep(MAX_DEPTH)));

        // siblings at the same level do not add up
        let groups = vec!["(a || b)"; 10].join(" && ");
        assert!(parse_str(&groups).is_ok());
    }
}
