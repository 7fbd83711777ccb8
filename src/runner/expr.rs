//! Boolean condition grammar for `{% if %}` blocks
//!
//! Conditions are parsed, never eval'd: comparisons between variable
//! references and quoted literals, combined with `and`/`or`/`not` and
//! parentheses. A bare variable tests its truthiness.

use crate::error::{RenderError, RenderResult};
use crate::runner::scope::VariableStore;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(String),
    Eq,
    Ne,
    LParen,
    RParen,
    And,
    Or,
    Not,
}

/// Evaluate a condition string against the given scope
pub fn evaluate(cond: &str, scope: &VariableStore) -> RenderResult<bool> {
    let tokens = tokenize(cond)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source: cond,
    };
    let node = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(RenderError::InvalidSyntax(format!(
            "trailing input in condition '{}'",
            cond
        )));
    }
    node.eval(scope)
}

fn tokenize(input: &str) -> RenderResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(idx, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push(Token::Eq);
                    }
                    _ => {
                        return Err(RenderError::InvalidSyntax(format!(
                            "expected '==' at offset {} in '{}'",
                            idx, input
                        )))
                    }
                }
            }
            '!' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '=')) => {
                        chars.next();
                        tokens.push(Token::Ne);
                    }
                    _ => {
                        return Err(RenderError::InvalidSyntax(format!(
                            "expected '!=' at offset {} in '{}'",
                            idx, input
                        )))
                    }
                }
            }
            '"' | '\'' => {
                let quote = ch;
                chars.next();
                let mut lit = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    lit.push(c);
                }
                if !closed {
                    return Err(RenderError::InvalidSyntax(format!(
                        "unterminated string literal in '{}'",
                        input
                    )));
                }
                tokens.push(Token::Literal(lit));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(ident),
                });
            }
            other => {
                return Err(RenderError::InvalidSyntax(format!(
                    "unexpected character '{}' in condition '{}'",
                    other, input
                )))
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug)]
enum Node {
    Or(Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Not(Box<Node>),
    Compare { left: Operand, right: Operand, negated: bool },
    Truthy(Operand),
}

#[derive(Debug)]
enum Operand {
    Var(String),
    Literal(String),
}

impl Operand {
    fn resolve(&self, scope: &VariableStore) -> RenderResult<String> {
        match self {
            Operand::Var(name) => Ok(scope.lookup(name)?.render()),
            Operand::Literal(lit) => Ok(lit.clone()),
        }
    }
}

impl Node {
    fn eval(&self, scope: &VariableStore) -> RenderResult<bool> {
        match self {
            Node::Or(a, b) => Ok(a.eval(scope)? || b.eval(scope)?),
            Node::And(a, b) => Ok(a.eval(scope)? && b.eval(scope)?),
            Node::Not(inner) => Ok(!inner.eval(scope)?),
            Node::Compare { left, right, negated } => {
                let eq = left.resolve(scope)? == right.resolve(scope)?;
                Ok(eq != *negated)
            }
            Node::Truthy(operand) => match operand {
                Operand::Var(name) => Ok(scope.lookup(name)?.truthy()),
                Operand::Literal(lit) => Ok(!lit.is_empty()),
            },
        }
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_expr(&mut self) -> RenderResult<Node> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = Node::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> RenderResult<Node> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let right = self.parse_unary()?;
            left = Node::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> RenderResult<Node> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> RenderResult<Node> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.syntax_error("expected ')'")),
                }
            }
            Some(Token::Ident(name)) => self.finish_operand(Operand::Var(name)),
            Some(Token::Literal(lit)) => self.finish_operand(Operand::Literal(lit)),
            _ => Err(self.syntax_error("expected a variable, literal, or '('")),
        }
    }

    fn finish_operand(&mut self, left: Operand) -> RenderResult<Node> {
        let negated = match self.peek() {
            Some(Token::Eq) => false,
            Some(Token::Ne) => true,
            _ => return Ok(Node::Truthy(left)),
        };
        self.advance();
        let right = match self.advance() {
            Some(Token::Ident(name)) => Operand::Var(name),
            Some(Token::Literal(lit)) => Operand::Literal(lit),
            _ => return Err(self.syntax_error("expected a comparison operand")),
        };
        Ok(Node::Compare { left, right, negated })
    }

    fn syntax_error(&self, message: &str) -> RenderError {
        RenderError::InvalidSyntax(format!("{} in condition '{}'", message, self.source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::scope::Layer;

    fn scope(pairs: &[(&str, &str)]) -> VariableStore {
        let mut store = VariableStore::new();
        for (k, v) in pairs {
            store.set(*k, *v, Layer::Global);
        }
        store
    }

    #[test]
    fn test_equal_comparison() {
        let store = scope(&[("c.python", "2")]);
        assert!(evaluate("c.python == \"2\"", &store).unwrap());
        assert!(!evaluate("c.python == \"3\"", &store).unwrap());
    }

    #[test]
    fn test_not_equal_comparison() {
        let store = scope(&[("c.python", "3")]);
        assert!(evaluate("c.python != '2'", &store).unwrap());
    }

    #[test]
    fn test_and_or_parens() {
        let store = scope(&[("platform", "linux"), ("arch", "armv7l")]);
        assert!(evaluate(
            "(platform == \"linux\") and (arch == \"armv7l\")",
            &store
        )
        .unwrap());
        assert!(evaluate("platform == \"mac\" or arch == \"armv7l\"", &store).unwrap());
        assert!(!evaluate("platform == \"mac\" and arch == \"armv7l\"", &store).unwrap());
    }

    #[test]
    fn test_not_and_truthiness() {
        let store = scope(&[("nostrip", "true"), ("empty", "")]);
        assert!(evaluate("nostrip", &store).unwrap());
        assert!(!evaluate("empty", &store).unwrap());
        assert!(evaluate("not empty", &store).unwrap());
    }

    #[test]
    fn test_variable_on_both_sides() {
        let store = scope(&[("a", "x"), ("b", "x")]);
        assert!(evaluate("a == b", &store).unwrap());
    }

    #[test]
    fn test_undefined_variable_errors() {
        let store = VariableStore::new();
        let result = evaluate("missing == \"1\"", &store);
        assert!(matches!(
            result,
            Err(RenderError::UndefinedVariable(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_invalid_syntax() {
        let store = VariableStore::new();
        assert!(matches!(
            evaluate("a = \"1\"", &store),
            Err(RenderError::InvalidSyntax(_))
        ));
        assert!(matches!(
            evaluate("(a == \"1\"", &store),
            Err(RenderError::InvalidSyntax(_))
        ));
        assert!(matches!(
            evaluate("\"unterminated", &store),
            Err(RenderError::InvalidSyntax(_))
        ));
    }
}
