//! S-expression parser for terms and driver commands.
//!
//! Binder names are resolved to de Bruijn indices; `#n` is an explicit
//! index, integers are numerals, `Prop`/`Type` are sorts, `name.{1,2}`
//! instantiates a universe-polymorphic constant.

use kernel::ast::{level_succ, Level, Term};
use std::iter::Peekable;
use std::rc::Rc;
use std::str::Chars;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unexpected EOF")]
    UnexpectedEof,
    #[error("Expected {0}")]
    Expected(String),
    #[error("Unknown form: {0}")]
    UnknownForm(String),
    #[error("Malformed universe suffix in {0}")]
    BadLevels(String),
    #[error("Trailing input after term")]
    TrailingInput,
}

#[derive(Debug, PartialEq, Eq, Clone)]
enum Token {
    LParen,
    RParen,
    Symbol(String),
    Int(u128),
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let c = self.chars.next()?;
        match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            c if c.is_ascii_digit() => {
                let mut s = String::new();
                s.push(c);
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        s.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                Some(Token::Int(s.parse().unwrap_or(0)))
            }
            c => {
                let mut s = String::new();
                s.push(c);
                while let Some(&c) = self.chars.peek() {
                    if !c.is_whitespace() && c != '(' && c != ')' {
                        s.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                Some(Token::Symbol(s))
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else if c == ';' {
                // comment to end of line
                for c in self.chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }
}

/// A parsed driver command.
#[derive(Debug)]
pub enum Command {
    Axiom { name: String, ty: Rc<Term> },
    Def { name: String, ty: Rc<Term>, value: Rc<Term> },
    Rule { set: String, fact: String },
    CongrIte { set: String },
    Simp { term: Rc<Term> },
    Infer { term: Rc<Term> },
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input),
            peeked: None,
        }
    }

    fn next(&mut self) -> Option<Token> {
        match self.peeked.take() {
            Some(t) => Some(t),
            None => self.lexer.next_token(),
        }
    }

    fn peek(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next_token();
        }
        self.peeked.as_ref()
    }

    /// Parse one full term; the input must contain nothing else.
    pub fn parse_closed_term(&mut self) -> Result<Rc<Term>, ParseError> {
        let mut binders = Vec::new();
        let t = self.parse_term(&mut binders)?;
        match self.peek() {
            None => Ok(t),
            Some(_) => Err(ParseError::TrailingInput),
        }
    }

    pub fn parse_command(&mut self) -> Result<Command, ParseError> {
        self.expect_lparen()?;
        let head = self.expect_symbol()?;
        let mut binders = Vec::new();
        let cmd = match head.as_str() {
            "axiom" => {
                let name = self.expect_symbol()?;
                let ty = self.parse_term(&mut binders)?;
                Command::Axiom { name, ty }
            }
            "def" => {
                let name = self.expect_symbol()?;
                let ty = self.parse_term(&mut binders)?;
                let value = self.parse_term(&mut binders)?;
                Command::Def { name, ty, value }
            }
            "rule" => {
                let set = self.expect_symbol()?;
                let fact = self.expect_symbol()?;
                Command::Rule { set, fact }
            }
            "congr-ite" => {
                let set = self.expect_symbol()?;
                Command::CongrIte { set }
            }
            "simp" => {
                let term = self.parse_term(&mut binders)?;
                Command::Simp { term }
            }
            "infer" => {
                let term = self.parse_term(&mut binders)?;
                Command::Infer { term }
            }
            other => return Err(ParseError::UnknownForm(other.to_string())),
        };
        self.expect_rparen()?;
        Ok(cmd)
    }

    fn parse_term(&mut self, binders: &mut Vec<String>) -> Result<Rc<Term>, ParseError> {
        match self.next() {
            None => Err(ParseError::UnexpectedEof),
            Some(Token::Int(n)) => Ok(Term::nat(n)),
            Some(Token::Symbol(s)) => self.symbol_term(&s, binders),
            Some(Token::LParen) => {
                let head = match self.peek() {
                    Some(Token::Symbol(s)) => Some(s.clone()),
                    _ => None,
                };
                match head.as_deref() {
                    Some("lam") | Some("pi") => {
                        let kw = self.expect_symbol()?;
                        let name = self.expect_symbol()?;
                        let ty = self.parse_term(binders)?;
                        binders.push(name.clone());
                        let body = self.parse_term(binders);
                        binders.pop();
                        let body = body?;
                        self.expect_rparen()?;
                        Ok(if kw == "lam" {
                            Term::lam(&name, ty, body)
                        } else {
                            Term::pi(&name, ty, body)
                        })
                    }
                    Some("let") => {
                        self.expect_symbol()?;
                        let name = self.expect_symbol()?;
                        let value = self.parse_term(binders)?;
                        binders.push(name.clone());
                        let body = self.parse_term(binders);
                        binders.pop();
                        let body = body?;
                        self.expect_rparen()?;
                        Ok(Term::let_(&name, value, body))
                    }
                    Some("arrow") => {
                        self.expect_symbol()?;
                        let a = self.parse_term(binders)?;
                        let b = self.parse_term(binders)?;
                        self.expect_rparen()?;
                        Ok(Term::arrow(a, b))
                    }
                    _ => {
                        // application
                        let f = self.parse_term(binders)?;
                        let mut args = Vec::new();
                        loop {
                            match self.peek() {
                                Some(Token::RParen) => {
                                    self.next();
                                    break;
                                }
                                Some(_) => args.push(self.parse_term(binders)?),
                                None => return Err(ParseError::UnexpectedEof),
                            }
                        }
                        if args.is_empty() {
                            Ok(f)
                        } else {
                            Ok(Term::apps(&f, &args))
                        }
                    }
                }
            }
            Some(Token::RParen) => Err(ParseError::Expected("term".to_string())),
        }
    }

    fn symbol_term(&self, s: &str, binders: &[String]) -> Result<Rc<Term>, ParseError> {
        if let Some(rest) = s.strip_prefix('#') {
            if let Ok(n) = rest.parse::<usize>() {
                return Ok(Term::var(n));
            }
        }
        match s {
            "Prop" => return Ok(Term::prop()),
            "Type" => return Ok(Term::sort(level_succ(Level::Zero))),
            _ => {}
        }
        // innermost binder wins
        if let Some(idx) = binders.iter().rev().position(|b| b.as_str() == s) {
            return Ok(Term::var(idx));
        }
        if let Some((name, levels)) = s.split_once(".{") {
            let inner = levels
                .strip_suffix('}')
                .ok_or_else(|| ParseError::BadLevels(s.to_string()))?;
            let mut parsed = Vec::new();
            for part in inner.split(',') {
                let n: u64 = part
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::BadLevels(s.to_string()))?;
                let mut l = Level::Zero;
                for _ in 0..n {
                    l = level_succ(l);
                }
                parsed.push(l);
            }
            return Ok(Term::const_levels(name, parsed));
        }
        Ok(Term::constant(s))
    }

    fn expect_symbol(&mut self) -> Result<String, ParseError> {
        match self.next() {
            Some(Token::Symbol(s)) => Ok(s),
            _ => Err(ParseError::Expected("symbol".to_string())),
        }
    }

    fn expect_lparen(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some(Token::LParen) => Ok(()),
            _ => Err(ParseError::Expected("(".to_string())),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            _ => Err(ParseError::Expected(")".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_binders_by_name() {
        let mut p = Parser::new("(lam x Nat (add x 1))");
        let t = p.parse_closed_term().expect("parse failed");
        let expected = Term::lam(
            "x",
            Term::constant("Nat"),
            Term::apps(&Term::constant("add"), &[Term::var(0), Term::nat(1)]),
        );
        assert_eq!(t, expected);
    }

    #[test]
    fn parses_universe_suffixes() {
        let mut p = Parser::new("(eq.{1} Nat 0 0)");
        let t = p.parse_closed_term().expect("parse failed");
        let expected = Term::apps(
            &Term::const_levels("eq", vec![level_succ(Level::Zero)]),
            &[Term::constant("Nat"), Term::nat(0), Term::nat(0)],
        );
        assert_eq!(t, expected);
    }

    #[test]
    fn shadowing_resolves_to_innermost() {
        let mut p = Parser::new("(lam x Nat (lam x Nat x))");
        let t = p.parse_closed_term().expect("parse failed");
        let expected = Term::lam(
            "x",
            Term::constant("Nat"),
            Term::lam("x", Term::constant("Nat"), Term::var(0)),
        );
        assert_eq!(t, expected);
    }

    #[test]
    fn rejects_trailing_input() {
        let mut p = Parser::new("Nat Nat");
        assert!(p.parse_closed_term().is_err());
    }
}
