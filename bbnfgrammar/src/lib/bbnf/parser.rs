use std::{error::Error, fmt};

use lazy_static::lazy_static;
use regex::Regex;

use super::ast::{GrammarAST, Rule, Symbol};
use crate::Span;

/// The various different possible errors when lexing or parsing a BBNF grammar.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BBNFGrammarErrorKind {
    IllegalName,
    IllegalString,
    ExpectedSymbol,
    MissingRightArrow,
    MissingSemicolon,
    UnexpectedChar(char),
    PrematureEnd,
    DuplicateRule,
    UnknownRuleRef(String),
    NoRules,
}

/// Any error from the BBNF parser returns an instance of this struct.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BBNFGrammarError {
    pub(crate) kind: BBNFGrammarErrorKind,
    /// Always contains at least 1 span. For `DuplicateRule` the first span is the original
    /// definition and the second the duplicate; for all other kinds there is a single span at the
    /// site of the error.
    pub(crate) spans: Vec<Span>,
}

impl Error for BBNFGrammarError {}

impl fmt::Display for BBNFGrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for BBNFGrammarErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BBNFGrammarErrorKind::IllegalName => "Illegal name",
            BBNFGrammarErrorKind::IllegalString => "Unterminated string literal",
            BBNFGrammarErrorKind::ExpectedSymbol => "Expecting a non-terminal or literal",
            BBNFGrammarErrorKind::MissingRightArrow => "Missing '->'",
            BBNFGrammarErrorKind::MissingSemicolon => "Missing ';'",
            BBNFGrammarErrorKind::UnexpectedChar(c) => {
                return write!(f, "Unexpected character {:?}", c)
            }
            BBNFGrammarErrorKind::PrematureEnd => "Grammar ends prematurely",
            BBNFGrammarErrorKind::DuplicateRule => "Rule defined multiple times",
            BBNFGrammarErrorKind::UnknownRuleRef(name) => {
                return write!(f, "Unknown reference to rule '{}'", name)
            }
            BBNFGrammarErrorKind::NoRules => "Grammar defines no rules",
        };
        write!(f, "{}", s)
    }
}

impl BBNFGrammarError {
    /// Returns the spans associated with the error, always containing at least 1 span.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.spans.iter().copied()
    }

    pub fn kind(&self) -> &BBNFGrammarErrorKind {
        &self.kind
    }
}

lazy_static! {
    static ref RE_NAME: Regex = Regex::new(r"^[A-Za-z0-9_]+").unwrap();
}

/// The actual parser is intended to be entirely opaque from outside users: the sole entry point
/// is [GrammarAST]'s `FromStr` impl.
pub(crate) struct BBNFParser {
    src: String,
    ast: GrammarAST,
}

/// We pass around an index into the *bytes* of `self.src`, guaranteeing that at all times it
/// points to the beginning of a UTF-8 character.
impl BBNFParser {
    pub(crate) fn new(src: String) -> BBNFParser {
        BBNFParser {
            src,
            ast: GrammarAST::new(),
        }
    }

    pub(crate) fn parse(&mut self) -> Result<(), BBNFGrammarError> {
        let mut i = self.parse_ws(0);
        if i == self.src.len() {
            return Err(self.mk_error(BBNFGrammarErrorKind::PrematureEnd, i));
        }
        while i < self.src.len() {
            i = self.parse_disj(i)?;
            i = self.parse_ws(i);
        }
        Ok(())
    }

    pub(crate) fn build(self) -> GrammarAST {
        self.ast
    }

    /// disjunction ::= NON_TERM '->' rule ('|' rule)* ';'
    fn parse_disj(&mut self, i: usize) -> Result<usize, BBNFGrammarError> {
        let (mut j, name) = self.parse_name(i)?;
        let name_span = Span::new(i, j);
        if name == "epsilon" {
            // epsilon is the empty string, not a non-terminal.
            return Err(BBNFGrammarError {
                kind: BBNFGrammarErrorKind::IllegalName,
                spans: vec![name_span],
            });
        }
        if let Some(orig) = self.ast.get_disj(&name) {
            return Err(BBNFGrammarError {
                kind: BBNFGrammarErrorKind::DuplicateRule,
                spans: vec![orig.name.1, name_span],
            });
        }
        j = self.parse_ws(j);
        match self.lookahead_is("->", j) {
            Some(k) => j = k,
            None => return Err(self.mk_error(BBNFGrammarErrorKind::MissingRightArrow, j)),
        }
        let mut rules = Vec::new();
        loop {
            let (k, rule) = self.parse_rule(j)?;
            rules.push(rule);
            j = self.parse_ws(k);
            if let Some(k) = self.lookahead_is("|", j) {
                j = k;
                continue;
            }
            match self.lookahead_is(";", j) {
                Some(k) => {
                    j = k;
                    break;
                }
                None => return Err(self.mk_error(BBNFGrammarErrorKind::MissingSemicolon, j)),
            }
        }
        self.ast.add_disj(name, name_span, rules);
        Ok(j)
    }

    /// rule ::= conjunct ('&' conjunct)*
    fn parse_rule(&mut self, i: usize) -> Result<(usize, Rule), BBNFGrammarError> {
        let mut cidxs = Vec::new();
        let mut j = i;
        loop {
            let k = self.parse_conj(j, &mut cidxs)?;
            j = self.parse_ws(k);
            match self.lookahead_is("&", j) {
                Some(k) => j = k,
                None => break,
            }
        }
        Ok((j, Rule { cidxs }))
    }

    /// conjunct ::= '~'? symbol+
    ///
    /// A conjunct's symbol sequence extends until the next '&', '|' or ';'.
    fn parse_conj(&mut self, i: usize, cidxs: &mut Vec<usize>) -> Result<usize, BBNFGrammarError> {
        let mut j = self.parse_ws(i);
        let mut pos = true;
        if let Some(k) = self.lookahead_is("~", j) {
            pos = false;
            j = self.parse_ws(k);
        }
        let mut symbols = Vec::new();
        loop {
            let (k, sym) = self.parse_symbol(j)?;
            symbols.push(sym);
            j = self.parse_ws(k);
            if j == self.src.len()
                || self.src[j..].starts_with('&')
                || self.src[j..].starts_with('|')
                || self.src[j..].starts_with(';')
            {
                break;
            }
        }
        cidxs.push(self.ast.add_conjunct(pos, symbols));
        Ok(j)
    }

    /// symbol ::= NON_TERM | '"' LITERAL '"' | 'epsilon'
    fn parse_symbol(&mut self, i: usize) -> Result<(usize, Symbol), BBNFGrammarError> {
        if self.lookahead_is("\"", i).is_some() {
            let (j, s) = self.parse_string(i)?;
            let span = Span::new(i + 1, j - 1);
            return if s.is_empty() {
                // "" and the epsilon keyword both denote the empty string.
                Ok((j, Symbol::Epsilon(span)))
            } else {
                self.ast.tokens.insert(s.clone());
                Ok((j, Symbol::Lit(s, span)))
            };
        }
        if RE_NAME.is_match(&self.src[i..]) {
            let (j, name) = self.parse_name(i)?;
            let span = Span::new(i, j);
            return if name == "epsilon" {
                Ok((j, Symbol::Epsilon(span)))
            } else {
                Ok((j, Symbol::Rule(name, span)))
            };
        }
        match self.src[i..].chars().next() {
            Some('-') => Err(self.mk_error(BBNFGrammarErrorKind::MissingRightArrow, i)),
            Some(c @ ('&' | '|' | ';' | '~')) => Err(BBNFGrammarError {
                kind: BBNFGrammarErrorKind::ExpectedSymbol,
                spans: vec![Span::new(i, i + c.len_utf8())],
            }),
            Some(c) => Err(BBNFGrammarError {
                kind: BBNFGrammarErrorKind::UnexpectedChar(c),
                spans: vec![Span::new(i, i + c.len_utf8())],
            }),
            None => Err(self.mk_error(BBNFGrammarErrorKind::PrematureEnd, i)),
        }
    }

    /// Parse a string literal starting at the opening '"' at `i`, returning the byte offset just
    /// past the closing '"' and the literal's contents with `\"` escapes resolved.
    fn parse_string(&mut self, i: usize) -> Result<(usize, String), BBNFGrammarError> {
        debug_assert!(self.src[i..].starts_with('"'));
        let mut s = String::new();
        let mut j = i + 1;
        while j < self.src.len() {
            let c = self.src[j..].chars().next().unwrap();
            match c {
                '"' => return Ok((j + 1, s)),
                '\\' if self.src[j + 1..].starts_with('"') => {
                    s.push('"');
                    j += 2;
                }
                _ => {
                    s.push(c);
                    j += c.len_utf8();
                }
            }
        }
        Err(self.mk_error(BBNFGrammarErrorKind::IllegalString, i))
    }

    fn parse_name(&self, i: usize) -> Result<(usize, String), BBNFGrammarError> {
        match RE_NAME.find(&self.src[i..]) {
            Some(m) => {
                assert_eq!(m.start(), 0);
                Ok((i + m.end(), self.src[i..i + m.end()].to_string()))
            }
            None => Err(self.mk_error(BBNFGrammarErrorKind::IllegalName, i)),
        }
    }

    fn parse_ws(&self, mut i: usize) -> usize {
        while i < self.src.len() {
            let c = self.src[i..].chars().next().unwrap();
            if !c.is_whitespace() {
                break;
            }
            i += c.len_utf8();
        }
        i
    }

    fn lookahead_is(&self, s: &'static str, i: usize) -> Option<usize> {
        if self.src[i..].starts_with(s) {
            Some(i + s.len())
        } else {
            None
        }
    }

    fn mk_error(&self, kind: BBNFGrammarErrorKind, off: usize) -> BBNFGrammarError {
        let off = off.min(self.src.len());
        BBNFGrammarError {
            kind,
            spans: vec![Span::new(off, off)],
        }
    }
}

impl std::str::FromStr for GrammarAST {
    type Err = BBNFGrammarError;

    fn from_str(src: &str) -> Result<GrammarAST, BBNFGrammarError> {
        let mut gp = BBNFParser::new(src.to_string());
        gp.parse()?;
        let ast = gp.build();
        ast.complete_and_validate()?;
        Ok(ast)
    }
}
