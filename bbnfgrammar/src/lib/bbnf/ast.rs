use indexmap::{IndexMap, IndexSet};

use super::parser::{BBNFGrammarError, BBNFGrammarErrorKind};
use crate::Span;

/// An AST representing a BBNF grammar, built up gradually by the parser. When the parser is
/// finished, `complete_and_validate` must be called exactly once in order to finish the set-up.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct GrammarAST {
    /// Maps each non-terminal name to its disjunction, in declaration order.
    pub disjs: IndexMap<String, Disj>,
    /// All conjuncts in the grammar, in parse order. Productions reference conjuncts by index
    /// into this arena.
    pub conjs: Vec<Conjunct>,
    /// Every terminal mentioned anywhere in the grammar, in declaration order. The empty string
    /// is always a member, and always at index 0.
    pub tokens: IndexSet<String>,
}

/// All the alternatives derivable from one non-terminal.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Disj {
    pub name: (String, Span),
    pub rules: Vec<Rule>,
}

/// One alternative of a disjunction: an intersection of one or more conjuncts.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Rule {
    /// Indexes into `GrammarAST::conjs`.
    pub cidxs: Vec<usize>,
}

/// A possibly negated sequence of symbols.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Conjunct {
    /// `true` for a positive conjunct, `false` for a negative one.
    pub pos: bool,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub enum Symbol {
    /// A terminal; the string is never empty.
    Lit(String, Span),
    /// A reference to a non-terminal.
    Rule(String, Span),
    /// The empty string (written `epsilon` or `""` in BBNF).
    Epsilon(Span),
}

impl Symbol {
    pub fn span(&self) -> Span {
        match self {
            Symbol::Lit(_, span) | Symbol::Rule(_, span) | Symbol::Epsilon(span) => *span,
        }
    }
}

impl GrammarAST {
    pub(crate) fn new() -> Self {
        let mut tokens = IndexSet::new();
        // The empty string is a member of every grammar's alphabet.
        tokens.insert(String::new());
        GrammarAST {
            disjs: IndexMap::new(),
            conjs: Vec::new(),
            tokens,
        }
    }

    pub(crate) fn add_disj(&mut self, name: String, name_span: Span, rules: Vec<Rule>) {
        debug_assert!(!rules.is_empty());
        self.disjs.insert(
            name.clone(),
            Disj {
                name: (name, name_span),
                rules,
            },
        );
    }

    /// Add a conjunct to the arena, returning its index. In any sequence of two or more symbols
    /// epsilons are redundant and are stripped here.
    pub(crate) fn add_conjunct(&mut self, pos: bool, mut symbols: Vec<Symbol>) -> usize {
        debug_assert!(!symbols.is_empty());
        if symbols.len() > 1 {
            let span = symbols[0].span();
            symbols.retain(|s| !matches!(s, Symbol::Epsilon(_)));
            if symbols.is_empty() {
                // Every symbol was an epsilon: the conjunct is a lone epsilon.
                symbols.push(Symbol::Epsilon(span));
            }
        }
        self.conjs.push(Conjunct { pos, symbols });
        self.conjs.len() - 1
    }

    pub fn get_disj(&self, name: &str) -> Option<&Disj> {
        self.disjs.get(name)
    }

    /// After the parser has finished, validate that the AST describes a complete grammar: at
    /// least one rule is defined and every non-terminal reference resolves.
    pub(crate) fn complete_and_validate(&self) -> Result<(), BBNFGrammarError> {
        if self.disjs.is_empty() {
            return Err(BBNFGrammarError {
                kind: BBNFGrammarErrorKind::NoRules,
                spans: vec![Span::new(0, 0)],
            });
        }
        for conj in &self.conjs {
            for sym in &conj.symbols {
                if let Symbol::Rule(name, span) = sym {
                    if !self.disjs.contains_key(name) {
                        return Err(BBNFGrammarError {
                            kind: BBNFGrammarErrorKind::UnknownRuleRef(name.clone()),
                            spans: vec![*span],
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
