//! BBNF grammar parsing and LL(k) analysis.
//!
//! The main function to investigate is [`BBNFGrammar::new`], which takes a BBNF grammar as input;
//! [`BBNFFirsts::new`] and [`BBNFFollows::new`] then compute the PFIRST/PFOLLOW sets which drive
//! LL(k) table construction.

pub mod ast;
mod firsts;
mod follows;
mod grammar;
pub mod lookahead;
mod parser;

pub use self::{
    firsts::{BBNFFirsts, FirstsError, FirstsErrorKind},
    follows::BBNFFollows,
    grammar::{BBNFGrammar, Conjunct},
    lookahead::LookaheadSet,
    parser::{BBNFGrammarError, BBNFGrammarErrorKind},
};
