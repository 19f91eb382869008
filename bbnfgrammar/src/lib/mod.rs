#![forbid(unsafe_code)]
#![allow(clippy::derive_partial_eq_without_eq)]

//! A library for manipulating Boolean BNF (BBNF) grammars: context-free grammars extended with
//! conjunction (`&`, intersection of right-hand sides) and negation (`~`, complement of a
//! right-hand side). As well as representing grammars, this crate computes the generalized
//! PFIRST/PFOLLOW sets of length `k` needed to drive an LL(k) predictive parser over such
//! grammars.
//!
//! A note on the terminology we use, since Boolean grammars add a layer to the usual CFG
//! vocabulary:
//!
//!   * A *rule* is a mapping from a non-terminal name to 1 or more productions.
//!   * A *production* is an intersection of 1 or more conjuncts (plain CFGs are the special case
//!     where every production has exactly one positive conjunct).
//!   * A *conjunct* is a (possibly negated) ordered sequence of symbols.
//!   * A *symbol* is a terminal (string literal), a non-terminal, or epsilon (the empty string).
//!
//! A string matches a production iff it matches every positive conjunct and no negative conjunct,
//! with all conjuncts covering the same substring.
//!
//! bbnfgrammar makes the following guarantees about grammars:
//!
//!   * The non-terminals are numbered from `0` to `rules_len() - 1` (inclusive).
//!   * The productions are numbered from `0` to `prods_len() - 1` (inclusive).
//!   * The terminals are numbered from `0` to `tokens_len() - 1` (inclusive), and terminal `0` is
//!     always the empty string.
//!   * The conjuncts are numbered from `0` to `conjs_len() - 1` (inclusive); parsing tables may
//!     thus reference conjuncts by index without sharing ownership of grammar nodes.
//!   * The `StorageT` type used to store all of the above can be infallibly converted into `usize`
//!     (see [`TIdx`] and friends for more details).

mod idxnewtype;
mod newlinecache;
mod span;

pub mod bbnf;

pub use crate::{
    idxnewtype::{CIdx, PIdx, RIdx, TIdx},
    newlinecache::NewlineCache,
    span::Span,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An interned grammar symbol. The AST equivalent (with names rather than indices) is
/// [`bbnf::ast::Symbol`].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Symbol<StorageT> {
    /// A terminal. Never the empty string: that is represented by `Epsilon`.
    Lit(TIdx<StorageT>),
    /// A reference to a non-terminal.
    Rule(RIdx<StorageT>),
    /// The empty string.
    Epsilon,
}
