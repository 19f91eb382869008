use std::collections::BTreeMap;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use bbnfgrammar::{
    bbnf::{BBNFFirsts, BBNFFollows, BBNFGrammar},
    CIdx, PIdx, RIdx, Symbol, TIdx,
};

fn pp_seq<StorageT: 'static + PrimInt + Unsigned>(
    grm: &BBNFGrammar<StorageT>,
    seq: &[TIdx<StorageT>],
) -> String
where
    usize: AsPrimitive<StorageT>,
{
    let eps = grm.eps_token_idx();
    seq.iter()
        .map(|&t| {
            if t == eps {
                "epsilon".to_string()
            } else {
                grm.token_name(t).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Records the `(rule, sequence)` keys which more than one production of a rule claimed during
/// table construction. Such a grammar is not LL(k) for this `k`; the table is still built, with
/// the later production winning each contested key.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Conflicts<StorageT> {
    /// `(rule, sequence, displaced production, winning production)`, in discovery order (which
    /// is deterministic: rules, then productions, then sorted sequences).
    overlaps: Vec<(RIdx<StorageT>, Vec<TIdx<StorageT>>, PIdx<StorageT>, PIdx<StorageT>)>,
}

impl<StorageT: 'static + PrimInt + Unsigned> Conflicts<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// How many contested keys are there?
    pub fn len(&self) -> usize {
        self.overlaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlaps.is_empty()
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<
        Item = &(
            RIdx<StorageT>,
            Vec<TIdx<StorageT>>,
            PIdx<StorageT>,
            PIdx<StorageT>,
        ),
    > + '_ {
        self.overlaps.iter()
    }

    /// Returns a pretty-printed version of the conflicts. Productions are numbered from 1 in
    /// declaration order within their rule.
    pub fn pp(&self, grm: &BBNFGrammar<StorageT>) -> String {
        let mut s = String::new();
        for (ridx, seq, loser, winner) in &self.overlaps {
            let prods = grm.rule_to_prods(*ridx);
            let ln = prods.iter().position(|p| p == loser).unwrap() + 1;
            let wn = prods.iter().position(|p| p == winner).unwrap() + 1;
            s.push_str(&format!(
                "   NON-TERMINAL {}, LOOKAHEAD {}: production {} / production {}\n",
                grm.rule_name(*ridx),
                pp_seq(grm, seq),
                ln,
                wn,
            ));
        }
        s
    }
}

/// A representation of an LL(k) parsing table for a BBNF grammar: a mapping from
/// `(rule, lookahead sequence)` to the ordered conjunct list of the production to expand. The
/// conjunct indices resolve through [`BBNFGrammar::conj`], polarity preserved, so the table never
/// shares ownership of grammar nodes.
///
/// Entries are kept in a `BTreeMap` so that for a given grammar and `k` the table's iteration
/// order (and hence everything generated from it) is identical across runs.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LLkTable<StorageT> {
    k: usize,
    entries: BTreeMap<(RIdx<StorageT>, Vec<TIdx<StorageT>>), Vec<CIdx<StorageT>>>,
    conflicts: Conflicts<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> LLkTable<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Build the table. For each production, the applicable lookahead set is its PFIRST set
    /// extended to length `k` by the deriving rule's PFOLLOW set; the production's conjunct list
    /// is recorded under every sequence in that set. When two productions of the same rule claim
    /// the same sequence the later one wins, mirroring declaration order.
    pub(crate) fn new(
        grm: &BBNFGrammar<StorageT>,
        firsts: &BBNFFirsts<StorageT>,
        follows: &BBNFFollows<StorageT>,
        k: usize,
    ) -> Self {
        let eps = grm.eps_token_idx();
        let mut entries = BTreeMap::new();
        let mut chosen = BTreeMap::new();
        let mut overlaps = Vec::new();
        for ridx in grm.iter_rules() {
            for &pidx in grm.rule_to_prods(ridx) {
                let applicable = firsts
                    .prod_firsts(pidx)
                    .k_concat(follows.follows(ridx), k, eps);
                for seq in applicable.iter() {
                    entries.insert((ridx, seq.clone()), grm.prod(pidx).to_vec());
                    if let Some(prev) = chosen.insert((ridx, seq.clone()), pidx) {
                        overlaps.push((ridx, seq.clone(), prev, pidx));
                    }
                }
            }
        }
        LLkTable {
            k,
            entries,
            conflicts: Conflicts { overlaps },
        }
    }

    /// If the grammar was not LL(k) for this `k`, return the keys which more than one production
    /// claimed; `None` otherwise.
    pub fn conflicts(&self) -> Option<&Conflicts<StorageT>> {
        if self.conflicts.is_empty() {
            None
        } else {
            Some(&self.conflicts)
        }
    }

    /// The lookahead length this table was built for.
    pub fn k(&self) -> usize {
        self.k
    }

    /// How many `(rule, sequence)` entries does this table have?
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the conjunct list to expand for rule `ridx` under lookahead `seq`, or `None` if
    /// the table has no entry (an LL(k) parse error).
    pub fn lookup(&self, ridx: RIdx<StorageT>, seq: &[TIdx<StorageT>]) -> Option<&[CIdx<StorageT>]> {
        self.entries
            .get(&(ridx, seq.to_vec()))
            .map(Vec::as_slice)
    }

    /// Iterate over all entries in deterministic (sorted) order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (RIdx<StorageT>, &[TIdx<StorageT>], &[CIdx<StorageT>])> + '_ {
        self.entries
            .iter()
            .map(|((ridx, seq), cidxs)| (*ridx, seq.as_slice(), cidxs.as_slice()))
    }

    /// Iterate over the lookahead sequences keyed for rule `ridx`, in sorted order.
    pub fn keys_for_rule(
        &self,
        ridx: RIdx<StorageT>,
    ) -> impl Iterator<Item = &[TIdx<StorageT>]> + '_ {
        self.entries
            .iter()
            .filter(move |((r, _), _)| *r == ridx)
            .map(|((_, seq), _)| seq.as_slice())
    }

    /// Return a pretty-printed version of the table, one entry per line.
    pub fn pp(&self, grm: &BBNFGrammar<StorageT>) -> String {
        let mut s = String::new();
        for (ridx, seq, cidxs) in self.iter() {
            s.push_str(&format!(
                "NON-TERMINAL {}, LOOKAHEAD {}\n",
                grm.rule_name(ridx),
                pp_seq(grm, seq)
            ));
            for &cidx in cidxs {
                let conj = grm.conj(cidx);
                let syms = conj
                    .symbols()
                    .iter()
                    .map(|sym| match sym {
                        Symbol::Lit(t) => format!("\"{}\"", grm.token_name(*t)),
                        Symbol::Rule(r) => grm.rule_name(*r).to_string(),
                        Symbol::Epsilon => "epsilon".to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                if conj.is_positive() {
                    s.push_str(&format!("    {}\n", syms));
                } else {
                    s.push_str(&format!("    ~ {}\n", syms));
                }
            }
        }
        s
    }
}
