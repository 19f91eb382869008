use std::{error::Error, fmt};

use num_traits::{AsPrimitive, PrimInt, Unsigned};

use super::{grammar::BBNFGrammar, lookahead::LookaheadSet};
use crate::{PIdx, RIdx, Symbol};

/// The errors PFIRST computation can detect in a grammar. Both are fatal: no set is produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FirstsErrorKind {
    /// The first symbol of a positive conjunct is the conjunct's own deriving rule.
    LeftRecursion,
    /// A production's positive conjuncts share no common prefix sequence, so no string can
    /// satisfy all of them.
    ContradictoryRule,
}

#[derive(Debug)]
pub struct FirstsError<StorageT> {
    pub kind: FirstsErrorKind,
    /// The rule whose production triggered the error.
    pub ridx: RIdx<StorageT>,
}

impl<StorageT: fmt::Debug> Error for FirstsError<StorageT> {}

impl<StorageT> fmt::Display for FirstsError<StorageT> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self.kind {
            FirstsErrorKind::LeftRecursion => "Left recursion",
            FirstsErrorKind::ContradictoryRule => {
                "Contradictory rule: positive conjuncts share no common prefix"
            }
        };
        write!(f, "{}", s)
    }
}

/// `BBNFFirsts` stores the length-≤-k PFIRST sets for a grammar: per rule, and per production.
/// For example, given this code and grammar:
/// ```text
///   let grm = BBNFGrammar::new(r#"
///     S -> "(" S ")" S | epsilon;
///   "#).unwrap();
///   let firsts = BBNFFirsts::new(&grm, 1).unwrap();
/// ```
/// then the following assertions (and only the following assertions) about the PFIRST set of `S`
/// are correct:
/// ```text
///   assert!(firsts.firsts(grm.rule_idx("S").unwrap()).contains(&[grm.token_idx("(").unwrap()]));
///   assert!(firsts.is_epsilon_set(grm.rule_idx("S").unwrap(), &grm));
/// ```
#[derive(Debug)]
pub struct BBNFFirsts<StorageT> {
    k: usize,
    /// A mapping from `RIdx` -> PFIRST set (the union over the rule's productions).
    firsts: Vec<LookaheadSet<StorageT>>,
    /// A mapping from `PIdx` -> PFIRST set (the intersection over the production's positive
    /// conjuncts).
    prod_firsts: Vec<LookaheadSet<StorageT>>,
    /// All terminal sequences of length ≤ k: the PFIRST set of a production with no positive
    /// conjuncts. Built once and memoized here.
    sigma_star: LookaheadSet<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> BBNFFirsts<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the PFIRST sets for the given grammar and lookahead length `k`
    /// (`k ≥ 1`). Rules are visited in dependency order, so every callee's set is complete
    /// before its callers consult it.
    pub fn new(grm: &BBNFGrammar<StorageT>, k: usize) -> Result<Self, FirstsError<StorageT>> {
        debug_assert!(k >= 1);
        let eps = grm.eps_token_idx();
        let sigma_star = LookaheadSet::sigma_star(grm, k);
        let mut firsts = vec![LookaheadSet::new(); usize::from(grm.rules_len())];
        let mut prod_firsts = vec![LookaheadSet::new(); usize::from(grm.prods_len())];

        for &ridx in grm.nt_order() {
            let mut rule_first = LookaheadSet::new();
            for &pidx in grm.rule_to_prods(ridx) {
                let mut prod_first: Option<LookaheadSet<StorageT>> = None;
                for &cidx in grm.prod(pidx) {
                    let conj = grm.conj(cidx);
                    if !conj.is_positive() {
                        // Negative conjuncts contribute nothing to PFIRST; negativity is
                        // resolved at parse time, not table-construction time.
                        continue;
                    }
                    let cf = Self::conj_firsts(grm, ridx, conj.symbols(), &firsts, k)?;
                    match prod_first {
                        None => prod_first = Some(cf),
                        Some(ref mut pf) => pf.intersect_with(&cf),
                    }
                }
                let pf = match prod_first {
                    // A production with no positive conjuncts matches anything its negative
                    // conjuncts don't exclude.
                    None => sigma_star.clone(),
                    Some(pf) => {
                        if pf.is_empty() {
                            return Err(FirstsError {
                                kind: FirstsErrorKind::ContradictoryRule,
                                ridx,
                            });
                        }
                        pf
                    }
                };
                rule_first.union_with(&pf);
                prod_firsts[usize::from(pidx)] = pf;
            }
            firsts[usize::from(ridx)] = rule_first;
        }

        Ok(BBNFFirsts {
            k,
            firsts,
            prod_firsts,
            sigma_star,
        })
    }

    /// The PFIRST set of one positive conjunct of rule `ridx`: walk the symbol sequence
    /// left-to-right, concatenating each symbol's first sequences into the accumulator, with
    /// every sequence truncated to at most `k` terminals.
    fn conj_firsts(
        grm: &BBNFGrammar<StorageT>,
        ridx: RIdx<StorageT>,
        symbols: &[Symbol<StorageT>],
        firsts: &[LookaheadSet<StorageT>],
        k: usize,
    ) -> Result<LookaheadSet<StorageT>, FirstsError<StorageT>> {
        let eps = grm.eps_token_idx();
        if let Some(Symbol::Rule(r)) = symbols.first() {
            if *r == ridx {
                return Err(FirstsError {
                    kind: FirstsErrorKind::LeftRecursion,
                    ridx,
                });
            }
        }
        let mut acc = LookaheadSet::new();
        let mut nullable = true;
        for sym in symbols {
            match sym {
                Symbol::Lit(t) => {
                    nullable = false;
                    acc = acc.k_concat(&LookaheadSet::from_terminal(*t), k, eps);
                }
                Symbol::Rule(r) if *r == ridx => {
                    // A non-leading self-reference: the accumulator already holds the first
                    // sequences of everything to the left, so the self-closure supplies every
                    // way this rule can continue within the k-length window. Whether the
                    // self-reference derives epsilon is settled by the closure itself, so
                    // nullability is left alone.
                    acc = acc.self_closure(k, eps);
                }
                Symbol::Rule(r) => {
                    let rf = &firsts[usize::from(*r)];
                    if !rf.contains_epsilon(eps) {
                        nullable = false;
                    }
                    acc = acc.k_concat(rf, k, eps);
                }
                Symbol::Epsilon => (),
            }
        }
        if nullable {
            acc.insert(vec![eps]);
        }
        Ok(acc)
    }

    /// The lookahead length these sets were computed for.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the PFIRST set for rule `ridx`.
    pub fn firsts(&self, ridx: RIdx<StorageT>) -> &LookaheadSet<StorageT> {
        &self.firsts[usize::from(ridx)]
    }

    /// Return the PFIRST set for production `pidx`.
    pub fn prod_firsts(&self, pidx: PIdx<StorageT>) -> &LookaheadSet<StorageT> {
        &self.prod_firsts[usize::from(pidx)]
    }

    /// Returns true if rule `ridx` derives the empty string.
    pub fn is_epsilon_set(&self, ridx: RIdx<StorageT>, grm: &BBNFGrammar<StorageT>) -> bool {
        self.firsts[usize::from(ridx)].contains_epsilon(grm.eps_token_idx())
    }

    /// All terminal sequences of length ≤ k over the grammar's alphabet.
    pub fn sigma_star(&self) -> &LookaheadSet<StorageT> {
        &self.sigma_star
    }

    /// Return a pretty-printed version of the PFIRST sets, one rule per line, in the order the
    /// sets were computed.
    pub fn pp(&self, grm: &BBNFGrammar<StorageT>) -> String {
        let mut s = String::new();
        for &ridx in grm.nt_order() {
            s.push_str(&format!(
                "{}: {}\n",
                grm.rule_name(ridx),
                self.firsts(ridx).pp(grm)
            ));
        }
        s
    }
}
