use num_traits::{AsPrimitive, PrimInt, Unsigned};

use super::{firsts::BBNFFirsts, grammar::BBNFGrammar, lookahead::LookaheadSet};
use crate::{RIdx, Symbol};

/// `BBNFFollows` stores the length-≤-k PFOLLOW sets for a grammar. For example, given this code
/// and grammar:
/// ```text
///   let grm = BBNFGrammar::new(r#"
///     S -> A "b";
///     A -> "a" | epsilon;
///   "#).unwrap();
///   let firsts = BBNFFirsts::new(&grm, 1).unwrap();
///   let follows = BBNFFollows::new(&grm, &firsts, 1);
/// ```
/// then the following assertions (and only the following assertions) about the PFOLLOW sets are
/// correct:
/// ```text
///   assert!(follows.follows(grm.rule_idx("S").unwrap()).contains(&[grm.eps_token_idx()]));
///   assert!(follows.follows(grm.rule_idx("A").unwrap()).contains(&[grm.token_idx("b").unwrap()]));
/// ```
#[derive(Debug)]
pub struct BBNFFollows<StorageT> {
    k: usize,
    /// A mapping from `RIdx` -> PFOLLOW set.
    follows: Vec<LookaheadSet<StorageT>>,
}

impl<StorageT: 'static + PrimInt + Unsigned> BBNFFollows<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the PFOLLOW sets for the given grammar. Rules are visited in
    /// reverse dependency order (callers before callees), so right-context flows from the start
    /// symbol downwards; the start symbol itself is followed only by the empty string.
    ///
    /// Our implementation walks every conjunct of every production once. For each non-terminal
    /// occurrence we build the lookahead set of the suffix to its right, then extend it with the
    /// deriving rule's own PFOLLOW set (or, for an occurrence of the deriving rule itself, with
    /// the closure of the suffix under self-concatenation), and merge the result into the
    /// occurrence's PFOLLOW set. Negative conjuncts are walked like positive ones: the
    /// sub-parsers emitted for their interiors need a right context too, even though negative
    /// conjuncts never choose table entries.
    pub fn new(grm: &BBNFGrammar<StorageT>, firsts: &BBNFFirsts<StorageT>, k: usize) -> Self {
        debug_assert!(k >= 1);
        let eps = grm.eps_token_idx();
        let mut follows = vec![LookaheadSet::new(); usize::from(grm.rules_len())];
        follows[usize::from(grm.start_rule_idx())].insert(vec![eps]);

        for &ridx in grm.nt_order().iter().rev() {
            for &pidx in grm.rule_to_prods(ridx) {
                for &cidx in grm.prod(pidx) {
                    let symbols = grm.conj(cidx).symbols();
                    for (i, sym) in symbols.iter().enumerate() {
                        let m = match sym {
                            Symbol::Rule(m) => *m,
                            Symbol::Lit(_) | Symbol::Epsilon => continue,
                        };
                        let mut partial = LookaheadSet::new();
                        for nsym in &symbols[i + 1..] {
                            match nsym {
                                Symbol::Lit(t) => {
                                    partial = partial.k_concat(
                                        &LookaheadSet::from_terminal(*t),
                                        k,
                                        eps,
                                    );
                                }
                                Symbol::Rule(n) => {
                                    partial = partial.k_concat(firsts.firsts(*n), k, eps);
                                }
                                Symbol::Epsilon => (),
                            }
                        }
                        let partial = if m == ridx {
                            partial.self_closure(k, eps)
                        } else {
                            partial.k_concat(&follows[usize::from(ridx)], k, eps)
                        };
                        follows[usize::from(m)].union_with(&partial);
                    }
                }
            }
        }

        BBNFFollows { k, follows }
    }

    /// The lookahead length these sets were computed for.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the PFOLLOW set for rule `ridx`.
    pub fn follows(&self, ridx: RIdx<StorageT>) -> &LookaheadSet<StorageT> {
        &self.follows[usize::from(ridx)]
    }

    /// Return a pretty-printed version of the PFOLLOW sets, one rule per line, in the order the
    /// sets were computed.
    pub fn pp(&self, grm: &BBNFGrammar<StorageT>) -> String {
        let mut s = String::new();
        for &ridx in grm.nt_order().iter().rev() {
            s.push_str(&format!(
                "{}: {}\n",
                grm.rule_name(ridx),
                self.follows(ridx).pp(grm)
            ));
        }
        s
    }
}
