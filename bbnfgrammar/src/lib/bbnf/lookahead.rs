use std::collections::BTreeSet;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::grammar::BBNFGrammar;
use crate::TIdx;

/// A set of lookahead sequences: the currency of PFIRST/PFOLLOW computation and of LL(k) table
/// keys. Each sequence is an ordered list of at most `k` terminals. The sequence holding the
/// epsilon terminal alone represents the empty string; it only ever occurs as a singleton, and
/// sequences of length ≥ 1 never contain epsilon.
///
/// Sequences are kept in a `BTreeSet` so that iteration (and hence printing and table
/// construction) is deterministic across runs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LookaheadSet<StorageT> {
    seqs: BTreeSet<Vec<TIdx<StorageT>>>,
}

impl<StorageT: 'static + PrimInt + Unsigned> LookaheadSet<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    pub fn new() -> Self {
        LookaheadSet {
            seqs: BTreeSet::new(),
        }
    }

    /// The set containing the single sequence `[t]`.
    pub fn from_terminal(t: TIdx<StorageT>) -> Self {
        let mut seqs = BTreeSet::new();
        seqs.insert(vec![t]);
        LookaheadSet { seqs }
    }

    /// Insert a sequence, returning `true` if it was not already present.
    pub fn insert(&mut self, seq: Vec<TIdx<StorageT>>) -> bool {
        self.seqs.insert(seq)
    }

    pub fn contains(&self, seq: &[TIdx<StorageT>]) -> bool {
        self.seqs.contains(seq)
    }

    /// Does this set contain the empty-string sequence `[eps]`?
    pub fn contains_epsilon(&self, eps: TIdx<StorageT>) -> bool {
        self.seqs.contains([eps].as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec<TIdx<StorageT>>> + '_ {
        self.seqs.iter()
    }

    /// Union `other` into `self`, returning `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.seqs.len();
        self.seqs.extend(other.seqs.iter().cloned());
        self.seqs.len() != before
    }

    /// Remove every sequence of `self` not also in `other`.
    pub fn intersect_with(&mut self, other: &Self) {
        self.seqs.retain(|s| other.seqs.contains(s));
    }

    /// `k`-truncated concatenation. For each pair `(u, v)` of sequences from `self` × `other`,
    /// the output contains `u` with its epsilons dropped, extended with successive non-epsilon
    /// terminals of `v` until it is `k` long (or `v` runs out); a result that ends up with no
    /// terminals at all becomes the epsilon sequence.
    ///
    /// The empty set is a left identity: `∅.k_concat(b) == b`. This primes the fold-from-nothing
    /// accumulators used throughout PFIRST/PFOLLOW computation.
    pub fn k_concat(&self, other: &Self, k: usize, eps: TIdx<StorageT>) -> Self {
        debug_assert!(k >= 1);
        if self.seqs.is_empty() {
            return other.clone();
        }
        let mut seqs = BTreeSet::new();
        for u in &self.seqs {
            for v in &other.seqs {
                let mut w = u
                    .iter()
                    .filter(|t| **t != eps)
                    .copied()
                    .collect::<Vec<_>>();
                let mut vit = v.iter().filter(|t| **t != eps);
                while w.len() < k {
                    match vit.next() {
                        Some(t) => w.push(*t),
                        None => break,
                    }
                }
                if w.is_empty() {
                    w.push(eps);
                }
                seqs.insert(w);
            }
        }
        LookaheadSet { seqs }
    }

    /// Close the set under concatenation with itself, truncated to length `k`: the update
    /// `A := (A ∪ {[eps]}).k_concat(A)` is applied exactly `k` times, computing the fixed point
    /// of self-concatenation for sequences of length ≤ `k`.
    pub fn self_closure(&self, k: usize, eps: TIdx<StorageT>) -> Self {
        let mut acc = self.clone();
        for _ in 0..k {
            let mut lhs = acc.clone();
            lhs.insert(vec![eps]);
            acc = lhs.k_concat(&acc, k, eps);
        }
        acc
    }

    /// All sequences of at most `k` terminals over the grammar's alphabet, including the empty
    /// string: the PFIRST set of a production with no positive conjuncts.
    pub fn sigma_star(grm: &BBNFGrammar<StorageT>, k: usize) -> Self {
        let eps = grm.eps_token_idx();
        let mut set = LookaheadSet::new();
        set.insert(vec![eps]);
        for tidx in grm.iter_tidxs() {
            if tidx != eps {
                set.insert(vec![tidx]);
            }
        }
        for _ in 0..k {
            set = set.k_concat(&set, k, eps);
        }
        set
    }

    /// Return a pretty-printed version of the set: sequences separated by commas, the terminals
    /// of each sequence separated by spaces, epsilon printed as the word `epsilon`.
    pub fn pp(&self, grm: &BBNFGrammar<StorageT>) -> String {
        let eps = grm.eps_token_idx();
        self.seqs
            .iter()
            .map(|seq| {
                seq.iter()
                    .map(|t| {
                        if *t == eps {
                            "epsilon"
                        } else {
                            grm.token_name(*t)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod test {
    use super::{BBNFGrammar, LookaheadSet};
    use crate::TIdx;

    const EPS: TIdx<u32> = TIdx(0);

    fn set(seqs: &[&[u32]]) -> LookaheadSet<u32> {
        let mut s = LookaheadSet::new();
        for seq in seqs {
            s.insert(seq.iter().map(|&t| TIdx(t)).collect());
        }
        s
    }

    #[test]
    fn test_empty_is_left_identity() {
        let b = set(&[&[1], &[2, 3]]);
        assert_eq!(LookaheadSet::new().k_concat(&b, 3, EPS), b);
    }

    #[test]
    fn test_epsilon_is_right_identity() {
        let a = set(&[&[1], &[2, 3]]);
        assert_eq!(a.k_concat(&set(&[&[0]]), 3, EPS), a);
    }

    #[test]
    fn test_epsilon_absorbed_on_left() {
        assert_eq!(set(&[&[0]]).k_concat(&set(&[&[1]]), 2, EPS), set(&[&[1]]));
        assert_eq!(set(&[&[0]]).k_concat(&set(&[&[0]]), 2, EPS), set(&[&[0]]));
    }

    #[test]
    fn test_truncation() {
        // u is extended with v's terminals only up to length k.
        assert_eq!(
            set(&[&[1]]).k_concat(&set(&[&[2, 3]]), 2, EPS),
            set(&[&[1, 2]])
        );
        // Already-full sequences are unchanged whatever they meet.
        assert_eq!(
            set(&[&[1, 2]]).k_concat(&set(&[&[3]]), 2, EPS),
            set(&[&[1, 2]])
        );
    }

    #[test]
    fn test_pairwise_products_are_deduplicated() {
        let a = set(&[&[1], &[1, 2]]);
        let b = set(&[&[2], &[2, 2]]);
        // [1] ++ [2] and [1 2] ++ anything all collapse to [1 2].
        assert_eq!(a.k_concat(&b, 2, EPS), set(&[&[1, 2]]));
    }

    #[test]
    fn test_associativity_up_to_truncation() {
        let a = set(&[&[1], &[0]]);
        let b = set(&[&[2, 3]]);
        let c = set(&[&[4], &[0]]);
        for k in 1..4 {
            assert_eq!(
                a.k_concat(&b, k, EPS).k_concat(&c, k, EPS),
                a.k_concat(&b.k_concat(&c, k, EPS), k, EPS)
            );
        }
    }

    #[test]
    fn test_length_bound_and_no_interior_epsilon() {
        let a = set(&[&[0], &[1], &[1, 2]]);
        let b = set(&[&[0], &[3]]);
        for k in 1..4 {
            let r = a.k_concat(&b, k, EPS);
            for seq in r.iter() {
                assert!(seq.len() <= k);
                if seq.len() > 1 || seq[0] != EPS {
                    assert!(seq.iter().all(|&t| t != EPS));
                }
            }
        }
    }

    #[test]
    fn test_self_closure() {
        // Closure of {[a]} under self-concatenation: a, aa, ... up to length k.
        assert_eq!(set(&[&[1]]).self_closure(1, EPS), set(&[&[1]]));
        assert_eq!(set(&[&[1]]).self_closure(2, EPS), set(&[&[1], &[1, 1]]));
        // A nullable set keeps its epsilon.
        assert_eq!(
            set(&[&[1], &[0]]).self_closure(2, EPS),
            set(&[&[0], &[1], &[1, 1]])
        );
        // The empty set has no sequences to extend.
        assert_eq!(LookaheadSet::new().self_closure(2, EPS), LookaheadSet::new());
        // The closure is a fixed point: applying it again changes nothing.
        for k in 1..4 {
            let once = set(&[&[1], &[2, 3]]).self_closure(k, EPS);
            assert_eq!(once.self_closure(k, EPS), once);
        }
    }

    #[test]
    fn test_sigma_star() {
        let grm = BBNFGrammar::new(r#"S -> "a" "b";"#).unwrap();
        let s1 = LookaheadSet::sigma_star(&grm, 1);
        assert_eq!(s1, set(&[&[0], &[1], &[2]]));
        let s2 = LookaheadSet::sigma_star(&grm, 2);
        assert_eq!(
            s2,
            set(&[&[0], &[1], &[2], &[1, 1], &[1, 2], &[2, 1], &[2, 2]])
        );
    }

    #[test]
    fn test_union_and_intersection() {
        let mut a = set(&[&[1], &[2]]);
        assert!(a.union_with(&set(&[&[2], &[3]])));
        assert!(!a.union_with(&set(&[&[3]])));
        assert_eq!(a, set(&[&[1], &[2], &[3]]));
        a.intersect_with(&set(&[&[2], &[3], &[4]]));
        assert_eq!(a, set(&[&[2], &[3]]));
    }

    #[test]
    fn test_pp() {
        let grm = BBNFGrammar::new(r#"S -> "a" "b" | epsilon;"#).unwrap();
        let s = LookaheadSet::sigma_star(&grm, 2);
        assert_eq!(
            s.pp(&grm),
            "epsilon, a, a a, a b, b, b a, b b"
        );
    }
}
