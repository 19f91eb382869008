use std::collections::HashMap;

use num_traits::{self, AsPrimitive, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use vob::Vob;

use super::{
    ast::{self, GrammarAST},
    parser::BBNFGrammarError,
};
use crate::{CIdx, PIdx, RIdx, Span, Symbol, TIdx};

/// Representation of a `BBNFGrammar`. See the [top-level documentation](../index.html) for the
/// guarantees this struct makes about rules, tokens, productions, and conjuncts.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BBNFGrammar<StorageT = u32> {
    /// How many rules (non-terminals) does this grammar have?
    rules_len: RIdx<StorageT>,
    /// A mapping from `RIdx` -> `(String, Span)`.
    rule_names: Vec<(String, Span)>,
    /// How many terminals does this grammar have? Terminal 0 is always the empty string.
    tokens_len: TIdx<StorageT>,
    /// A mapping from `TIdx` -> `String`, in declaration order.
    token_names: Vec<String>,
    /// All the grammar's conjuncts, addressed by `CIdx`. Parsing tables reference conjuncts
    /// through this arena rather than sharing ownership of grammar nodes.
    conjs: Vec<Conjunct<StorageT>>,
    conjs_len: CIdx<StorageT>,
    /// A mapping from each production to its ordered conjunct list.
    prods: Vec<Vec<CIdx<StorageT>>>,
    prods_len: PIdx<StorageT>,
    /// A mapping from rules to their productions, in declaration order.
    rules_prods: Vec<Vec<PIdx<StorageT>>>,
    /// A mapping from each production to its deriving rule.
    prods_rules: Vec<RIdx<StorageT>>,
    /// Per-rule adjacency: bit `r` of `refs[x]` is set iff some positive conjunct of a production
    /// of rule `x` references rule `r`. Negative conjuncts do not contribute.
    refs: Vec<Vob>,
    /// Non-terminals in callees-before-callers order (post-order DFS over `refs`, roots taken in
    /// declaration order).
    nt_order: Vec<RIdx<StorageT>>,
    /// The rule on which no other rule depends: the last entry of `nt_order`.
    start_rule: RIdx<StorageT>,
}

/// An interned conjunct: a possibly negated sequence of symbols.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Conjunct<StorageT> {
    pos: bool,
    symbols: Vec<Symbol<StorageT>>,
}

impl<StorageT> Conjunct<StorageT> {
    /// Is this a positive conjunct? A string matches a production iff it matches all the
    /// production's positive conjuncts and none of its negative conjuncts.
    pub fn is_positive(&self) -> bool {
        self.pos
    }

    pub fn symbols(&self) -> &[Symbol<StorageT>] {
        &self.symbols
    }
}

impl BBNFGrammar<u32> {
    pub fn new(s: &str) -> Result<Self, BBNFGrammarError> {
        BBNFGrammar::new_with_storaget(s)
    }
}

impl<StorageT: 'static + PrimInt + Unsigned> BBNFGrammar<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Takes as input a BBNF grammar as a `&str` and returns a `BBNFGrammar` (or a
    /// [`BBNFGrammarError`] on error).
    ///
    /// # Panics
    ///
    /// If `StorageT` is not big enough to index the grammar's rules, tokens, productions, or
    /// conjuncts.
    pub fn new_with_storaget(s: &str) -> Result<Self, BBNFGrammarError> {
        let ast = s.parse::<GrammarAST>()?;

        // Check that StorageT is big enough to hold RIdx/TIdx/PIdx/CIdx values; after these
        // checks things like RIdx(ast.disjs.len().as_()) are safe.
        if ast.disjs.len() > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's rules.");
        }
        if ast.tokens.len() > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's tokens.");
        }
        if ast.conjs.len() > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's conjuncts.");
        }
        let nprods = ast.disjs.values().map(|d| d.rules.len()).sum::<usize>();
        if nprods > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's productions.");
        }

        let rule_names = ast
            .disjs
            .values()
            .map(|d| d.name.clone())
            .collect::<Vec<_>>();
        let mut rule_map = HashMap::<&str, RIdx<StorageT>>::new();
        for (i, (name, _)) in rule_names.iter().enumerate() {
            rule_map.insert(name.as_str(), RIdx(i.as_()));
        }

        let token_names = ast.tokens.iter().cloned().collect::<Vec<_>>();
        debug_assert_eq!(token_names[0], "");
        let mut token_map = HashMap::<&str, TIdx<StorageT>>::new();
        for (i, name) in token_names.iter().enumerate() {
            token_map.insert(name.as_str(), TIdx(i.as_()));
        }

        let conjs = ast
            .conjs
            .iter()
            .map(|c| Conjunct {
                pos: c.pos,
                symbols: c
                    .symbols
                    .iter()
                    .map(|sym| match sym {
                        ast::Symbol::Lit(name, _) => Symbol::Lit(token_map[name.as_str()]),
                        ast::Symbol::Rule(name, _) => Symbol::Rule(rule_map[name.as_str()]),
                        ast::Symbol::Epsilon(_) => Symbol::Epsilon,
                    })
                    .collect(),
            })
            .collect::<Vec<Conjunct<StorageT>>>();

        let mut prods = Vec::new();
        let mut rules_prods = Vec::with_capacity(rule_names.len());
        let mut prods_rules = Vec::new();
        for (i, disj) in ast.disjs.values().enumerate() {
            let mut pidxs = Vec::with_capacity(disj.rules.len());
            for rule in &disj.rules {
                pidxs.push(PIdx(prods.len().as_()));
                prods.push(
                    rule.cidxs
                        .iter()
                        .map(|&c| CIdx(c.as_()))
                        .collect::<Vec<_>>(),
                );
                prods_rules.push(RIdx(i.as_()));
            }
            rules_prods.push(pidxs);
        }

        let mut refs = vec![Vob::from_elem(false, rule_names.len()); rule_names.len()];
        for (pidx, cidxs) in prods.iter().enumerate() {
            let ridx = usize::from(prods_rules[pidx]);
            for cidx in cidxs {
                let conj = &conjs[usize::from(*cidx)];
                if !conj.pos {
                    continue;
                }
                for sym in &conj.symbols {
                    if let Symbol::Rule(r) = sym {
                        refs[ridx].set(usize::from(*r), true);
                    }
                }
            }
        }

        let mut visited = Vob::from_elem(false, rule_names.len());
        let mut nt_order = Vec::with_capacity(rule_names.len());
        for i in 0..rule_names.len() {
            if !visited[i] {
                Self::dfs(i, &refs, &mut visited, &mut nt_order);
            }
        }
        let start_rule = *nt_order.last().unwrap();

        Ok(BBNFGrammar {
            rules_len: RIdx(rule_names.len().as_()),
            rule_names,
            tokens_len: TIdx(token_names.len().as_()),
            token_names,
            conjs_len: CIdx(conjs.len().as_()),
            conjs,
            prods_len: PIdx(prods.len().as_()),
            prods,
            rules_prods,
            prods_rules,
            refs,
            nt_order,
            start_rule,
        })
    }

    /// Post-order depth-first search over the adjacency bitmaps, so that every rule is emitted
    /// after the rules its positive conjuncts reference (cycles permitting).
    fn dfs(i: usize, refs: &[Vob], visited: &mut Vob, order: &mut Vec<RIdx<StorageT>>) {
        visited.set(i, true);
        for r in refs[i].iter_set_bits(..) {
            if !visited[r] {
                Self::dfs(r, refs, visited, order);
            }
        }
        order.push(RIdx(i.as_()));
    }

    /// How many rules does this grammar have?
    pub fn rules_len(&self) -> RIdx<StorageT> {
        self.rules_len
    }

    /// Return an iterator which produces (in order from `0..self.rules_len()`) all this grammar's
    /// valid `RIdx`s.
    pub fn iter_rules(&self) -> impl Iterator<Item = RIdx<StorageT>> {
        (0..usize::from(self.rules_len)).map(|x| RIdx(x.as_()))
    }

    /// Return the index of the rule named `n` or `None` if it doesn't exist.
    pub fn rule_idx(&self, n: &str) -> Option<RIdx<StorageT>> {
        self.rule_names
            .iter()
            .position(|(name, _)| name == n)
            .map(|x| RIdx(x.as_()))
    }

    pub fn rule_name(&self, ridx: RIdx<StorageT>) -> &str {
        &self.rule_names[usize::from(ridx)].0
    }

    pub fn rule_name_span(&self, ridx: RIdx<StorageT>) -> Span {
        self.rule_names[usize::from(ridx)].1
    }

    /// How many terminals does this grammar have (including the empty string)?
    pub fn tokens_len(&self) -> TIdx<StorageT> {
        self.tokens_len
    }

    /// Return an iterator which produces (in order from `0..self.tokens_len()`) all this
    /// grammar's valid `TIdx`s.
    pub fn iter_tidxs(&self) -> impl Iterator<Item = TIdx<StorageT>> {
        (0..usize::from(self.tokens_len)).map(|x| TIdx(x.as_()))
    }

    /// Return the index of the terminal `n` or `None` if it doesn't exist.
    pub fn token_idx(&self, n: &str) -> Option<TIdx<StorageT>> {
        self.token_names
            .iter()
            .position(|name| name == n)
            .map(|x| TIdx(x.as_()))
    }

    pub fn token_name(&self, tidx: TIdx<StorageT>) -> &str {
        &self.token_names[usize::from(tidx)]
    }

    /// The index of the empty string, which is a member of every grammar's alphabet.
    pub fn eps_token_idx(&self) -> TIdx<StorageT> {
        TIdx(StorageT::zero())
    }

    /// How many conjuncts does this grammar have?
    pub fn conjs_len(&self) -> CIdx<StorageT> {
        self.conjs_len
    }

    pub fn conj(&self, cidx: CIdx<StorageT>) -> &Conjunct<StorageT> {
        &self.conjs[usize::from(cidx)]
    }

    /// How many productions does this grammar have?
    pub fn prods_len(&self) -> PIdx<StorageT> {
        self.prods_len
    }

    /// Return an iterator which produces (in order from `0..self.prods_len()`) all this grammar's
    /// valid `PIdx`s.
    pub fn iter_pidxs(&self) -> impl Iterator<Item = PIdx<StorageT>> {
        (0..usize::from(self.prods_len)).map(|x| PIdx(x.as_()))
    }

    /// Return the ordered conjunct list of production `pidx`.
    pub fn prod(&self, pidx: PIdx<StorageT>) -> &[CIdx<StorageT>] {
        &self.prods[usize::from(pidx)]
    }

    /// Return the productions of rule `ridx`, in declaration order.
    pub fn rule_to_prods(&self, ridx: RIdx<StorageT>) -> &[PIdx<StorageT>] {
        &self.rules_prods[usize::from(ridx)]
    }

    pub fn prod_to_rule(&self, pidx: PIdx<StorageT>) -> RIdx<StorageT> {
        self.prods_rules[usize::from(pidx)]
    }

    /// The rules referenced by positive conjuncts of rule `ridx`, as a bitmap over `RIdx`s.
    pub fn references(&self, ridx: RIdx<StorageT>) -> &Vob {
        &self.refs[usize::from(ridx)]
    }

    /// All rules, ordered so that (cycles permitting) callees precede callers. PFIRST sets are
    /// computed in this order; PFOLLOW sets in its reverse.
    pub fn nt_order(&self) -> &[RIdx<StorageT>] {
        &self.nt_order
    }

    /// The start symbol: no other rule depends on it.
    pub fn start_rule_idx(&self) -> RIdx<StorageT> {
        self.start_rule
    }

    /// Return a pretty-printed version of the grammar, one block per rule in declaration order.
    pub fn pp(&self) -> String {
        let mut s = String::new();
        for ridx in self.iter_rules() {
            s.push_str(&format!("NON-TERMINAL {}\n", self.rule_name(ridx)));
            for &pidx in self.rule_to_prods(ridx) {
                s.push_str("    RULE:\n");
                for cidx in self.prod(pidx) {
                    let conj = self.conj(*cidx);
                    if conj.is_positive() {
                        s.push_str("        +VE CONJUNCT:\n");
                    } else {
                        s.push_str("        -VE CONJUNCT:\n");
                    }
                    for sym in conj.symbols() {
                        match sym {
                            Symbol::Lit(tidx) => s.push_str(&format!(
                                "            TERMINAL: {}\n",
                                self.token_name(*tidx)
                            )),
                            Symbol::Rule(r) => s.push_str(&format!(
                                "            NON-TERMINAL: {}\n",
                                self.rule_name(*r)
                            )),
                            Symbol::Epsilon => s.push_str("            TERMINAL: epsilon\n"),
                        }
                    }
                }
            }
        }
        s
    }
}

#[cfg(test)]
mod test {
    use super::BBNFGrammar;
    use crate::{RIdx, Symbol, TIdx};

    #[test]
    fn test_interning() {
        let grm = BBNFGrammar::new(r#"S -> "(" S ")" S | epsilon;"#).unwrap();
        assert_eq!(usize::from(grm.rules_len()), 1);
        assert_eq!(usize::from(grm.tokens_len()), 3);
        assert_eq!(grm.token_name(grm.eps_token_idx()), "");
        assert_eq!(grm.token_idx("("), Some(TIdx(1)));
        assert_eq!(grm.token_idx(")"), Some(TIdx(2)));
        let s = grm.rule_idx("S").unwrap();
        assert_eq!(grm.rule_to_prods(s).len(), 2);
        let p0 = grm.rule_to_prods(s)[0];
        assert_eq!(grm.prod(p0).len(), 1);
        let conj = grm.conj(grm.prod(p0)[0]);
        assert!(conj.is_positive());
        assert_eq!(
            conj.symbols(),
            &[
                Symbol::Lit(TIdx(1)),
                Symbol::Rule(s),
                Symbol::Lit(TIdx(2)),
                Symbol::Rule(s)
            ]
        );
        assert_eq!(grm.prod_to_rule(p0), s);
    }

    #[test]
    fn test_nt_order_callees_first() {
        let grm = BBNFGrammar::new(r#"A -> B "a"; B -> C; C -> "c";"#).unwrap();
        let (a, b, c) = (
            grm.rule_idx("A").unwrap(),
            grm.rule_idx("B").unwrap(),
            grm.rule_idx("C").unwrap(),
        );
        assert_eq!(grm.nt_order(), &[c, b, a]);
        assert_eq!(grm.start_rule_idx(), a);
    }

    #[test]
    fn test_negative_refs_do_not_order() {
        // KW is only referenced from a negative conjunct, so it is not a dependency of ID; it
        // still gets its own place in the order.
        let grm =
            BBNFGrammar::new(r#"ID -> LETTERS & ~ KW; KW -> "if"; LETTERS -> "i" | "f";"#).unwrap();
        let id = grm.rule_idx("ID").unwrap();
        let kw = grm.rule_idx("KW").unwrap();
        let letters = grm.rule_idx("LETTERS").unwrap();
        assert!(!grm.references(id)[usize::from(kw)]);
        assert!(grm.references(id)[usize::from(letters)]);
        assert_eq!(grm.nt_order(), &[letters, id, kw]);
        // The start symbol is the last rule in the order.
        assert_eq!(grm.start_rule_idx(), kw);
    }

    #[test]
    fn test_multiple_disjunctions_start_rule() {
        let grm = BBNFGrammar::new(r#"E -> T "+" T | T; T -> "x";"#).unwrap();
        assert_eq!(grm.start_rule_idx(), grm.rule_idx("E").unwrap());
        assert_eq!(usize::from(grm.prods_len()), 3);
    }

    #[test]
    fn test_pp() {
        let grm = BBNFGrammar::new(r#"S -> "a" & ~ epsilon;"#).unwrap();
        assert_eq!(
            grm.pp(),
            "NON-TERMINAL S\n    RULE:\n        +VE CONJUNCT:\n            TERMINAL: a\n        \
             -VE CONJUNCT:\n            TERMINAL: epsilon\n"
        );
    }

    #[test]
    fn test_rule_idx_roundtrip() {
        let grm = BBNFGrammar::new(r#"A -> "a"; B -> A;"#).unwrap();
        for ridx in grm.iter_rules() {
            assert_eq!(grm.rule_idx(grm.rule_name(ridx)), Some(ridx));
        }
        assert_eq!(grm.rule_idx("Z"), None);
        assert_eq!(
            grm.iter_rules().map(|r| grm.rule_name(r)).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_start_rule_with_cycle() {
        let grm = BBNFGrammar::new(r#"S -> "(" S ")" | epsilon;"#).unwrap();
        assert_eq!(grm.start_rule_idx(), RIdx(0));
        assert_eq!(grm.nt_order(), &[RIdx(0)]);
    }
}
