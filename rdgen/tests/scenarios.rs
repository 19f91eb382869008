//! End-to-end runs of the whole pipeline (grammar text -> analysis -> table -> emitted source)
//! over small grammars exercising each feature of the formalism.

use bbnfgrammar::bbnf::{BBNFGrammar, FirstsErrorKind};
use rdgen::RDParserBuilder;

fn pipeline(src: &str, k: usize) -> String {
    let grm = BBNFGrammar::new(src).unwrap();
    let (_, _, table) = llktable::from_bbnf(&grm, k).unwrap();
    RDParserBuilder::new(&grm, &table).build()
}

#[test]
fn parentheses_k1() {
    let grm = BBNFGrammar::new(r#"S -> "(" S ")" S | epsilon;"#).unwrap();
    let (firsts, follows, table) = llktable::from_bbnf(&grm, 1).unwrap();
    let s = grm.rule_idx("S").unwrap();
    let eps = grm.eps_token_idx();
    let op = grm.token_idx("(").unwrap();
    let cl = grm.token_idx(")").unwrap();
    assert_eq!(firsts.firsts(s).iter().count(), 2);
    assert!(firsts.firsts(s).contains(&[eps]));
    assert!(firsts.firsts(s).contains(&[op]));
    assert_eq!(follows.follows(s).iter().count(), 2);
    assert!(follows.follows(s).contains(&[eps]));
    assert!(follows.follows(s).contains(&[cl]));
    assert_eq!(table.len(), 3);
    let src = RDParserBuilder::new(&grm, &table).build();
    // One dispatch branch per table key.
    assert_eq!(src.matches("p.lookahead_matches(").count(), 3);
    assert!(src.contains("fn nonterminal0"));
    assert!(src.contains("match nonterminal0(&mut p, true)"));
}

#[test]
fn conjunction_of_two_positives() {
    let src = pipeline(r#"A -> B & C; B -> "a" B | "a"; C -> "a" C | "a";"#, 1);
    // Both positive conjuncts are parsed against the same substring.
    assert!(src.contains("let start = p.pos;"));
    assert!(src.contains("if p.pos != end {"));
    assert!(src.contains("conjuncts of 'A' to cover the same substring"));
}

#[test]
fn negation_carves_out_a_keyword() {
    let src = pipeline(
        r#"ID -> LETTERS & ~ "i" "f"; LETTERS -> "i" LETTERS | "f" LETTERS | "i" | "f";"#,
        1,
    );
    assert!(src.contains("(p, !wanted).is_none()"));
    assert!(src.contains("if matched && p.pos == end {"));
}

#[test]
fn left_recursion_rejected() {
    let grm = BBNFGrammar::new(r#"E -> E "+" T | T; T -> "t";"#).unwrap();
    let e = llktable::from_bbnf(&grm, 1).unwrap_err();
    assert_eq!(e.kind, FirstsErrorKind::LeftRecursion);
}

#[test]
fn contradictory_rule_rejected() {
    let grm = BBNFGrammar::new(r#"X -> "a" & "b";"#).unwrap();
    let e = llktable::from_bbnf(&grm, 1).unwrap_err();
    assert_eq!(e.kind, FirstsErrorKind::ContradictoryRule);
}

#[test]
fn k2_lookahead_disambiguates() {
    let grm = BBNFGrammar::new(r#"S -> "a" "b" | "a" "c";"#).unwrap();
    let (_, _, t1) = llktable::from_bbnf(&grm, 1).unwrap();
    assert_eq!(t1.len(), 1);
    let (_, _, t2) = llktable::from_bbnf(&grm, 2).unwrap();
    assert_eq!(t2.len(), 2);
    let src = RDParserBuilder::new(&grm, &t2).build();
    assert!(src.contains("p.lookahead_matches(&[\"a\", \"b\"])"));
    assert!(src.contains("p.lookahead_matches(&[\"a\", \"c\"])"));
}
