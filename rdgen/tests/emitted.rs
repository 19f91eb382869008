//! Compile each emitted parser with rustc and run the resulting binary against real input,
//! checking accept/reject behaviour and output end to end. Grammars which are rejected at
//! generation time never produce a parser; that path is covered in `scenarios.rs`.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use tempfile::TempDir;

use bbnfgrammar::bbnf::BBNFGrammar;
use rdgen::RDParserBuilder;

/// Generate a parser for `grammar` with lookahead `k`, write it into `tdir`, and compile it,
/// returning the path of the binary. The emitted source has no dependencies, so a plain rustc
/// invocation suffices.
fn compile_parser(tdir: &TempDir, grammar: &str, k: usize) -> PathBuf {
    let grm = BBNFGrammar::new(grammar).unwrap();
    let (_, _, table) = llktable::from_bbnf(&grm, k).unwrap();
    let mut src_p = PathBuf::from(tdir.as_ref());
    src_p.push("rd_parser.rs");
    RDParserBuilder::new(&grm, &table)
        .write_to_path(&src_p)
        .unwrap();
    let mut bin_p = PathBuf::from(tdir.as_ref());
    bin_p.push("rd_parser");
    let c = Command::new("rustc")
        .args(["--edition", "2021", "-o"])
        .arg(&bin_p)
        .arg(&src_p)
        .output()
        .expect("Couldn't run rustc");
    if !c.status.success() {
        println!("{}", String::from_utf8_lossy(&c.stdout));
        eprintln!("{}", String::from_utf8_lossy(&c.stderr));
    }
    assert!(c.status.success(), "rustc rejected the emitted parser");
    bin_p
}

/// Run a compiled parser over `input`, returning whether it accepted and what it printed.
fn run_parser(bin_p: &Path, tdir: &TempDir, input: &str) -> (bool, String) {
    let mut input_p = PathBuf::from(tdir.as_ref());
    input_p.push("input.txt");
    fs::write(&input_p, input).unwrap();
    let c = Command::new(bin_p)
        .arg(&input_p)
        .output()
        .expect("Couldn't run the emitted parser");
    let stdout = String::from_utf8_lossy(&c.stdout).into_owned();
    let accepted = c.status.success();
    // The exit code and the success banner must agree.
    assert_eq!(
        accepted,
        stdout.starts_with("Parsing successful"),
        "inconsistent verdict on {:?}: {}",
        input,
        stdout
    );
    (accepted, stdout)
}

fn accepts(bin_p: &Path, tdir: &TempDir, input: &str) -> bool {
    run_parser(bin_p, tdir, input).0
}

#[test]
fn parentheses_k1() {
    let tdir = TempDir::new().unwrap();
    let bin_p = compile_parser(&tdir, r#"S -> "(" S ")" S | epsilon;"#, 1);
    assert!(accepts(&bin_p, &tdir, "(())"));
    assert!(accepts(&bin_p, &tdir, ""));
    assert!(accepts(&bin_p, &tdir, "( ) ( )"));
    assert!(!accepts(&bin_p, &tdir, "(()"));
    let (_, stdout) = run_parser(&bin_p, &tdir, "(()");
    assert!(stdout.contains("Parse error"), "{}", stdout);
    // A parse which succeeds without consuming everything is still a failure.
    let (accepted, stdout) = run_parser(&bin_p, &tdir, ")");
    assert!(!accepted);
    assert!(
        stdout.contains("parsing terminated before end of input"),
        "{}",
        stdout
    );
}

#[test]
fn parentheses_parse_tree() {
    let tdir = TempDir::new().unwrap();
    let bin_p = compile_parser(&tdir, r#"S -> "(" S ")" S | epsilon;"#, 1);
    let (_, stdout) = run_parser(&bin_p, &tdir, "()");
    assert_eq!(
        stdout,
        "Parsing successful\nS\n    (\n    S\n    )\n    S\n"
    );
}

#[test]
fn conjunction_of_two_positives() {
    // At k=1 both of B's productions claim the lookahead "a" and the overwrite leaves only the
    // non-recursive one; at k=2 the recursive production keeps the key "a a" while the single
    // remaining "a" selects the base case.
    let tdir = TempDir::new().unwrap();
    let bin_p = compile_parser(&tdir, r#"A -> B & C; B -> "a" B | "a"; C -> "a" C | "a";"#, 2);
    assert!(accepts(&bin_p, &tdir, "a"));
    assert!(accepts(&bin_p, &tdir, "aa"));
    assert!(accepts(&bin_p, &tdir, "a a a"));
    assert!(!accepts(&bin_p, &tdir, ""));
    // Both positive conjuncts contribute a subtree version over the same substring.
    let (_, stdout) = run_parser(&bin_p, &tdir, "aaa");
    assert!(stdout.contains("<conjunct 1>"), "{}", stdout);
    assert!(stdout.contains("<conjunct 2>"), "{}", stdout);
}

#[test]
fn negation_carves_out_a_keyword() {
    // LETTERS is layered over LETTER so that its recursive and base productions get distinct
    // length-2 table keys: a bare key "i" (shorter than k) only matches at the end of the input.
    let tdir = TempDir::new().unwrap();
    let bin_p = compile_parser(
        &tdir,
        r#"ID -> LETTERS & ~ "i" "f"; LETTERS -> LETTER LETTERS | LETTER; LETTER -> "i" | "f";"#,
        2,
    );
    assert!(accepts(&bin_p, &tdir, "iff"));
    assert!(accepts(&bin_p, &tdir, "ii"));
    assert!(accepts(&bin_p, &tdir, "i"));
    assert!(accepts(&bin_p, &tdir, "fi"));
    assert!(!accepts(&bin_p, &tdir, ""));
    // The negated conjunct matches exactly the keyword's substring, failing the rule.
    let (accepted, stdout) = run_parser(&bin_p, &tdir, "if");
    assert!(!accepted);
    assert!(
        stdout.contains("input not to match a negated conjunct of 'ID'"),
        "{}",
        stdout
    );
}

#[test]
fn k2_lookahead_disambiguates() {
    let tdir = TempDir::new().unwrap();
    let bin_p = compile_parser(&tdir, r#"S -> "a" "b" | "a" "c";"#, 2);
    assert!(accepts(&bin_p, &tdir, "ab"));
    assert!(accepts(&bin_p, &tdir, "a c"));
    assert!(!accepts(&bin_p, &tdir, "a"));
    assert!(!accepts(&bin_p, &tdir, "abc"));
    // "d" is not in the grammar's alphabet at all.
    let (accepted, stdout) = run_parser(&bin_p, &tdir, "ad");
    assert!(!accepted);
    assert!(stdout.contains("Lexer error"), "{}", stdout);
}
