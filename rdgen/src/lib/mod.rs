#![forbid(unsafe_code)]

//! Emit a standalone recursive-descent parser for a BBNF grammar from its LL(k) parsing table.
//!
//! The emitted artifact is a single Rust source file with no dependencies beyond `std`. At
//! runtime it tokenizes its input by splitting on whitespace and greedily matching the longest
//! terminal of the grammar's alphabet, parses from the start symbol, and prints either
//! `Parsing successful` followed by the parse forest or a positioned error.
//!
//! Conjunction and negation are enforced by the substring discipline the generated functions
//! implement: within a multi-conjunct production all positive conjuncts must consume the
//! identical substring, and a negative conjunct fails the production iff it matches exactly that
//! substring. The `wanted` flag threaded through every generated function suppresses diagnostics
//! inside negative conjuncts, where failure is success.

use std::{fmt::Write as _, fs::File, io::Write as _, path::Path};

use num_traits::{AsPrimitive, PrimInt, Unsigned};

use bbnfgrammar::{
    bbnf::BBNFGrammar,
    CIdx, RIdx, Symbol, TIdx,
};
use llktable::LLkTable;

/// An `RDParserBuilder` emits a recursive-descent parser for one grammar/table pair.
///
/// # Examples
///
/// ```text
/// let grm = BBNFGrammar::new(src)?;
/// let (_, _, table) = llktable::from_bbnf(&grm, k)?;
/// RDParserBuilder::new(&grm, &table).write_to_path("rd_parser.rs")?;
/// ```
pub struct RDParserBuilder<'a, StorageT = u32> {
    grm: &'a BBNFGrammar<StorageT>,
    table: &'a LLkTable<StorageT>,
    /// A mapping from `RIdx` to the rule's position in the grammar's dependency order, which is
    /// the number borne by its generated function. The start symbol thus has the highest number.
    nt_ids: Vec<usize>,
}

impl<'a, StorageT: 'static + PrimInt + Unsigned> RDParserBuilder<'a, StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    pub fn new(grm: &'a BBNFGrammar<StorageT>, table: &'a LLkTable<StorageT>) -> Self {
        let mut nt_ids = vec![0; usize::from(grm.rules_len())];
        for (id, &ridx) in grm.nt_order().iter().enumerate() {
            nt_ids[usize::from(ridx)] = id;
        }
        RDParserBuilder {
            grm,
            table,
            nt_ids,
        }
    }

    /// Generate the parser and write it to `path`. The file is created (or truncated) and closed
    /// unconditionally.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut f = File::create(path)?;
        f.write_all(self.build().as_bytes())
    }

    /// Generate the parser source.
    pub fn build(&self) -> String {
        let mut outs = String::new();
        outs.push_str(&self.gen_header());
        outs.push_str(GEN_RUNTIME);
        for tidx in self.grm.iter_tidxs() {
            if tidx != self.grm.eps_token_idx() {
                outs.push_str(&self.gen_terminal_fn(tidx));
            }
        }
        for (id, &ridx) in self.grm.nt_order().iter().enumerate() {
            outs.push_str(&self.gen_rule_fn(id, ridx));
        }
        outs.push_str(&self.gen_main());
        outs
    }

    fn gen_header(&self) -> String {
        let terms = self
            .grm
            .iter_tidxs()
            .filter(|&t| t != self.grm.eps_token_idx())
            .map(|t| format!("{:?}", self.grm.token_name(t)))
            .collect::<Vec<_>>();
        format!(
            "// Recursive-descent parser generated by rdgen. Do not edit.\n\
             #![allow(dead_code, unused_mut, unused_variables, clippy::all)]\n\n\
             use std::{{env, fs, process}};\n\n\
             const K: usize = {};\n\
             const TERMINALS: [&str; {}] = [{}];\n",
            self.table.k(),
            terms.len(),
            terms.join(", ")
        )
    }

    /// The generated function name for terminal `tidx`. Terminals are numbered in declaration
    /// order, skipping the empty string.
    fn terminal_fn(&self, tidx: TIdx<StorageT>) -> String {
        debug_assert!(tidx != self.grm.eps_token_idx());
        format!("terminal{}", usize::from(tidx) - 1)
    }

    /// The generated function name for rule `ridx`. Rules are numbered in dependency order, so
    /// the start symbol's function bears the highest number.
    fn rule_fn(&self, ridx: RIdx<StorageT>) -> String {
        format!("nonterminal{}", self.nt_ids[usize::from(ridx)])
    }

    fn gen_terminal_fn(&self, tidx: TIdx<StorageT>) -> String {
        let name = self.grm.token_name(tidx);
        format!(
            "\nfn {fname}(p: &mut Parser, wanted: bool) -> Option<Tree> {{\n    \
                 if p.pos < p.sentence.len() && p.sentence[p.pos].text == {lit} {{\n        \
                     p.pos += 1;\n        \
                     Some(Tree::Leaf({lit}))\n    \
                 }} else {{\n        \
                     if wanted {{\n            \
                         p.parse_error({expect});\n        \
                     }}\n        \
                     None\n    \
                 }}\n\
             }}\n",
            fname = self.terminal_fn(tidx),
            lit = format!("{:?}", name),
            expect = format!("{:?}", format!("'{}'", name)),
        )
    }

    /// Render a lookahead sequence as a Rust slice literal for the generated
    /// `lookahead_matches` calls. The empty string stands for end of input.
    fn seq_literal(&self, seq: &[TIdx<StorageT>]) -> String {
        let elems = seq
            .iter()
            .map(|&t| format!("{:?}", self.grm.token_name(t)))
            .collect::<Vec<_>>();
        format!("&[{}]", elems.join(", "))
    }

    /// Render a lookahead sequence for diagnostics.
    fn seq_display(&self, seq: &[TIdx<StorageT>]) -> String {
        let eps = self.grm.eps_token_idx();
        seq.iter()
            .map(|&t| {
                if t == eps {
                    "epsilon".to_string()
                } else {
                    format!("\"{}\"", self.grm.token_name(t))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Emit the statements which parse one symbol of a positive conjunct, pushing the resulting
    /// subtree onto `children`.
    fn gen_positive_sym(&self, sym: &Symbol<StorageT>, indent: &str) -> String {
        let fname = match sym {
            Symbol::Lit(t) => self.terminal_fn(*t),
            Symbol::Rule(r) => self.rule_fn(*r),
            // Epsilon consumes nothing and contributes no subtree.
            Symbol::Epsilon => return String::new(),
        };
        format!(
            "{ind}match {fname}(p, wanted) {{\n\
             {ind}    Some(t) => children.push(t),\n\
             {ind}    None => return None,\n\
             {ind}}}\n",
            ind = indent,
            fname = fname,
        )
    }

    /// Emit one dispatch case of a rule function: the lookahead test plus the conjunct
    /// discipline for the production the table chose for this sequence.
    fn gen_case(
        &self,
        ridx: RIdx<StorageT>,
        seq: &[TIdx<StorageT>],
        cidxs: &[CIdx<StorageT>],
    ) -> String {
        let rname = self.grm.rule_name(ridx);
        let mut outs = String::new();
        writeln!(outs, "    if p.lookahead_matches({}) {{", self.seq_literal(seq)).ok();

        if cidxs.len() == 1 && self.grm.conj(cidxs[0]).is_positive() {
            // A single positive conjunct needs none of the substring machinery.
            outs.push_str("        let mut children = Vec::new();\n");
            for sym in self.grm.conj(cidxs[0]).symbols() {
                outs.push_str(&self.gen_positive_sym(sym, "        "));
            }
            writeln!(
                outs,
                "        return Some(Tree::Node {{\n            name: {:?},\n            \
                 versions: vec![children],\n        }});",
                rname
            )
            .ok();
            outs.push_str("    }\n");
            return outs;
        }

        // Multiple conjuncts (or a lone negative one): all conjuncts must cover the same
        // substring `start..end`. The first positive conjunct is parsed first since it is the
        // one which determines `end`; the rest then follow in declaration order. A production
        // with no positive conjunct covers the empty substring.
        outs.push_str(
            "        let start = p.pos;\n        let mut end = start;\n        \
             let mut versions: Vec<Vec<Tree>> = Vec::new();\n",
        );
        let first_pos = cidxs
            .iter()
            .position(|&cidx| self.grm.conj(cidx).is_positive());
        let mut ordered = Vec::with_capacity(cidxs.len());
        if let Some(i) = first_pos {
            ordered.push(cidxs[i]);
            ordered.extend(cidxs.iter().enumerate().filter(|&(j, _)| j != i).map(|(_, &c)| c));
        } else {
            ordered.extend(cidxs.iter().copied());
        }
        for (n, &cidx) in ordered.iter().enumerate() {
            let conj = self.grm.conj(cidx);
            if conj.is_positive() {
                outs.push_str("        {\n");
                if n > 0 {
                    outs.push_str("            p.pos = start;\n");
                }
                outs.push_str("            let mut children = Vec::new();\n");
                for sym in conj.symbols() {
                    outs.push_str(&self.gen_positive_sym(sym, "            "));
                }
                if n == 0 {
                    outs.push_str("            end = p.pos;\n");
                } else {
                    writeln!(
                        outs,
                        "            if p.pos != end {{\n                if wanted {{\n                    \
                         p.parse_error({:?});\n                }}\n                return None;\n            \
                         }}",
                        format!("conjuncts of '{}' to cover the same substring", rname)
                    )
                    .ok();
                }
                outs.push_str("            versions.push(children);\n        }\n");
            } else {
                outs.push_str(
                    "        {\n            p.pos = start;\n            \
                     let matched = (|p: &mut Parser| {\n",
                );
                for sym in conj.symbols() {
                    let fname = match sym {
                        Symbol::Lit(t) => self.terminal_fn(*t),
                        Symbol::Rule(r) => self.rule_fn(*r),
                        Symbol::Epsilon => continue,
                    };
                    writeln!(
                        outs,
                        "                if {}(p, !wanted).is_none() {{\n                    \
                         return false;\n                }}",
                        fname
                    )
                    .ok();
                }
                outs.push_str("                true\n            })(p);\n");
                writeln!(
                    outs,
                    "            if matched && p.pos == end {{\n                if wanted {{\n                    \
                     p.parse_error({:?});\n                }}\n                return None;\n            }}\n        }}",
                    format!("input not to match a negated conjunct of '{}'", rname)
                )
                .ok();
            }
        }
        writeln!(
            outs,
            "        p.pos = end;\n        return Some(Tree::Node {{\n            name: {:?},\n            \
             versions,\n        }});",
            rname
        )
        .ok();
        outs.push_str("    }\n");
        outs
    }

    fn gen_rule_fn(&self, id: usize, ridx: RIdx<StorageT>) -> String {
        let mut cases = String::new();
        for seq in self.table.keys_for_rule(ridx) {
            let cidxs = self.table.lookup(ridx, seq).unwrap();
            cases.push_str(&self.gen_case(ridx, seq, cidxs));
        }
        let expecting = self
            .table
            .keys_for_rule(ridx)
            .map(|seq| self.seq_display(seq))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "\nfn nonterminal{id}(p: &mut Parser, wanted: bool) -> Option<Tree> {{\n\
             {cases}    \
             if wanted {{\n        \
                 p.parse_error({expect});\n    \
             }}\n    \
             None\n\
             }}\n",
            id = id,
            cases = cases,
            expect = format!("{:?}", format!("one of: {}", expecting)),
        )
    }

    fn gen_main(&self) -> String {
        format!(
            r#"
fn main() {{
    let args = env::args().collect::<Vec<_>>();
    if args.len() != 2 {{
        eprintln!("Usage: {{}} <input file>", args[0]);
        process::exit(1);
    }}
    let src = match fs::read_to_string(&args[1]) {{
        Ok(s) => s,
        Err(e) => {{
            eprintln!("Can't open file {{}}: {{}}", args[1], e);
            process::exit(1);
        }}
    }};
    let mut p = Parser {{
        sentence: lex(&src),
        pos: 0,
    }};
    match {start}(&mut p, true) {{
        Some(tree) if p.pos == p.sentence.len() => {{
            println!("Parsing successful");
            let mut out = String::new();
            tree.pp(0, &mut out);
            print!("{{}}", out);
        }}
        Some(_) => {{
            let tok = &p.sentence[p.pos];
            println!(
                "Parse error [ln {{}}, col {{}}]: parsing terminated before end of input",
                tok.line, tok.col
            );
            process::exit(1);
        }}
        // The start symbol is called with wanted=true, so any rejection prints a diagnostic
        // and exits before None can be returned.
        None => unreachable!(),
    }}
}}
"#,
            start = self.rule_fn(self.grm.start_rule_idx()),
        )
    }
}

/// The grammar-independent runtime of the emitted parser: token and tree types, the
/// whitespace-splitting greedy-longest-match lexer, and the lookahead/diagnostic helpers.
const GEN_RUNTIME: &str = r#"
#[derive(Debug)]
struct Tok {
    text: &'static str,
    line: usize,
    col: usize,
}

#[derive(Debug)]
enum Tree {
    Leaf(&'static str),
    /// An internal node holds one child list per positive conjunct of the production which
    /// matched: each is a different derivation of the same substring.
    Node {
        name: &'static str,
        versions: Vec<Vec<Tree>>,
    },
}

impl Tree {
    fn pp(&self, indent: usize, out: &mut String) {
        for _ in 0..indent {
            out.push_str("    ");
        }
        match self {
            Tree::Leaf(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Tree::Node { name, versions } => {
                out.push_str(name);
                out.push('\n');
                if versions.len() == 1 {
                    for t in &versions[0] {
                        t.pp(indent + 1, out);
                    }
                } else {
                    for (i, v) in versions.iter().enumerate() {
                        for _ in 0..indent + 1 {
                            out.push_str("    ");
                        }
                        out.push_str(&format!("<conjunct {}>\n", i + 1));
                        for t in v {
                            t.pp(indent + 2, out);
                        }
                    }
                }
            }
        }
    }
}

struct Parser {
    sentence: Vec<Tok>,
    pos: usize,
}

impl Parser {
    /// Does the upcoming input match `key`? A full-length key matches as a prefix; a key shorter
    /// than K only arises at the end of the language, so it must line up with the end of the
    /// input; the empty-string key matches only at end of input.
    fn lookahead_matches(&self, key: &[&str]) -> bool {
        if key.len() == 1 && key[0].is_empty() {
            return self.pos == self.sentence.len();
        }
        if self.pos + key.len() > self.sentence.len() {
            return false;
        }
        if key.len() < K && self.pos + key.len() != self.sentence.len() {
            return false;
        }
        key.iter()
            .zip(&self.sentence[self.pos..])
            .all(|(t, tok)| tok.text == *t)
    }

    fn parse_error(&self, expecting: &str) -> ! {
        match self.sentence.get(self.pos) {
            Some(tok) => {
                println!(
                    "Parse error [ln {}, col {}]: unexpected token '{}' (expecting {})",
                    tok.line, tok.col, tok.text, expecting
                );
            }
            None => {
                println!(
                    "Parse error: unexpected end of input (expecting {})",
                    expecting
                );
            }
        }
        process::exit(1);
    }
}

fn lex_error(line: usize, col: usize, unexpected: &str) -> ! {
    println!(
        "Lexer error [ln {}, col {}]: unexpected sequence '{}'",
        line, col, unexpected
    );
    process::exit(1);
}

/// Split the input on whitespace and greedily match the longest terminal at each position. A
/// position where no terminal matches is a lexing error.
fn lex(src: &str) -> Vec<Tok> {
    let mut toks = Vec::new();
    for (lidx, line) in src.lines().enumerate() {
        let mut col = 1;
        let mut i = 0;
        while i < line.len() {
            let c = line[i..].chars().next().unwrap();
            if c.is_whitespace() {
                i += c.len_utf8();
                col += 1;
                continue;
            }
            let chunk_end = line[i..]
                .find(char::is_whitespace)
                .map(|off| i + off)
                .unwrap_or(line.len());
            let chunk = &line[i..chunk_end];
            let best = TERMINALS
                .iter()
                .copied()
                .filter(|t| chunk.starts_with(*t))
                .max_by_key(|t| t.len());
            match best {
                Some(t) => {
                    toks.push(Tok {
                        text: t,
                        line: lidx + 1,
                        col,
                    });
                    col += t.chars().count();
                    i += t.len();
                }
                None => lex_error(lidx + 1, col, chunk),
            }
        }
    }
    toks
}
"#;

#[cfg(test)]
mod test {
    use super::RDParserBuilder;
    use bbnfgrammar::bbnf::BBNFGrammar;

    fn gen(src: &str, k: usize) -> String {
        let grm = BBNFGrammar::new(src).unwrap();
        let (_, _, table) = llktable::from_bbnf(&grm, k).unwrap();
        RDParserBuilder::new(&grm, &table).build()
    }

    #[test]
    fn test_terminals_numbered_in_declaration_order() {
        let s = gen(r#"S -> "(" S ")" S | epsilon;"#, 1);
        assert!(s.contains("const TERMINALS: [&str; 2] = [\"(\", \")\"];"));
        assert!(s.contains("fn terminal0(p: &mut Parser, wanted: bool) -> Option<Tree>"));
        assert!(s.contains("p.sentence[p.pos].text == \"(\""));
        assert!(s.contains("fn terminal1(p: &mut Parser, wanted: bool) -> Option<Tree>"));
    }

    #[test]
    fn test_start_symbol_is_last_function_and_main_calls_it() {
        let s = gen(r#"A -> B "a"; B -> "b";"#, 1);
        // B is a callee of A, so B is nonterminal0 and the start symbol A is nonterminal1.
        assert!(s.contains("fn nonterminal0"));
        assert!(s.contains("fn nonterminal1"));
        assert!(s.contains("match nonterminal1(&mut p, true)"));
    }

    #[test]
    fn test_k_constant_and_lookahead_keys() {
        let s = gen(r#"S -> "a" "b" | "a" "c";"#, 2);
        assert!(s.contains("const K: usize = 2;"));
        assert!(s.contains("p.lookahead_matches(&[\"a\", \"b\"])"));
        assert!(s.contains("p.lookahead_matches(&[\"a\", \"c\"])"));
    }

    #[test]
    fn test_epsilon_key_is_empty_string() {
        let s = gen(r#"S -> "(" S ")" S | epsilon;"#, 1);
        assert!(s.contains("p.lookahead_matches(&[\"\"])"));
    }

    #[test]
    fn test_substring_discipline_emitted_for_conjunction() {
        let s = gen(r#"A -> B & C; B -> "a" B | "a"; C -> "a" C | "a";"#, 1);
        assert!(s.contains("let start = p.pos;"));
        assert!(s.contains("end = p.pos;"));
        assert!(s.contains("if p.pos != end {"));
        assert!(s.contains("conjuncts of 'A' to cover the same substring"));
    }

    #[test]
    fn test_negation_flips_wanted() {
        let s = gen(
            r#"ID -> LETTERS & ~ "i" "f"; LETTERS -> "i" LETTERS | "f" LETTERS | "i" | "f";"#,
            1,
        );
        assert!(s.contains("(p, !wanted).is_none()"));
        assert!(s.contains("if matched && p.pos == end {"));
        assert!(s.contains("input not to match a negated conjunct of 'ID'"));
        // After the negative conjuncts the cursor is restored to the end of the substring.
        assert!(s.contains("p.pos = end;"));
    }

    #[test]
    fn test_single_conjunct_productions_skip_machinery() {
        let s = gen(r#"S -> "a";"#, 1);
        assert!(!s.contains("let start = p.pos;"));
        assert!(s.contains("versions: vec![children]"));
    }

    #[test]
    fn test_dispatch_failure_lists_alternatives() {
        let s = gen(r#"S -> "(" S ")" S | epsilon;"#, 1);
        // The alternatives list is embedded as a Rust string literal, so its quotes appear
        // escaped in the generated source.
        assert!(s.contains(r#"one of: epsilon, \"(\", \")\""#));
    }

    #[test]
    fn test_determinism() {
        let src = r#"S -> A B | "x"; A -> "a" | epsilon; B -> "b";"#;
        assert_eq!(gen(src, 2), gen(src, 2));
    }
}
