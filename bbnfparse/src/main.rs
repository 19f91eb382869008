mod diagnostics;

use std::{env, fs::File, io::Read, path::Path, process};

use getopts::Options;

use crate::diagnostics::SpannedDiagnosticFormatter;
use bbnfgrammar::{bbnf::BBNFGrammar, RIdx};
use llktable::from_bbnf;
use rdgen::RDParserBuilder;

const WARNING: &str = "[Warning]";
const ERROR: &str = "[Error]";
const DEFAULT_OUT: &str = "rd_parser.rs";

fn usage(prog: &str, msg: &str) -> ! {
    let path = Path::new(prog);
    let leaf = match path.file_name() {
        Some(m) => m.to_str().unwrap(),
        None => "bbnfparse",
    };
    if !msg.is_empty() {
        eprintln!("{}", msg);
    }
    eprintln!("Usage: {} [-q] [-o <parser.rs>] <grammar.bbnf> <k>", leaf);
    process::exit(1);
}

fn indent(s: &str, indent: &str) -> String {
    format!("{indent}{}\n", s.trim_end_matches('\n')).replace('\n', &format!("\n{}", indent))
}

fn read_file<P: AsRef<Path>>(path: P) -> String {
    let mut f = match File::open(&path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Can't open file {}: {}", path.as_ref().display(), e);
            process::exit(1);
        }
    };
    let mut s = String::new();
    if let Err(e) = f.read_to_string(&mut s) {
        eprintln!("Can't read file {}: {}", path.as_ref().display(), e);
        process::exit(1);
    }
    s
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = &args[0];
    let matches = match Options::new()
        .optflag("h", "help", "")
        .optflag("q", "quiet", "Don't print the grammar analysis")
        .optopt(
            "o",
            "output",
            "Path for the generated parser (default: rd_parser.rs)",
            "FILE",
        )
        .parse(&args[1..])
    {
        Ok(m) => m,
        Err(f) => usage(prog, f.to_string().as_str()),
    };

    if matches.opt_present("h") {
        usage(prog, "");
    }
    let quiet = matches.opt_present("q");
    let out_path = matches
        .opt_str("o")
        .unwrap_or_else(|| DEFAULT_OUT.to_string());

    if matches.free.len() != 2 {
        usage(prog, "Too few arguments given.");
    }
    let grm_path = &matches.free[0];
    let k = match matches.free[1].parse::<usize>() {
        Ok(k) if k >= 1 => k,
        _ => usage(prog, "<k> must be an integer >= 1."),
    };

    let grm_src = read_file(grm_path);
    let formatter = SpannedDiagnosticFormatter::new(&grm_src, Path::new(grm_path));
    let grm = match BBNFGrammar::new(&grm_src) {
        Ok(g) => g,
        Err(e) => {
            eprintln!(
                "{ERROR}{}",
                formatter.file_location_msg("", e.spans().next())
            );
            eprintln!("{}", indent(&formatter.format_error(&e), "    "));
            process::exit(1);
        }
    };

    if !quiet {
        print!("Alphabet:");
        for tidx in grm.iter_tidxs() {
            let n = grm.token_name(tidx);
            if n.is_empty() {
                print!(" epsilon");
            } else {
                print!(" {}", n);
            }
        }
        println!();

        println!("\nGrammar AST");
        print!("{}", grm.pp());

        println!("\nReferenced Non-Terminals");
        for ridx in grm.iter_rules() {
            print!("{}:", grm.rule_name(ridx));
            for r in grm.references(ridx).iter_set_bits(..) {
                print!(" {}", grm.rule_name(RIdx(r as u32)));
            }
            println!();
        }

        print!("\nOrder of Computing PFIRST Sets:");
        for &ridx in grm.nt_order() {
            print!(" {}", grm.rule_name(ridx));
        }
        println!();
    }

    let (firsts, follows, table) = match from_bbnf(&grm, k) {
        Ok(x) => x,
        Err(e) => {
            let span = grm.rule_name_span(e.ridx);
            eprintln!("{ERROR}{}", formatter.file_location_msg("", Some(span)));
            eprintln!(
                "{}",
                indent(
                    &formatter.underline_span_with_text(span, &e.to_string(), '^'),
                    "    "
                )
            );
            process::exit(1);
        }
    };

    if !quiet {
        println!("\nPFIRST Sets");
        print!("{}", firsts.pp(&grm));
        println!("\nPFOLLOW Sets");
        print!("{}", follows.pp(&grm));
        println!("\nParsing Table");
        print!("{}", table.pp(&grm));
        if let Some(c) = table.conflicts() {
            eprintln!("{WARNING} LL({}) choice conflicts (the later production wins):", k);
            eprint!("{}", c.pp(&grm));
        }
    }

    if let Err(e) = RDParserBuilder::new(&grm, &table).write_to_path(&out_path) {
        eprintln!("{ERROR} Can't write parser to {}: {}", out_path, e);
        process::exit(1);
    }
}
