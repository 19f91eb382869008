use std::path::Path;

use unicode_width::UnicodeWidthStr;

use bbnfgrammar::{bbnf::BBNFGrammarError, NewlineCache, Span};

/// Formats spanned grammar errors against their source text: the offending line is printed with
/// its line number and the spanned portion underlined, rustc-style.
pub struct SpannedDiagnosticFormatter<'a> {
    src: &'a str,
    path: &'a Path,
    nlc: NewlineCache,
}

impl<'a> SpannedDiagnosticFormatter<'a> {
    pub fn new(src: &'a str, path: &'a Path) -> Self {
        Self {
            src,
            path,
            nlc: NewlineCache::new(src),
        }
    }

    pub fn ordinal(v: usize) -> String {
        let suffix = match ((11..=13).contains(&(v % 100)), v % 10) {
            (false, 1) => "st",
            (false, 2) => "nd",
            (false, 3) => "rd",
            _ => "th",
        };
        format!("{v}{suffix}")
    }

    /// If a span is given returns "msg at path/file.bbnf:5:6", otherwise "msg in path/file.bbnf".
    pub fn file_location_msg(&self, msg: &str, span: Option<Span>) -> String {
        if let Some(span) = span {
            let (line, col) = self
                .nlc
                .byte_to_line_and_col(self.src, span.start())
                .unwrap_or((0, 0));
            format!("{} at {}:{line}:{col}", msg, self.path.display())
        } else {
            format!("{} in {}", msg, self.path.display())
        }
    }

    /// Print the line number and source text of the line holding `span`'s start, underline the
    /// spanned portion of it with the `underline_c` character, and append `msg`.
    pub fn underline_span_with_text(&self, span: Span, msg: &str, underline_c: char) -> String {
        let (line_start, line_end) = self.nlc.line_bounds(self.src, span.start());
        let (line_num, _) = self
            .nlc
            .byte_to_line_and_col(self.src, span.start())
            .unwrap_or((0, 0));
        let source_line = self.src[line_start..line_end].trim_end_matches('\r');
        let ul_start = span.start().min(line_end);
        let ul_end = span.end().min(line_end);
        let prefix = format!("{}| ", line_num);
        let indent = UnicodeWidthStr::width(&self.src[line_start..ul_start]);
        // Zero-width spans (e.g. "something missing here") still get one marker.
        let width = UnicodeWidthStr::width(&self.src[ul_start..ul_end]).max(1);
        format!(
            "{}{}\n{}{} {}",
            prefix,
            source_line,
            " ".repeat(prefix.len() + indent),
            underline_c.to_string().repeat(width),
            msg
        )
    }

    /// Format a grammar error: its first span is underlined with the error message, any further
    /// spans (duplicate definitions) with their occurrence number.
    pub fn format_error(&self, e: &BBNFGrammarError) -> String {
        let mut out = String::new();
        for (span_num, span) in e.spans().enumerate() {
            if span_num == 0 {
                out.push_str(&self.underline_span_with_text(span, &e.to_string(), '^'));
            } else {
                out.push('\n');
                out.push_str(&self.underline_span_with_text(
                    span,
                    &format!("{} occurrence", Self::ordinal(span_num + 1)),
                    '-',
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::SpannedDiagnosticFormatter;
    use bbnfgrammar::Span;
    use std::path::PathBuf;

    #[test]
    fn underline_single_line_span() {
        let s = "\naaaaaabbb bbb bbbb\n";
        let path = PathBuf::from("test");
        let formatter = SpannedDiagnosticFormatter::new(s, &path);
        let out = format!(
            "\n{}",
            formatter.underline_span_with_text(Span::new(7, 7 + 12), "Test message", '^')
        );
        assert_eq!(
            out,
            r"
2| aaaaaabbb bbb bbbb
         ^^^^^^^^^^^^ Test message"
        );
    }

    #[test]
    fn underline_zero_width_span() {
        let s = "ab cd";
        let path = PathBuf::from("test");
        let formatter = SpannedDiagnosticFormatter::new(s, &path);
        let out = formatter.underline_span_with_text(Span::new(3, 3), "missing", '^');
        assert_eq!(out, "1| ab cd\n      ^ missing");
    }

    #[test]
    fn file_location() {
        let s = "A -> \"a\";\nB -> \"b\";";
        let path = PathBuf::from("g.bbnf");
        let formatter = SpannedDiagnosticFormatter::new(s, &path);
        assert_eq!(
            formatter.file_location_msg("Parse error", Some(Span::new(10, 11))),
            "Parse error at g.bbnf:2:1"
        );
        assert_eq!(
            formatter.file_location_msg("Problems", None),
            "Problems in g.bbnf"
        );
    }

    #[test]
    fn duplicate_rule_error_shows_both_sites() {
        let s = "A -> \"a\";\nA -> \"b\";";
        let path = PathBuf::from("g.bbnf");
        let formatter = SpannedDiagnosticFormatter::new(s, &path);
        let e = s.parse::<bbnfgrammar::bbnf::ast::GrammarAST>().unwrap_err();
        let out = formatter.format_error(&e);
        assert!(out.contains("1| A -> \"a\";"));
        assert!(out.contains("^ Rule defined multiple times"));
        assert!(out.contains("2| A -> \"b\";"));
        assert!(out.contains("- 2nd occurrence"));
    }

    #[test]
    fn ordinals() {
        assert_eq!(SpannedDiagnosticFormatter::ordinal(1), "1st");
        assert_eq!(SpannedDiagnosticFormatter::ordinal(2), "2nd");
        assert_eq!(SpannedDiagnosticFormatter::ordinal(3), "3rd");
        assert_eq!(SpannedDiagnosticFormatter::ordinal(11), "11th");
        assert_eq!(SpannedDiagnosticFormatter::ordinal(12), "12th");
        assert_eq!(SpannedDiagnosticFormatter::ordinal(22), "22nd");
    }
}
