//! Namespace-agnostic path rewriting
//!
//! Rule authors write plain paths such as `/AUTOSAR/AR-PACKAGES/AR-PACKAGE`.
//! Documents may or may not declare a default namespace, and a plain name
//! test only matches elements in no namespace. Every element name test is
//! therefore rewritten to a `local-name()` test, including the ones inside
//! predicates and on either side of a union:
//!
//! ```text
//! /A/B            ->  /*[local-name()='A']/*[local-name()='B']
//! //A[2]          ->  //*[local-name()='A'][2]
//! /A/@id          ->  /*[local-name()='A']/@id
//! /A[B='x']       ->  /*[local-name()='A'][*[local-name()='B']='x']
//! /A | /B         ->  /*[local-name()='A'] | /*[local-name()='B']
//! ```
//!
//! Attributes, literals, function and node-type calls, variables, operator
//! keywords and steps with an explicit axis are left as written.

/// Marker that identifies an already namespace-agnostic expression.
pub const NAMESPACE_MARKER: &str = "local-name()";

/// Rewrite a simplified path into a namespace-agnostic XPath.
///
/// Expressions that already contain [`NAMESPACE_MARKER`] are returned as-is,
/// as are the empty string and the bare root `/`. Malformed input is passed
/// through; the query engine reports it.
pub fn normalize(expr: &str) -> String {
    let trimmed = expr.trim();
    if expr.contains(NAMESPACE_MARKER) || trimmed.is_empty() || trimmed == "/" {
        return expr.to_string();
    }

    let lexemes = lex(expr);
    let mut out = String::with_capacity(expr.len() * 2);
    // Whether the previous significant lexeme ended an operand; decides
    // between `*`/`and`/`or` as operators and as name tests.
    let mut after_operand = false;

    for (i, lexeme) in lexemes.iter().enumerate() {
        match *lexeme {
            Lexeme::Space(s) => {
                out.push_str(s);
                continue;
            }
            Lexeme::Literal(s) | Lexeme::Number(s) => {
                out.push_str(s);
                after_operand = true;
            }
            Lexeme::Name(name) => {
                let next = significant(lexemes[i + 1..].iter());
                let prev = significant(lexemes[..i].iter().rev());
                if matches!(next, Some(Lexeme::Punct("(" | "::"))) {
                    // function, node type or axis name
                    out.push_str(name);
                    after_operand = false;
                } else if matches!(prev, Some(Lexeme::Punct("@" | "::" | "$"))) {
                    out.push_str(name);
                    after_operand = true;
                } else if after_operand && matches!(name, "and" | "or" | "div" | "mod") {
                    out.push_str(name);
                    after_operand = false;
                } else {
                    out.push_str(&local_name_test(name));
                    after_operand = true;
                }
            }
            Lexeme::Punct(p) => {
                out.push_str(p);
                after_operand = match p {
                    ")" | "]" | "." | ".." => true,
                    // wildcard name test unless it follows an operand
                    "*" => !after_operand,
                    _ => false,
                };
            }
        }
    }
    out
}

/// Check whether an expression is already namespace-agnostic.
pub fn is_normalized(expr: &str) -> bool {
    expr.contains(NAMESPACE_MARKER)
}

fn local_name_test(name: &str) -> String {
    let local = name.rsplit(':').next().unwrap_or(name);
    if local == "*" {
        "*".to_string()
    } else {
        format!("*[local-name()='{}']", local)
    }
}

fn significant<'l, 'a: 'l>(
    mut lexemes: impl Iterator<Item = &'l Lexeme<'a>>,
) -> Option<&'l Lexeme<'a>> {
    lexemes.find(|l| !matches!(l, Lexeme::Space(_)))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lexeme<'a> {
    Space(&'a str),
    Literal(&'a str),
    Number(&'a str),
    /// NCName, QName or `prefix:*`
    Name(&'a str),
    Punct(&'a str),
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Split an expression into lexemes whose concatenation is the input.
fn lex(expr: &str) -> Vec<Lexeme<'_>> {
    let mut lexemes = Vec::new();
    let mut rest = expr;

    while let Some(c) = rest.chars().next() {
        let len = if c.is_whitespace() {
            let len = span(rest, |c| c.is_whitespace());
            lexemes.push(Lexeme::Space(&rest[..len]));
            len
        } else if c == '\'' || c == '"' {
            // an unterminated literal runs to the end
            let len = rest[1..].find(c).map_or(rest.len(), |close| close + 2);
            lexemes.push(Lexeme::Literal(&rest[..len]));
            len
        } else if c.is_ascii_digit() || (c == '.' && next_is_digit(&rest[1..])) {
            let len = span(rest, |c| c.is_ascii_digit() || c == '.');
            lexemes.push(Lexeme::Number(&rest[..len]));
            len
        } else if is_name_start(c) {
            let len = name_len(rest);
            lexemes.push(Lexeme::Name(&rest[..len]));
            len
        } else {
            let len = ["//", "::", "..", "!=", "<=", ">="]
                .iter()
                .find(|p| rest.starts_with(*p))
                .map_or(c.len_utf8(), |p| p.len());
            lexemes.push(Lexeme::Punct(&rest[..len]));
            len
        };
        rest = &rest[len..];
    }
    lexemes
}

fn span(s: &str, keep: impl Fn(char) -> bool) -> usize {
    s.find(|c: char| !keep(c)).unwrap_or(s.len())
}

fn next_is_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Length of a name at the start of `s`, including a `prefix:` part and a
/// `prefix:*` wildcard, but not an axis separator `::`.
fn name_len(s: &str) -> usize {
    let first = span(s, is_name_char);
    let after = &s[first..];
    if after.starts_with(':') && !after.starts_with("::") {
        let local = &after[1..];
        if local.starts_with('*') {
            return first + 2;
        }
        if local.chars().next().is_some_and(is_name_start) {
            return first + 1 + span(local, is_name_char);
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        assert_eq!(
            normalize("/Root/Child/Leaf"),
            "/*[local-name()='Root']/*[local-name()='Child']/*[local-name()='Leaf']"
        );
    }

    #[test]
    fn test_descendant_path() {
        assert_eq!(
            normalize("//SHORT-NAME"),
            "//*[local-name()='SHORT-NAME']"
        );
        assert_eq!(
            normalize("/A//B"),
            "/*[local-name()='A']//*[local-name()='B']"
        );
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(normalize("A/B"), "*[local-name()='A']/*[local-name()='B']");
    }

    #[test]
    fn test_prefix_is_dropped() {
        assert_eq!(normalize("/ar:AUTOSAR"), "/*[local-name()='AUTOSAR']");
        assert_eq!(normalize("/ar:AUTOSAR/ar:*"), "/*[local-name()='AUTOSAR']/*");
    }

    #[test]
    fn test_predicates_are_kept() {
        assert_eq!(
            normalize("/A/B[@DEST='X']/C[2]"),
            "/*[local-name()='A']/*[local-name()='B'][@DEST='X']/*[local-name()='C'][2]"
        );
        // Slashes inside literals are not separators
        assert_eq!(
            normalize("/A[@path='a/b']"),
            "/*[local-name()='A'][@path='a/b']"
        );
    }

    #[test]
    fn test_names_inside_predicates() {
        assert_eq!(
            normalize("/AUTOSAR/AR-PACKAGES/AR-PACKAGE[SHORT-NAME='P1']/CATEGORY"),
            "/*[local-name()='AUTOSAR']/*[local-name()='AR-PACKAGES']\
             /*[local-name()='AR-PACKAGE'][*[local-name()='SHORT-NAME']='P1']\
             /*[local-name()='CATEGORY']"
        );
        assert_eq!(
            normalize("//A[B/C = 'x']"),
            "//*[local-name()='A'][*[local-name()='B']/*[local-name()='C'] = 'x']"
        );
        assert_eq!(
            normalize("//A[B[C]]"),
            "//*[local-name()='A'][*[local-name()='B'][*[local-name()='C']]]"
        );
    }

    #[test]
    fn test_functions_and_operators_in_predicates() {
        assert_eq!(
            normalize("//A[B and C or not(D)]"),
            "//*[local-name()='A'][*[local-name()='B'] and *[local-name()='C'] \
             or not(*[local-name()='D'])]"
        );
        assert_eq!(
            normalize("//A[count(B) > 1]"),
            "//*[local-name()='A'][count(*[local-name()='B']) > 1]"
        );
        assert_eq!(
            normalize("//A[contains(@name, 'and')]"),
            "//*[local-name()='A'][contains(@name, 'and')]"
        );
        assert_eq!(
            normalize("//A[@xsi:type='t']"),
            "//*[local-name()='A'][@xsi:type='t']"
        );
    }

    #[test]
    fn test_keywords_as_element_names() {
        assert_eq!(
            normalize("/and/or"),
            "/*[local-name()='and']/*[local-name()='or']"
        );
    }

    #[test]
    fn test_union_branches() {
        assert_eq!(
            normalize("/AUTOSAR/A | /AUTOSAR/B"),
            "/*[local-name()='AUTOSAR']/*[local-name()='A'] | \
             /*[local-name()='AUTOSAR']/*[local-name()='B']"
        );
        assert_eq!(
            normalize("//A|//B"),
            "//*[local-name()='A']|//*[local-name()='B']"
        );
    }

    #[test]
    fn test_special_steps_untouched() {
        assert_eq!(
            normalize("/A/@UUID"),
            "/*[local-name()='A']/@UUID"
        );
        assert_eq!(normalize("/A/text()"), "/*[local-name()='A']/text()");
        assert_eq!(normalize("/A/*"), "/*[local-name()='A']/*");
        assert_eq!(normalize("/A/.."), "/*[local-name()='A']/..");
        assert_eq!(normalize("/A/child::B"), "/*[local-name()='A']/child::B");
        assert_eq!(normalize("/A/@*"), "/*[local-name()='A']/@*");
    }

    #[test]
    fn test_root_only_is_unchanged() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  "), "  ");
    }

    #[test]
    fn test_already_normalized_is_unchanged() {
        let expr = "//*[local-name()='A']";
        assert_eq!(normalize(expr), expr);
        assert!(is_normalized(expr));
    }

    #[test]
    fn test_empty_segments_pass_through() {
        // Trailing separator is left for the query engine to reject
        assert_eq!(normalize("/A/"), "/*[local-name()='A']/");
        assert_eq!(normalize("/A///B"), "/*[local-name()='A']///*[local-name()='B']");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "/Root/Child",
            "//A",
            "A/B[1]",
            "/A/@x",
            "/A/",
            "//*",
            "/",
            "/ns:A/ns:B",
            "/A[@k='v']//B/text()",
            "/A[B='x'] | /C",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_lex_round_trips_input() {
        let expr = "/ns:A[@k != 'a b']//p:*[1.5]|child::B";
        let lexemes = lex(expr);
        let joined: String = lexemes
            .iter()
            .map(|l| match *l {
                Lexeme::Space(s)
                | Lexeme::Literal(s)
                | Lexeme::Number(s)
                | Lexeme::Name(s)
                | Lexeme::Punct(s) => s,
            })
            .collect();
        assert_eq!(joined, expr);
        assert!(lexemes.contains(&Lexeme::Name("ns:A")));
        assert!(lexemes.contains(&Lexeme::Name("p:*")));
        assert!(lexemes.contains(&Lexeme::Literal("'a b'")));
        assert!(lexemes.contains(&Lexeme::Punct("!=")));
        assert!(lexemes.contains(&Lexeme::Number("1.5")));
    }
}
