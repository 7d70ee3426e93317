//! Namespace declarations and query assembly.
//!
//! Generated and console bodies never carry `PREFIX` clauses; `assemble`
//! prepends the complete fixed block so every prefixed name the generator is
//! allowed to emit resolves. The block is a superset of the prefixes used by
//! the vocabulary, the worked examples and the fixed lookups.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

/// `(prefix, namespace IRI)` in declaration order.
pub const NAMESPACES: &[(&str, &str)] = &[
    ("kodv", "https://knowledgemap.kr/kodv/def/"),
    ("kodvid", "https://knowledgemap.kr/kodv/id/"),
    ("koad", "http://vocab.datahub.kr/def/administrative-division/"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("schema", "http://schema.org/"),
    ("qudt", "http://qudt.org/schema/qudt/"),
    ("unit", "http://qudt.org/vocab/unit/"),
    ("qk", "http://qudt.org/vocab/quantitykind/"),
    ("wdt", "http://www.wikidata.org/prop/direct/"),
];

/// Renders the declaration block, one `PREFIX` per line, terminated by a
/// blank line.
pub fn prefix_block() -> String {
    let width = NAMESPACES.iter().map(|(p, _)| p.len()).max().unwrap_or(0) + 1;
    let mut out = String::new();
    for (prefix, iri) in NAMESPACES {
        let label = format!("{prefix}:");
        let _ = writeln!(out, "PREFIX {label:<width$} <{iri}>");
    }
    out.push('\n');
    out
}

/// A query body with the namespace block in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledQuery {
    text: String,
    body_offset: usize,
}

impl AssembledQuery {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The body exactly as it was passed to [`assemble`].
    pub fn body(&self) -> &str {
        &self.text[self.body_offset..]
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl std::fmt::Display for AssembledQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Prepends the fixed namespace block. No validation of `body` happens here;
/// a body that declares its own prefixes ends up with duplicates.
pub fn assemble(body: &str) -> AssembledQuery {
    let mut text = prefix_block();
    let body_offset = text.len();
    text.push_str(body);
    AssembledQuery { text, body_offset }
}

pub fn is_declared(prefix: &str) -> bool {
    NAMESPACES.iter().any(|(p, _)| *p == prefix)
}

fn noise_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `<...>` IRIs, "..." literals and `# ...` comments.
    RE.get_or_init(|| {
        Regex::new(r#"<[^<>\s]*>|"(?:[^"\\]|\\.)*"|#[^\n]*"#).expect("static regex is valid")
    })
}

fn pname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^A-Za-z0-9_?$:])([A-Za-z][A-Za-z0-9_\-]*):[A-Za-z0-9_]")
            .expect("static regex is valid")
    })
}

/// Prefixes used in prefixed names (`kodv:population`, `koad:Dong`) inside
/// `text`. IRIs in angle brackets, string literals and comments are skipped.
pub fn referenced_prefixes(text: &str) -> BTreeSet<String> {
    let cleaned = noise_regex().replace_all(text, " ");
    pname_regex()
        .captures_iter(&cleaned)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Prefixes referenced in `text` that the fixed block does not declare.
pub fn undeclared_prefixes(text: &str) -> BTreeSet<String> {
    referenced_prefixes(text)
        .into_iter()
        .filter(|p| !is_declared(p))
        .collect()
}
