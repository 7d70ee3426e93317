//! Generation request sent to the text-completion oracle.
//!
//! The request is plain text: instructions, the rendered vocabulary, worked
//! examples and finally the user's question followed by a `SPARQL:` cue.

use std::fmt::Write as _;

use crate::vocab::{PropertyCategory, Vocabulary};

/// JSON field the oracle is asked to put the query body in.
pub const QUERY_FIELD: &str = "sparql";

/// A question paired with the SPARQL body we expect for it.
#[derive(Debug, Clone, Copy)]
pub struct WorkedExample {
    pub question: &'static str,
    pub sparql: &'static str,
}

impl WorkedExample {
    /// The example's query in the output shape the oracle must use.
    pub fn answer(&self) -> String {
        let mut obj = serde_json::Map::new();
        obj.insert(QUERY_FIELD.to_string(), self.sparql.into());
        serde_json::Value::Object(obj).to_string()
    }
}

pub const WORKED_EXAMPLES: &[WorkedExample] = &[
    WorkedExample {
        question: "전북에서 취약성 등급이 '심각(IV)'인 곳은?",
        sparql: r#"SELECT ?name ?code ?val
WHERE {
  ?s a ?type . VALUES ?type { koad:Dong koad:Eup koad:Myeon }
  ?s rdfs:label ?name ; koad:divisionCode ?code .

  # Use URI for specific grade filtering
  ?s kodv:vulnerabilityRating kodvid:Rating_IV .
  BIND("IV" AS ?val)

  ?s (koad:isNeighborhoodOf|koad:isTownOf|koad:isTownshipOf|koad:isDistrictOf|koad:isCityOf|koad:isCountyOf)+ ?ancestor .
  ?ancestor rdfs:label ?aname .
  FILTER(CONTAINS(?aname, "전북특별자치도"))
}"#,
    },
    WorkedExample {
        question: "경남 시군구별 평균 취약성 등급은?",
        sparql: r#"SELECT ?name ?code (ROUND(AVG(?grade)) AS ?val)
WHERE {
  ?d a ?dtype . VALUES ?dtype { koad:City koad:County koad:District }
  ?d rdfs:label ?name ; koad:divisionCode ?code .
  ?d (koad:isCityOf|koad:isCountyOf|koad:isDistrictOf)+ ?province .
  ?province rdfs:label ?pname .
  FILTER(CONTAINS(?pname, "경상남도"))

  ?s (koad:isNeighborhoodOf|koad:isTownOf|koad:isTownshipOf)+ ?d .
  ?s kodv:vulnerabilityRatingNumeric ?grade .
}
GROUP BY ?name ?code
ORDER BY DESC(?val)"#,
    },
    WorkedExample {
        question: "제주에서 가뭄 빈도가 가장 높은 곳 5개",
        sparql: r#"SELECT ?name ?code ?val
WHERE {
  ?s rdfs:label ?name ; koad:divisionCode ?code ; kodv:droughtFrequency ?val .
  ?s (koad:isNeighborhoodOf|koad:isTownOf|koad:isTownshipOf|koad:isDistrictOf|koad:isCityOf|koad:isCountyOf)+ ?ancestor .
  ?ancestor rdfs:label ?aname .
  FILTER(CONTAINS(?aname, "제주특별자치도"))
}
ORDER BY DESC(?val)
LIMIT 5"#,
    },
];

/// Renders the static part of the request: instructions, schema, rules and
/// worked examples. Independent of the question.
pub fn system_prompt(vocab: &Vocabulary) -> String {
    let mut out = String::new();

    out.push_str(
        "You are an expert SPARQL query generator for the 'KODV (Korea Drought Vulnerability)' Knowledge Graph.\n\
         Convert natural language questions into valid SPARQL 1.1 queries.\n\n",
    );

    out.push_str("### 1. Schema Information\n");
    let prefixes: Vec<&str> = crate::namespaces::NAMESPACES.iter().map(|(p, _)| *p).collect();
    let _ = writeln!(out, "- **Namespaces (Available):** {}", prefixes.join(", "));
    let levels: Vec<String> = vocab
        .levels
        .iter()
        .map(|(level, classes)| format!("{}(L{level})", classes.join("/")))
        .collect();
    let _ = writeln!(out, "- **Classes:** {}", levels.join(", "));
    let _ = writeln!(
        out,
        "- **Identity:** every division has `rdfs:label` (Korean name) and `koad:divisionCode` (code string).\n"
    );

    out.push_str("### 2. Property Dictionary (Korean -> URI) [CRITICAL]\n");
    out.push_str("You MUST use the correct property URI based on the user's keyword.\n");
    for category in PropertyCategory::ALL {
        let _ = writeln!(out, "\n**[{}]**", category.title());
        for p in vocab.properties.iter().filter(|p| p.category == category) {
            let _ = writeln!(out, "- **{} ({}):** `{}`", p.keyword, p.label, p.property);
        }
    }
    let grades: Vec<String> = vocab
        .ratings
        .iter()
        .map(|r| format!("Grade {} ({}): `{}`", r.grade, r.roman, r.concept))
        .collect();
    let _ = writeln!(out, "  * {}\n", grades.join(", "));

    out.push_str("### 3. Korean Administrative Name Mapping (CRITICAL)\n");
    out.push_str("Users often use abbreviations. You MUST expand them in your `FILTER` conditions.\n");
    for a in &vocab.region_aliases {
        let _ = writeln!(
            out,
            "- **\"{}\" ({})** -> Search for \"{}\"",
            a.short, a.romanized, a.canonical
        );
    }
    out.push('\n');

    out.push_str("### 4. Logic & Rules\n");
    let _ = writeln!(out, "1. **DO NOT include PREFIX definitions.** Start with `SELECT` immediately.");
    let _ = writeln!(out, "2. **Recursive Parent Search:** Use Property Paths `+` to find ancestors.");
    let _ = writeln!(out, "   - Pattern: `?s {} ?ancestor .`", vocab.ancestor_path());
    let _ = writeln!(out, "3. **Target Variables:** Always select `?name`, `?code`, and `?val` (the value being filtered/queried).");
    let _ = writeln!(out, "4. **Grade Calculation:** When asking for \"Average Grade\", ALWAYS use `ROUND(AVG(?val))` on `kodv:vulnerabilityRatingNumeric` to return an integer.");
    let _ = writeln!(out, "5. **Grade Comparison:** When filtering grades (e.g., \"Grade 3 or higher\"), use `FILTER(?val >= 3)` on `kodv:vulnerabilityRatingNumeric`.");
    let _ = writeln!(out, "6. **Ranking:** \"하위 N곳\" means `ORDER BY ASC(?val) LIMIT N`; \"상위 N곳\" means `ORDER BY DESC(?val) LIMIT N`.");
    let _ = writeln!(
        out,
        "7. **Output:** Return ONLY a JSON object of the form {{\"{QUERY_FIELD}\": \"<query>\"}}. No markdown, no commentary.\n"
    );

    out.push_str("### 5. Examples\n");
    for ex in WORKED_EXAMPLES {
        let _ = writeln!(out, "**User:** \"{}\"\n**Answer:**\n{}\n", ex.question, ex.answer());
    }

    out
}

/// The full text sent to the oracle for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(system_prompt: &str, question: &str) -> Self {
        Self {
            prompt: format!("{system_prompt}\n\nUser: {}\nSPARQL:", question.trim()),
        }
    }
}
