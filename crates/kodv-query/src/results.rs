//! SPARQL 1.1 Query Results JSON (`application/sparql-results+json`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TermType {
    Uri,
    Literal,
    /// Emitted by some stores (Blazegraph, Virtuoso) for literals with a
    /// datatype; SPARQL 1.1 folds it into `literal`.
    TypedLiteral,
    Bnode,
}

/// One RDF term bound to a result variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdfTerm {
    #[serde(rename = "type")]
    pub kind: TermType,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl RdfTerm {
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: TermType::Uri,
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: TermType::Literal,
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            lang: Some(lang.into()),
            ..Self::literal(value)
        }
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            datatype: Some(datatype.into()),
            ..Self::literal(value)
        }
    }

    pub fn is_uri(&self) -> bool {
        self.kind == TermType::Uri
    }
}

/// A result row: variable name (without `?`) to term. Unbound variables are
/// absent.
pub type Binding = BTreeMap<String, RdfTerm>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRows {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// A decoded SELECT response. Row order is whatever the store returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectResults {
    #[serde(default)]
    pub head: ResultHead,
    #[serde(default)]
    pub results: ResultRows,
}

impl SelectResults {
    pub fn new(vars: Vec<String>, bindings: Vec<Binding>) -> Self {
        Self {
            head: ResultHead { vars },
            results: ResultRows { bindings },
        }
    }

    pub fn vars(&self) -> &[String] {
        &self.head.vars
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.results.bindings
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Binding>) {
        (self.head.vars, self.results.bindings)
    }

    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }

    /// Values of `var` across rows, skipping rows where it is unbound.
    pub fn column<'a>(&'a self, var: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.results
            .bindings
            .iter()
            .filter_map(move |b| b.get(var).map(|t| t.value.as_str()))
    }
}
