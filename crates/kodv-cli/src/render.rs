//! Plain-text rendering of result envelopes for the terminal.

use std::fmt::Write as _;

use colored::Colorize;
use kodv_query::ResultEnvelope;

pub fn render_envelope(envelope: &ResultEnvelope) -> String {
    let mut out = String::new();
    match envelope {
        ResultEnvelope::Success { sparql, vars, data } => {
            if let Some(sparql) = sparql {
                let _ = writeln!(out, "{}", "SPARQL:".bold());
                let _ = writeln!(out, "{}\n", sparql.dimmed());
            }

            // Declared variables first, then anything merged in afterwards
            // (enrichment fields).
            let mut columns: Vec<&str> = vars.iter().map(String::as_str).collect();
            for row in data {
                for key in row.keys() {
                    if !columns.contains(&key.as_str()) {
                        columns.push(key);
                    }
                }
            }

            let cells: Vec<Vec<&str>> = data
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| row.get(*c).map(|t| t.value.as_str()).unwrap_or(""))
                        .collect()
                })
                .collect();
            let widths: Vec<usize> = columns
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    cells
                        .iter()
                        .map(|r| r[i].chars().count())
                        .chain(std::iter::once(c.chars().count()))
                        .max()
                        .unwrap_or(0)
                })
                .collect();

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| pad(c, *w))
                .collect();
            let _ = writeln!(out, "{}", header.join(" | ").bold());
            for row in &cells {
                let line: Vec<String> = row.iter().zip(&widths).map(|(v, w)| pad(v, *w)).collect();
                let _ = writeln!(out, "{}", line.join(" | "));
            }
            let _ = writeln!(out, "{}", format!("({} rows)", data.len()).dimmed());
        }
        ResultEnvelope::Empty { message } => {
            let _ = writeln!(out, "{}", message.yellow());
        }
        ResultEnvelope::Error { kind, message } => {
            let _ = writeln!(out, "{} {message}", format!("error[{kind:?}]:").red().bold());
        }
    }
    out
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    let mut out = s.to_string();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    out
}
