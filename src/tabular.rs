//! Tabular input/output: a minimal quote-aware CSV layer for the organization
//! list and the expanded output rows, plus the JSON run checkpoint.

use std::fs;
use std::io::{self, Write};
use std::mem::take;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::types::{Checkpoint, MergedRecord, OrganizationRow};

/// Minimal CSV parser (quotes + CRLF tolerant).
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // double-quote escape
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == sep && !in_quotes => {
                row.push(take(&mut field));
            }
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !row.is_empty() && !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // Flush any trailing field/row even if quotes were unterminated.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", sep)?;
        } else {
            first = false;
        }
        if needs_quotes(cell, sep) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Read the organization list. The header must carry `University` and
/// `Abbreviation` columns; `start_row` rows after the header are skipped
/// (resume support).
pub fn read_organizations(path: &Path, start_row: usize) -> Result<Vec<OrganizationRow>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("could not read input file {}", path.display()))?;
    organizations_from_text(&text, start_row)
}

pub fn organizations_from_text(text: &str, start_row: usize) -> Result<Vec<OrganizationRow>> {
    let mut rows = parse_rows(text, ',');
    if rows.is_empty() {
        bail!("input file is empty");
    }

    let header = rows.remove(0);
    let find = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let (Some(univ_idx), Some(abbr_idx)) = (find("University"), find("Abbreviation")) else {
        bail!("input must contain columns: University, Abbreviation");
    };

    Ok(rows
        .into_iter()
        .skip(start_row)
        .filter_map(|row| {
            let university = row.get(univ_idx)?.trim().to_string();
            let abbreviation = row.get(abbr_idx)?.trim().to_string();
            if university.is_empty() || abbreviation.is_empty() {
                None
            } else {
                Some(OrganizationRow {
                    university,
                    abbreviation,
                })
            }
        })
        .collect())
}

/// Write the final output: merged records expanded to one row per email,
/// sharing the organization/club/url fields.
pub fn write_output(path: &Path, records: &[MergedRecord]) -> Result<()> {
    let mut out: Vec<u8> = Vec::new();
    write_row(
        &mut out,
        &[
            "University".to_string(),
            "Club Name".to_string(),
            "Website URL".to_string(),
            "Email".to_string(),
        ],
        ',',
    )?;

    for rec in records {
        for email in &rec.emails {
            write_row(
                &mut out,
                &[
                    rec.organization.clone(),
                    rec.display_name(),
                    rec.primary_url.clone(),
                    email.clone(),
                ],
                ',',
            )?;
        }
    }

    fs::write(path, out)
        .with_context(|| format!("could not write output file {}", path.display()))
}

/// Snapshot accumulated records so a crash loses at most the in-flight
/// organization's work.
pub fn write_checkpoint(
    path: &Path,
    records: &[MergedRecord],
    completed_organizations: usize,
) -> Result<()> {
    let checkpoint = Checkpoint {
        written_at: chrono::Utc::now(),
        completed_organizations,
        records: records.to_vec(),
    };
    let json = serde_json::to_string_pretty(&checkpoint)?;
    fs::write(path, json)
        .with_context(|| format!("could not write checkpoint {}", path.display()))
}
