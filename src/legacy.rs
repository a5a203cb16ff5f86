use crate::grade::{parse_score, Grade, Score};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// One row of a legacy results file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLine {
    pub index_number: String,
    pub full_name: String,
    pub course: String,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineIssue {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ParsedResults {
    pub lines: Vec<ResultLine>,
    pub issues: Vec<LineIssue>,
}

const CSV_COLUMNS: [&str; 4] = ["IndexNumber", "FullName", "Course", "Score"];

/// Reads a results file. `.csv` files carry a header naming the columns;
/// anything else is headerless `index,name,course,score` lines.
pub fn parse_results_file(path: &Path) -> anyhow::Result<ParsedResults> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        parse_csv(&text)
    } else {
        Ok(parse_plain(&text))
    }
}

fn parse_csv(text: &str) -> anyhow::Result<ParsedResults> {
    let mut out = ParsedResults::default();
    let mut lines = text.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, l)) if l.trim().is_empty() => continue,
            Some((_, l)) => break split_csv_record(l),
            None => return Ok(out),
        }
    };
    let mut cols = [0usize; 4];
    for (slot, name) in cols.iter_mut().zip(CSV_COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow::anyhow!("csv header is missing column {name}"))?;
    }

    for (i, raw) in lines {
        if raw.trim().is_empty() {
            continue;
        }
        let fields = split_csv_record(raw);
        let picked: Option<Vec<&str>> = cols
            .iter()
            .map(|&c| fields.get(c).map(String::as_str))
            .collect();
        match picked {
            Some(f) => push_line(&mut out, i + 1, &f),
            None => out.issues.push(LineIssue {
                line: i + 1,
                message: format!("expected {} columns, found {}", header.len(), fields.len()),
            }),
        }
    }
    Ok(out)
}

fn parse_plain(text: &str) -> ParsedResults {
    let mut out = ParsedResults::default();
    for (i, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let fields = split_fields(raw);
        if fields.len() != 4 {
            out.issues.push(LineIssue {
                line: i + 1,
                message: format!("expected 4 fields, found {}", fields.len()),
            });
            continue;
        }
        let f: Vec<&str> = fields.iter().map(String::as_str).collect();
        push_line(&mut out, i + 1, &f);
    }
    out
}

/// `f` is index, name, course, score.
fn push_line(out: &mut ParsedResults, line: usize, f: &[&str]) {
    if f[..3].iter().any(|v| v.is_empty()) {
        out.issues.push(LineIssue {
            line,
            message: "index number, name and course are required".into(),
        });
        return;
    }
    match parse_score(f[3]) {
        Ok(score) => out.lines.push(ResultLine {
            index_number: f[0].to_string(),
            full_name: f[1].to_string(),
            course: f[2].to_string(),
            score,
        }),
        Err(e) => out.issues.push(LineIssue {
            line,
            message: e.to_string(),
        }),
    }
}

/// Splits one CSV record. Commas inside double quotes are data and `""`
/// inside quotes is a literal quote. Fields are trimmed.
fn split_csv_record(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut buf).trim().to_string()),
            _ => buf.push(ch),
        }
    }
    out.push(buf.trim().to_string());
    out
}

/// Plain-text lines: a bare split on commas, with surrounding quotes dropped.
fn split_fields(line: &str) -> Vec<String> {
    line.split(',').map(|p| strip_quotes(p.trim())).collect()
}

fn strip_quotes(s: &str) -> String {
    let t = s.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        t[1..t.len() - 1].trim().to_string()
    } else {
        t.to_string()
    }
}

pub fn default_report_name(now: NaiveDateTime) -> String {
    format!("summary_report_{}.txt", now.format("%Y%m%d_%H%M%S"))
}

pub fn render_summary_report(
    total: i64,
    distribution: &[(Grade, usize); 5],
    generated_at: NaiveDateTime,
) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Summary Report");
    let _ = writeln!(s, "==============");
    let _ = writeln!(s);
    let _ = writeln!(s, "Total Students: {total}");
    let _ = writeln!(s);
    let _ = writeln!(s, "Grade Distribution:");
    for (g, n) in distribution {
        let _ = writeln!(s, "{g}: {n}");
    }
    let _ = writeln!(s);
    let _ = writeln!(
        s,
        "Report generated on: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    s
}

pub fn write_summary_report(
    path: &Path,
    total: i64,
    distribution: &[(Grade, usize); 5],
    generated_at: NaiveDateTime,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_summary_report(total, distribution, generated_at))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::grade_distribution;
    use chrono::NaiveDate;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("resultsd-legacy-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let p = dir.join(name);
        std::fs::write(&p, contents).expect("write");
        p
    }

    #[test]
    fn csv_with_reordered_header() {
        let p = temp_file(
            "students.csv",
            "Score,IndexNumber,FullName,Course\n85,STU001,John Doe,Computer Science\n\n101,STU002,Jane,Maths\nabc,STU003,Bob,Physics\n",
        );
        let parsed = parse_results_file(&p).expect("parse");
        assert_eq!(parsed.lines.len(), 1);
        assert_eq!(parsed.lines[0].index_number, "STU001");
        assert_eq!(parsed.lines[0].score.value(), 85);
        assert_eq!(parsed.issues.len(), 2);
        assert_eq!(parsed.issues[0].line, 4);
        assert_eq!(parsed.issues[1].line, 5);
    }

    #[test]
    fn csv_quoted_fields_keep_commas_and_quotes() {
        let p = temp_file(
            "quoted.csv",
            "IndexNumber,FullName,Course,Score\nSTU001,\"Doe, John\",CS,85\nSTU002,\"Ann \"\"Jo\"\" Lee\", \"Maths, Pure\" ,72\n",
        );
        let parsed = parse_results_file(&p).expect("parse");
        assert!(parsed.issues.is_empty(), "{:?}", parsed.issues);
        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.lines[0].full_name, "Doe, John");
        assert_eq!(parsed.lines[0].score.value(), 85);
        assert_eq!(parsed.lines[1].full_name, "Ann \"Jo\" Lee");
        assert_eq!(parsed.lines[1].course, "Maths, Pure");
    }

    #[test]
    fn csv_missing_column_is_an_error() {
        let p = temp_file("bad.csv", "IndexNumber,FullName,Score\nSTU1,A,50\n");
        assert!(parse_results_file(&p).is_err());
    }

    #[test]
    fn plain_text_lines() {
        let p = temp_file(
            "results.txt",
            "STU001, John Doe, Computer Science, 85\nSTU002,Jane Smith,Mathematics\n\"STU003\",\"Bob\",\"Physics\",78\n",
        );
        let parsed = parse_results_file(&p).expect("parse");
        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.lines[0].full_name, "John Doe");
        assert_eq!(parsed.lines[1].index_number, "STU003");
        assert_eq!(
            parsed.issues,
            vec![LineIssue {
                line: 2,
                message: "expected 4 fields, found 3".into()
            }]
        );
    }

    #[test]
    fn summary_report_layout() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("date");
        let dist = grade_distribution([Grade::A, Grade::A, Grade::D]);
        let text = render_summary_report(3, &dist, at);
        assert!(text.starts_with("Summary Report\n==============\n\nTotal Students: 3\n"));
        assert!(text.contains("A: 2\nB: 0\nC: 0\nD: 1\nF: 0\n"));
        assert!(text.ends_with("Report generated on: 2024-05-01 09:30:00\n"));
        assert_eq!(default_report_name(at), "summary_report_20240501_093000.txt");
    }
}
