use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SCORE_MIN: i64 = 0;
pub const SCORE_MAX: i64 = 100;
/// Credits a single course may carry.
pub const CREDIT_RANGE: std::ops::RangeInclusive<i64> = 1..=3;

/// Letter grades, best first. `Ord` follows declaration order, so `A < F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// 4.0-scale points for this grade.
    pub fn gpa_points(self) -> f64 {
        match self {
            Grade::A => 4.0,
            Grade::B => 3.0,
            Grade::C => 2.0,
            Grade::D => 1.0,
            Grade::F => 0.0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Grade::A => "Excellent (80-100)",
            Grade::B => "Good (70-79)",
            Grade::C => "Average (60-69)",
            Grade::D => "Below Average (50-59)",
            Grade::F => "Fail (0-49)",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = UnknownGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            other => Err(UnknownGrade(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grade: {0:?}")]
pub struct UnknownGrade(pub String);

/// Maps a score to its letter grade.
///
/// Total over every integer: values outside `0..=100` fall on the same
/// thresholds (150 is an A, -5 is an F). Range checks belong to
/// [`parse_score`].
pub fn grade_for(score: i64) -> Grade {
    if score >= 80 {
        Grade::A
    } else if score >= 70 {
        Grade::B
    } else if score >= 60 {
        Grade::C
    } else if score >= 50 {
        Grade::D
    } else {
        Grade::F
    }
}

/// GPA points for a score. Derived from [`grade_for`] so both always agree.
pub fn gpa_points_for(score: i64) -> f64 {
    grade_for(score).gpa_points()
}

/// Description for a grade given as text; anything unrecognised is
/// `"Unknown Grade"`.
pub fn describe(grade: &str) -> &'static str {
    grade
        .parse::<Grade>()
        .map(Grade::description)
        .unwrap_or("Unknown Grade")
}

/// A score known to lie in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Score(i64);

impl Score {
    pub fn value(self) -> i64 {
        self.0
    }

    pub fn grade(self) -> Grade {
        grade_for(self.0)
    }

    pub fn gpa_points(self) -> f64 {
        gpa_points_for(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("score must be a whole number")]
    NotANumber,
    #[error("score {0} is outside 0-100")]
    OutOfRange(i64),
}

/// Raw score input as it arrives from a form field, a file, or a JSON number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawScore<'a> {
    Text(&'a str),
    Int(i64),
    Float(f64),
}

impl<'a> From<&'a str> for RawScore<'a> {
    fn from(v: &'a str) -> Self {
        RawScore::Text(v)
    }
}

impl<'a> From<&'a String> for RawScore<'a> {
    fn from(v: &'a String) -> Self {
        RawScore::Text(v.as_str())
    }
}

impl From<i64> for RawScore<'_> {
    fn from(v: i64) -> Self {
        RawScore::Int(v)
    }
}

impl From<f64> for RawScore<'_> {
    fn from(v: f64) -> Self {
        RawScore::Float(v)
    }
}

impl<'a> RawScore<'a> {
    /// Reads a JSON value; `None` for shapes that can never be a score
    /// (null, bool, arrays, objects).
    pub fn from_json(v: &'a serde_json::Value) -> Option<Self> {
        match v {
            serde_json::Value::String(s) => Some(RawScore::Text(s)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(RawScore::Int)
                .or_else(|| n.as_f64().map(RawScore::Float)),
            _ => None,
        }
    }
}

/// Parses raw input into a [`Score`].
///
/// Text is trimmed and must be a plain integer (an optional sign is allowed).
/// Finite floats truncate toward zero.
pub fn parse_score<'a>(raw: impl Into<RawScore<'a>>) -> Result<Score, ScoreError> {
    let n = match raw.into() {
        RawScore::Text(s) => s.trim().parse::<i64>().map_err(|_| ScoreError::NotANumber)?,
        RawScore::Int(v) => v,
        RawScore::Float(v) => {
            if !v.is_finite() || v.trunc().abs() > i64::MAX as f64 {
                return Err(ScoreError::NotANumber);
            }
            v.trunc() as i64
        }
    };
    if !(SCORE_MIN..=SCORE_MAX).contains(&n) {
        return Err(ScoreError::OutOfRange(n));
    }
    Ok(Score(n))
}

pub fn validate_score<'a>(raw: impl Into<RawScore<'a>>) -> bool {
    parse_score(raw).is_ok()
}

/// One completed course's contribution to a cumulative GPA. Records missing
/// either field are ignored by [`cumulative_gpa`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditedRecord {
    pub gpa_points: Option<f64>,
    pub credits: Option<i64>,
}

impl CreditedRecord {
    pub fn new(gpa_points: f64, credits: i64) -> Self {
        Self {
            gpa_points: Some(gpa_points),
            credits: Some(credits),
        }
    }

    /// Present fields must be a grade's GPA points and a course credit count.
    /// Missing fields are fine; [`cumulative_gpa`] skips those records.
    pub fn check(&self) -> Result<(), RecordError> {
        if let Some(p) = self.gpa_points {
            if !Grade::ALL.iter().any(|g| g.gpa_points() == p) {
                return Err(RecordError::GpaPoints(p));
            }
        }
        if let Some(c) = self.credits {
            if !CREDIT_RANGE.contains(&c) {
                return Err(RecordError::Credits(c));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("gpaPoints {0} is not one of 4, 3, 2, 1, 0")]
    GpaPoints(f64),
    #[error("credits {0} is outside 1-3")]
    Credits(i64),
}

/// Credit-weighted GPA, rounded to 2 decimals. Empty input or zero total
/// credits gives 0.0. Records without positive credits add nothing.
pub fn cumulative_gpa<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a CreditedRecord>,
{
    let mut total_points = 0.0;
    let mut total_credits: i64 = 0;
    for r in records {
        let (Some(points), Some(credits)) = (r.gpa_points, r.credits) else {
            continue;
        };
        if credits <= 0 {
            continue;
        }
        total_points += points * credits as f64;
        total_credits = total_credits.saturating_add(credits);
    }
    if total_credits <= 0 {
        return 0.0;
    }
    round_2(total_points / total_credits as f64)
}

pub fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Counts per grade in A..F order, zeros included.
pub fn grade_distribution<I>(grades: I) -> [(Grade, usize); 5]
where
    I: IntoIterator<Item = Grade>,
{
    let mut out = Grade::ALL.map(|g| (g, 0usize));
    for g in grades {
        out[g as usize].1 += 1;
    }
    out
}

pub fn average_score<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = i64>,
{
    let mut n = 0usize;
    let mut sum = 0i64;
    for s in scores {
        n += 1;
        sum = sum.saturating_add(s);
    }
    if n == 0 {
        None
    } else {
        Some(sum as f64 / n as f64)
    }
}
