use crate::model::{AttendanceLedger, DayStatus, IatScores, StudentRecord, Subject};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Half-away-from-zero rounding to two decimals, used for every reported value.
pub fn round_off_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// A stored IAT score counts only when it is present and numeric.
pub fn parse_score(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn subject_average(subject: &Subject) -> Option<f64> {
    mean(
        subject
            .scores
            .values()
            .into_iter()
            .flatten()
            .filter_map(parse_score),
    )
}

/// Mean over subjects that have at least one valid IAT. Subjects without one
/// are left out rather than counted as zero.
pub fn score_average(record: &StudentRecord) -> Option<f64> {
    mean(record.subjects.iter().filter_map(subject_average))
}

/// `None` when no day has been marked yet.
pub fn attendance_percentage(ledger: &AttendanceLedger) -> Option<f64> {
    let days = ledger.total_days();
    if days == 0 {
        return None;
    }
    Some(100.0 * ledger.total_attendance() as f64 / days as f64)
}

/// Mean of whichever of attendance percentage and score average are defined.
pub fn overall_score(record: &StudentRecord) -> Option<f64> {
    match (
        attendance_percentage(&record.attendance),
        score_average(record),
    ) {
        (Some(a), Some(s)) => Some((a + s) / 2.0),
        (Some(a), None) => Some(a),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ScoreBand {
    From90,
    From80,
    From70,
    From60,
    From50,
    From40,
    Below40,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 7] = [
        ScoreBand::From90,
        ScoreBand::From80,
        ScoreBand::From70,
        ScoreBand::From60,
        ScoreBand::From50,
        ScoreBand::From40,
        ScoreBand::Below40,
    ];

    fn floor(self) -> f64 {
        match self {
            ScoreBand::From90 => 90.0,
            ScoreBand::From80 => 80.0,
            ScoreBand::From70 => 70.0,
            ScoreBand::From60 => 60.0,
            ScoreBand::From50 => 50.0,
            ScoreBand::From40 => 40.0,
            ScoreBand::Below40 => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::From90 => "90-100",
            ScoreBand::From80 => "80-90",
            ScoreBand::From70 => "70-80",
            ScoreBand::From60 => "60-70",
            ScoreBand::From50 => "50-60",
            ScoreBand::From40 => "40-50",
            ScoreBand::Below40 => "0-40",
        }
    }

    /// NaN and negative scores have no band.
    pub fn for_score(score: f64) -> Option<ScoreBand> {
        if score.is_nan() {
            return None;
        }
        ScoreBand::ALL.into_iter().find(|b| score >= b.floor())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreHistogram {
    counts: [usize; 7],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub band: &'static str,
    pub count: usize,
}

impl ScoreHistogram {
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut h = ScoreHistogram::default();
        for band in scores.into_iter().flatten().filter_map(ScoreBand::for_score) {
            h.counts[band as usize] += 1;
        }
        h
    }

    pub fn count(&self, band: ScoreBand) -> usize {
        self.counts[band as usize]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn bins(&self) -> Vec<HistogramBin> {
        ScoreBand::ALL
            .into_iter()
            .map(|b| HistogramBin {
                band: b.label(),
                count: self.count(b),
            })
            .collect()
    }
}

/// Bucket each student's overall score (rounded as reported).
pub fn score_histogram(records: &[StudentRecord]) -> ScoreHistogram {
    ScoreHistogram::from_scores(
        records
            .iter()
            .map(|r| overall_score(r).map(round_off_2_decimals)),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Gender,
    Residence,
}

impl TagKind {
    fn value_of(self, record: &StudentRecord) -> Option<String> {
        match self {
            TagKind::Gender => record
                .gender
                .as_deref()
                .map(|g| g.trim().to_ascii_lowercase())
                .filter(|g| !g.is_empty()),
            TagKind::Residence => record.residence.map(|r| r.as_str().to_string()),
        }
    }
}

/// A student's value for one IAT: the mean of that IAT across their subjects.
pub fn student_iat_mean(record: &StudentRecord, iat: usize) -> Option<f64> {
    mean(
        record
            .subjects
            .iter()
            .filter_map(|s| s.scores.get(iat))
            .filter_map(parse_score),
    )
}

/// Mean of one IAT over students carrying the given tag. Students without a
/// valid value for that IAT drop out of both numerator and denominator.
pub fn iat_mean_by_tag(
    records: &[StudentRecord],
    kind: TagKind,
    value: &str,
    iat: usize,
) -> Option<f64> {
    let want = value.trim().to_ascii_lowercase();
    mean(
        records
            .iter()
            .filter(|r| kind.value_of(r).as_deref() == Some(want.as_str()))
            .filter_map(|r| student_iat_mean(r, iat)),
    )
}

/// IAT 1..3 means for every distinct tag value present in `records`.
pub fn iat_profile_by_tag(
    records: &[StudentRecord],
    kind: TagKind,
) -> BTreeMap<String, [Option<f64>; IatScores::COUNT]> {
    let mut values: Vec<String> = records.iter().filter_map(|r| kind.value_of(r)).collect();
    values.sort();
    values.dedup();
    values
        .into_iter()
        .map(|v| {
            let row = [1, 2, 3].map(|iat| iat_mean_by_tag(records, kind, &v, iat));
            (v, row)
        })
        .collect()
}

/// Mean of the defined score averages per class value.
pub fn class_test_averages(records: &[StudentRecord]) -> BTreeMap<String, Option<f64>> {
    let mut by_class: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records {
        let Some(class) = r.class.as_ref() else {
            continue;
        };
        let slot = by_class.entry(class.clone()).or_default();
        if let Some(avg) = score_average(r) {
            slot.push(avg);
        }
    }
    by_class
        .into_iter()
        .map(|(class, avgs)| (class, mean(avgs)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackBand {
    Outstanding,
    Brilliant,
    Remarkable,
    Fantastic,
    Commendable,
    Impressive,
    Promising,
    Persevering,
    Challenged,
    Unavailable,
}

impl FeedbackBand {
    pub fn for_score(score: Option<f64>) -> FeedbackBand {
        let Some(s) = score else {
            return FeedbackBand::Unavailable;
        };
        match s {
            s if s.is_nan() => FeedbackBand::Unavailable,
            s if (95.0..=100.0).contains(&s) => FeedbackBand::Outstanding,
            s if (90.0..95.0).contains(&s) => FeedbackBand::Brilliant,
            s if (85.0..90.0).contains(&s) => FeedbackBand::Remarkable,
            s if (80.0..85.0).contains(&s) => FeedbackBand::Fantastic,
            s if (75.0..80.0).contains(&s) => FeedbackBand::Commendable,
            s if (70.0..75.0).contains(&s) => FeedbackBand::Impressive,
            s if (60.0..70.0).contains(&s) => FeedbackBand::Promising,
            s if (30.0..60.0).contains(&s) => FeedbackBand::Persevering,
            s if (0.0..30.0).contains(&s) => FeedbackBand::Challenged,
            _ => FeedbackBand::Unavailable,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FeedbackBand::Outstanding => {
                "Outstanding work. Your results set the benchmark for everyone around you."
            }
            FeedbackBand::Brilliant => "Brilliant results. Keep up this level of consistency.",
            FeedbackBand::Remarkable => {
                "Remarkable performance. A little focus on weaker subjects will take you further."
            }
            FeedbackBand::Fantastic => {
                "Fantastic progress. Some extra effort in specific areas will pay off."
            }
            FeedbackBand::Commendable => {
                "Commendable results. Attention to the areas that need work will unlock more."
            }
            FeedbackBand::Impressive => {
                "Impressive effort. Target the subjects that lag behind to see real gains."
            }
            FeedbackBand::Promising => {
                "Promising performance. Working on weak areas will lift your overall score."
            }
            FeedbackBand::Persevering => {
                "Your perseverance shows. Steady, focused effort will bring visible growth."
            }
            FeedbackBand::Challenged => {
                "This has been a hard stretch. Ask for support and keep going, you can turn it around."
            }
            FeedbackBand::Unavailable => "No performance data is available yet.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendance {
    pub date: NaiveDate,
    pub total_students: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub unmarked_count: usize,
    pub present_percentage: f64,
    pub absent_percentage: f64,
    pub absentees: Vec<String>,
}

/// Percentages are taken over students marked either way on `date`; 0 when none are.
pub fn daily_attendance<'a, I>(records: I, date: NaiveDate) -> DailyAttendance
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut total_students = 0usize;
    let mut present_count = 0usize;
    let mut absent_count = 0usize;
    let mut absentees = Vec::new();
    for r in records {
        total_students += 1;
        match r.attendance.status_on(date) {
            Some(DayStatus::Present) => present_count += 1,
            Some(DayStatus::Leave) => {
                absent_count += 1;
                absentees.push(r.email.clone());
            }
            None => {}
        }
    }
    let marked = present_count + absent_count;
    let pct = |n: usize| {
        if marked == 0 {
            0.0
        } else {
            round_off_2_decimals(100.0 * n as f64 / marked as f64)
        }
    };
    DailyAttendance {
        date,
        total_students,
        present_count,
        absent_count,
        unmarked_count: total_students - marked,
        present_percentage: pct(present_count),
        absent_percentage: pct(absent_count),
        absentees,
    }
}

/// `daily_attendance` per group of records sharing a key (class, department).
/// Records without a key are left out.
pub fn daily_attendance_by<F>(
    records: &[StudentRecord],
    date: NaiveDate,
    key: F,
) -> BTreeMap<String, DailyAttendance>
where
    F: Fn(&StudentRecord) -> Option<&str>,
{
    let mut groups: BTreeMap<String, Vec<&StudentRecord>> = BTreeMap::new();
    for r in records {
        if let Some(k) = key(r) {
            groups.entry(k.to_string()).or_default().push(r);
        }
    }
    groups
        .into_iter()
        .map(|(k, group)| (k, daily_attendance(group, date)))
        .collect()
}

/// Present percentage per calendar month (January first), with every marked
/// day of every ledger pooled. `year` narrows the dates considered; without
/// it, months of every year are pooled too.
pub fn pooled_monthly_attendance<'a, I>(ledgers: I, year: Option<i32>) -> [Option<f64>; 12]
where
    I: IntoIterator<Item = &'a AttendanceLedger>,
{
    let mut present = [0usize; 12];
    let mut leave = [0usize; 12];
    let in_year = |d: &&NaiveDate| year.map(|y| d.year() == y).unwrap_or(true);
    for ledger in ledgers {
        for d in ledger.present_dates().iter().filter(in_year) {
            present[d.month0() as usize] += 1;
        }
        for d in ledger.leave_dates().iter().filter(in_year) {
            leave[d.month0() as usize] += 1;
        }
    }
    let mut out = [None; 12];
    for m in 0..12 {
        let total = present[m] + leave[m];
        if total > 0 {
            out[m] = Some(round_off_2_decimals(
                100.0 * present[m] as f64 / total as f64,
            ));
        }
    }
    out
}

pub fn monthly_attendance(ledger: &AttendanceLedger, year: Option<i32>) -> [Option<f64>; 12] {
    pooled_monthly_attendance(std::iter::once(ledger), year)
}

/// Month-by-month attendance of a whole class.
pub fn cohort_monthly_attendance(records: &[StudentRecord], year: Option<i32>) -> [Option<f64>; 12] {
    pooled_monthly_attendance(records.iter().map(|r| &r.attendance), year)
}

/// Mean overall score per department. Students without an overall score
/// drop out; a department where nobody has one maps to `None`.
pub fn department_overall_averages(records: &[StudentRecord]) -> BTreeMap<String, Option<f64>> {
    let mut by_department: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records {
        let Some(department) = r.department.as_ref() else {
            continue;
        };
        let slot = by_department.entry(department.clone()).or_default();
        if let Some(score) = overall_score(r) {
            slot.push(score);
        }
    }
    by_department
        .into_iter()
        .map(|(department, scores)| (department, mean(scores)))
        .collect()
}

/// Each IAT averaged over the student's subjects.
pub fn iat_averages(record: &StudentRecord) -> [Option<f64>; IatScores::COUNT] {
    [1, 2, 3].map(|iat| student_iat_mean(record, iat))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStanding {
    pub subject_code: String,
    pub subject_name: String,
    pub average: f64,
}

/// Strongest and weakest subject by average. Subjects without a valid IAT are
/// skipped; on a tie the earlier subject is kept.
pub fn subject_extremes(record: &StudentRecord) -> Option<(SubjectStanding, SubjectStanding)> {
    let mut highest: Option<SubjectStanding> = None;
    let mut lowest: Option<SubjectStanding> = None;
    for s in &record.subjects {
        let Some(average) = subject_average(s) else {
            continue;
        };
        let standing = SubjectStanding {
            subject_code: s.subject_code.clone(),
            subject_name: s.subject_name.clone(),
            average,
        };
        if highest.as_ref().map_or(true, |h| average > h.average) {
            highest = Some(standing.clone());
        }
        if lowest.as_ref().map_or(true, |l| average < l.average) {
            lowest = Some(standing);
        }
    }
    highest.zip(lowest)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectComparison {
    pub subject_code: String,
    pub subject_name: String,
    pub student: Option<f64>,
    pub lowest: Option<f64>,
    pub average: Option<f64>,
    pub highest: Option<f64>,
    pub compared: usize,
}

/// One row per subject of `student`: their score for `iat` next to the lowest,
/// mean and highest valid score for the same subject code across `cohort`.
pub fn subject_iat_comparison(
    student: &StudentRecord,
    cohort: &[StudentRecord],
    iat: usize,
) -> Vec<SubjectComparison> {
    student
        .subjects
        .iter()
        .map(|subject| {
            let scores: Vec<f64> = cohort
                .iter()
                .filter_map(|r| {
                    r.subjects
                        .iter()
                        .find(|s| s.subject_code == subject.subject_code)
                })
                .filter_map(|s| s.scores.get(iat))
                .filter_map(parse_score)
                .collect();
            SubjectComparison {
                subject_code: subject.subject_code.clone(),
                subject_name: subject.subject_name.clone(),
                student: subject.scores.get(iat).and_then(parse_score),
                lowest: scores.iter().copied().reduce(f64::min),
                average: mean(scores.iter().copied()),
                highest: scores.iter().copied().reduce(f64::max),
                compared: scores.len(),
            }
        })
        .collect()
}
