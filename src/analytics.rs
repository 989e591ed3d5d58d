use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{GradeBucket, StudentPerformance, StudentRecord, SummaryStatistics};

/// Tunables for the class summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// How many students `top_performers` holds at most.
    #[serde(default = "default_top_performers_count")]
    pub top_performers_count: usize,

    /// Students with attendance strictly below this percentage are flagged.
    #[serde(default = "default_attendance_threshold")]
    pub attendance_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_performers_count: default_top_performers_count(),
            attendance_threshold: default_attendance_threshold(),
        }
    }
}

fn default_top_performers_count() -> usize {
    5
}

fn default_attendance_threshold() -> f64 {
    80.0
}

/// Turns a snapshot of student records into class-level statistics.
///
/// Holds nothing but its configuration, so one instance can be shared by
/// every request handler.
#[derive(Debug, Clone, Default)]
pub struct StatisticsAggregator {
    config: AnalyticsConfig,
}

impl StatisticsAggregator {
    pub fn new(config: AnalyticsConfig) -> Self {
        StatisticsAggregator { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn summarize(&self, records: &[StudentRecord]) -> SummaryStatistics {
        SummaryStatistics {
            average_grade: mean(records.iter().map(|s| s.grade)),
            average_attendance: mean(records.iter().map(|s| s.attendance)),
            total_students: records.len(),
            grade_distribution: self.grade_distribution(records),
            subject_stats: self.subject_stats(records),
            top_performers: self.top_performers(records),
            attendance_concerns: self.attendance_concerns(records),
        }
    }

    /// Percentile and advice for one student, or `None` if the id is unknown.
    pub fn analyze_student(&self, records: &[StudentRecord], id: i64) -> Option<StudentPerformance> {
        let student = records.iter().find(|s| s.id == id)?;
        let percentile = percentile(records, student.grade);
        let recommendations = recommendations(student, percentile);

        Some(StudentPerformance {
            student: student.clone(),
            percentile,
            recommendations,
        })
    }

    fn grade_distribution(&self, records: &[StudentRecord]) -> BTreeMap<GradeBucket, usize> {
        let mut distribution = BTreeMap::new();
        for student in records {
            *distribution.entry(GradeBucket::for_grade(student.grade)).or_insert(0) += 1;
        }
        distribution
    }

    fn subject_stats(&self, records: &[StudentRecord]) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

        for student in records {
            // a subject listed twice on one record still counts once
            let subjects: BTreeSet<&str> = student.subjects.iter().map(String::as_str).collect();
            for subject in subjects {
                let entry = totals.entry(subject).or_insert((0.0, 0));
                entry.0 += student.grade;
                entry.1 += 1;
            }
        }

        totals
            .into_iter()
            .map(|(subject, (sum, count))| (subject.to_string(), sum / count as f64))
            .collect()
    }

    fn top_performers(&self, records: &[StudentRecord]) -> Vec<StudentRecord> {
        let mut ranked: Vec<&StudentRecord> = records.iter().collect();
        // stable: equal grades keep their input order
        ranked.sort_by(|a, b| compare(b.grade, a.grade));
        ranked
            .into_iter()
            .take(self.config.top_performers_count)
            .cloned()
            .collect()
    }

    fn attendance_concerns(&self, records: &[StudentRecord]) -> Vec<StudentRecord> {
        let mut flagged: Vec<&StudentRecord> = records
            .iter()
            .filter(|s| s.attendance < self.config.attendance_threshold)
            .collect();
        flagged.sort_by(|a, b| compare(a.attendance, b.attendance));
        flagged.into_iter().cloned().collect()
    }
}

/// Shorthand for a one-off summary with the given configuration.
pub fn summarize(records: &[StudentRecord], config: &AnalyticsConfig) -> SummaryStatistics {
    StatisticsAggregator::new(config.clone()).summarize(records)
}

/// Share of students with a strictly lower grade, as a percentage.
pub fn percentile(records: &[StudentRecord], grade: f64) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let below = records.iter().filter(|s| s.grade < grade).count();
    below as f64 / records.len() as f64 * 100.0
}

pub fn recommendations(student: &StudentRecord, percentile: f64) -> Vec<String> {
    let performance = if student.grade >= 90.0 {
        "Maintain current performance level"
    } else if student
        .performance_metrics
        .test_scores
        .iter()
        .any(|&score| score < 70.0)
    {
        "Focus on improving test scores"
    } else {
        "Work on class participation"
    };

    let attendance = if student.attendance >= 95.0 {
        "Excellent attendance"
    } else if student.attendance < 85.0 {
        "Consider improving attendance"
    } else {
        "Good attendance, room for improvement"
    };

    let placement = if percentile >= 90.0 {
        "Consider advanced placement"
    } else if percentile < 50.0 {
        "Focus on core subjects"
    } else {
        "Continue current study plan"
    };

    vec![
        performance.to_string(),
        attendance.to_string(),
        placement.to_string(),
    ]
}

// -0.0 and 0.0 compare equal here, unlike total_cmp
fn compare(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}
