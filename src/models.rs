use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StudentRecord {
    pub id: i64,
    pub name: String,
    pub grade: f64,
    pub attendance: f64,
    pub subjects: Vec<String>,
    pub performance_metrics: PerformanceMetrics,
    pub last_updated: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub homework_completion: f64,
    pub class_participation: f64,
    #[serde(default)]
    pub test_scores: Vec<f64>,
}

/// Letter-grade bucket used for the grade distribution histogram.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GradeBucket {
    A,
    B,
    C,
    D,
    F,
}

impl GradeBucket {
    pub const ALL: [GradeBucket; 5] = [
        GradeBucket::A,
        GradeBucket::B,
        GradeBucket::C,
        GradeBucket::D,
        GradeBucket::F,
    ];

    /// A = [90, ∞), B = [80, 90), C = [70, 80), D = [60, 70), F = everything else.
    pub fn for_grade(grade: f64) -> Self {
        if grade >= 90.0 {
            GradeBucket::A
        } else if grade >= 80.0 {
            GradeBucket::B
        } else if grade >= 70.0 {
            GradeBucket::C
        } else if grade >= 60.0 {
            GradeBucket::D
        } else {
            GradeBucket::F
        }
    }

    pub fn range_label(&self) -> &'static str {
        match self {
            GradeBucket::A => "90-100",
            GradeBucket::B => "80-89",
            GradeBucket::C => "70-79",
            GradeBucket::D => "60-69",
            GradeBucket::F => "Below 60",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GradeBucket::A => "Excellent",
            GradeBucket::B => "Good",
            GradeBucket::C => "Satisfactory",
            GradeBucket::D => "Needs Improvement",
            GradeBucket::F => "At Risk",
        }
    }
}

impl fmt::Display for GradeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            GradeBucket::A => "A",
            GradeBucket::B => "B",
            GradeBucket::C => "C",
            GradeBucket::D => "D",
            GradeBucket::F => "F",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SummaryStatistics {
    pub average_grade: f64,
    pub average_attendance: f64,
    pub total_students: usize,
    /// Buckets without students are left out.
    pub grade_distribution: BTreeMap<GradeBucket, usize>,
    pub subject_stats: BTreeMap<String, f64>,
    pub top_performers: Vec<StudentRecord>,
    pub attendance_concerns: Vec<StudentRecord>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StudentPerformance {
    pub student: StudentRecord,
    pub percentile: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightsSource {
    /// Text written by the language model.
    Model,
    /// Offline extractive summary of the analysis document.
    Extractive,
}

#[derive(Debug, Serialize, Clone)]
pub struct AnalyticsSummaryResponse {
    pub statistics: SummaryStatistics,
    pub llm_insights: String,
    pub insights_source: InsightsSource,
}

#[derive(Debug, Serialize, Clone)]
pub struct StudentPerformanceResponse {
    pub student_data: StudentRecord,
    pub llm_insights: String,
    pub insights_source: InsightsSource,
    pub percentile: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WelcomeMessage {
    pub message: String,
}
