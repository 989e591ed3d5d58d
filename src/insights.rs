//! Narrative insights over the computed statistics.
//!
//! The analysis is first rendered into a plain-text report, then handed to a
//! [`NarrativeGenerator`] that condenses it into prose. Generators are allowed
//! to fail; callers fall back to the offline [`ExtractiveNarrator`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analytics::AnalyticsConfig;
use crate::config::{NarrativeConfig, NarrativeProvider};
use crate::error::NarrativeError;
use crate::models::{GradeBucket, InsightsSource, StudentPerformance, SummaryStatistics};

const SYSTEM_PROMPT: &str = "You write short insight summaries of student performance analyses for teachers. \
Condense the analysis you are given into one or two plain-text paragraphs. \
Only use the figures and names that appear in the analysis.";

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn source(&self) -> InsightsSource;

    /// Condense an analysis report into free text.
    async fn narrate(&self, document: &str) -> Result<String, NarrativeError>;
}

/// Build the generator selected in the configuration.
pub fn from_config(config: &NarrativeConfig) -> Result<Arc<dyn NarrativeGenerator>, NarrativeError> {
    let narrator: Arc<dyn NarrativeGenerator> = match config.provider {
        NarrativeProvider::Ollama => Arc::new(OllamaNarrator::new(config)?),
        NarrativeProvider::Extractive => Arc::new(ExtractiveNarrator::new(config.max_chars)),
    };
    info!("Narrative generator: {}", narrator.name());
    Ok(narrator)
}

/// Ask `primary` for a narrative and fall back to `fallback` on any error.
pub async fn narrate_with_fallback(
    primary: &dyn NarrativeGenerator,
    fallback: &ExtractiveNarrator,
    document: &str,
) -> (String, InsightsSource) {
    match primary.narrate(document).await {
        Ok(text) => (text, primary.source()),
        Err(e) => {
            warn!("{} failed, using extractive summary: {}", primary.name(), e);
            (fallback.condense(document), fallback.source())
        }
    }
}

/// Render the class-level analysis report.
pub fn class_report(stats: &SummaryStatistics, config: &AnalyticsConfig) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Comprehensive Student Performance Analysis:");
    let _ = writeln!(out);
    let _ = writeln!(out, "Overall Statistics:");
    let _ = writeln!(out, "- Average Grade: {:.2}%", stats.average_grade);
    let _ = writeln!(out, "- Average Attendance: {:.2}%", stats.average_attendance);
    let _ = writeln!(out, "- Total Students: {}", stats.total_students);
    let _ = writeln!(out);

    let _ = writeln!(out, "Grade Distribution:");
    for bucket in GradeBucket::ALL {
        let count = stats.grade_distribution.get(&bucket).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "- {} ({}): {} students",
            bucket.description(),
            bucket.range_label(),
            count
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Subject-wise Performance:");
    if stats.subject_stats.is_empty() {
        let _ = writeln!(out, "- No subject data");
    }
    for (subject, avg) in &stats.subject_stats {
        let _ = writeln!(out, "- {}: {:.1}%", subject, avg);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Top Performers:");
    if stats.top_performers.is_empty() {
        let _ = writeln!(out, "- None");
    }
    for s in &stats.top_performers {
        let _ = writeln!(out, "- {}: {}%", s.name, s.grade);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Attendance Concerns:");
    if stats.attendance_concerns.is_empty() {
        let _ = writeln!(out, "- None");
    }
    for s in &stats.attendance_concerns {
        let _ = writeln!(out, "- {}: {}%", s.name, s.attendance);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Recommendations:");
    let _ = writeln!(
        out,
        "1. Focus on students with attendance below {}%",
        config.attendance_threshold
    );
    let _ = writeln!(out, "2. Provide additional support for students scoring below 60%");
    let _ = writeln!(out, "3. Consider advanced programs for top performers");
    let _ = writeln!(out, "4. Monitor subject-wise performance trends");

    out
}

/// Render the analysis report for one student.
pub fn student_report(performance: &StudentPerformance) -> String {
    let student = &performance.student;
    let metrics = &student.performance_metrics;
    let mut out = String::new();

    let _ = writeln!(out, "Detailed Student Performance Analysis:");
    let _ = writeln!(out);
    let _ = writeln!(out, "Student Information:");
    let _ = writeln!(out, "- Name: {}", student.name);
    let _ = writeln!(out, "- Overall Grade: {}%", student.grade);
    let _ = writeln!(out, "- Attendance Rate: {}%", student.attendance);
    let _ = writeln!(out, "- Performance Percentile: {:.1}%", performance.percentile);
    let _ = writeln!(out);

    let _ = writeln!(out, "Subjects:");
    if student.subjects.is_empty() {
        let _ = writeln!(out, "- None recorded");
    }
    for subject in &student.subjects {
        let _ = writeln!(out, "- {}", subject);
    }
    let _ = writeln!(out);

    let scores = if metrics.test_scores.is_empty() {
        "none recorded".to_string()
    } else {
        metrics
            .test_scores
            .iter()
            .map(|score| format!("{score}%"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let _ = writeln!(out, "Detailed Metrics:");
    let _ = writeln!(out, "- Homework Completion: {}%", metrics.homework_completion);
    let _ = writeln!(out, "- Class Participation: {}%", metrics.class_participation);
    let _ = writeln!(out, "- Test Scores: {}", scores);
    let _ = writeln!(out, "- Last Updated: {}", student.last_updated);
    let _ = writeln!(out);

    let _ = writeln!(out, "Recommendations:");
    for (i, rec) in performance.recommendations.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, rec);
    }

    out
}

/// Offline generator: turns each report section into one sentence.
#[derive(Debug, Clone)]
pub struct ExtractiveNarrator {
    max_chars: usize,
}

impl ExtractiveNarrator {
    pub fn new(max_chars: usize) -> Self {
        ExtractiveNarrator { max_chars }
    }

    /// Always returns text, even for an empty document.
    pub fn condense(&self, document: &str) -> String {
        let mut sentences = Vec::new();
        let mut heading: Option<&str> = None;
        let mut items: Vec<&str> = Vec::new();

        for line in document.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(title) = line.strip_suffix(':') {
                push_sentence(&mut sentences, heading, &items);
                heading = Some(title);
                items.clear();
            } else {
                items.push(strip_marker(line));
            }
        }
        push_sentence(&mut sentences, heading, &items);

        if sentences.is_empty() {
            return "No analysis available.".to_string();
        }
        truncate_words(&sentences.join(" "), self.max_chars)
    }
}

impl Default for ExtractiveNarrator {
    fn default() -> Self {
        ExtractiveNarrator::new(NarrativeConfig::default().max_chars)
    }
}

#[async_trait]
impl NarrativeGenerator for ExtractiveNarrator {
    fn name(&self) -> &str {
        "extractive"
    }

    fn source(&self) -> InsightsSource {
        InsightsSource::Extractive
    }

    async fn narrate(&self, document: &str) -> Result<String, NarrativeError> {
        Ok(self.condense(document))
    }
}

fn push_sentence(sentences: &mut Vec<String>, heading: Option<&str>, items: &[&str]) {
    if items.is_empty() {
        return;
    }
    let body = items
        .iter()
        .map(|item| item.trim_end_matches('.'))
        .collect::<Vec<_>>()
        .join("; ");
    match heading {
        Some(title) => sentences.push(format!("{title}: {body}.")),
        None => sentences.push(format!("{body}.")),
    }
}

/// Drop a leading `- ` or `1. ` list marker.
fn strip_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("- ") {
        return rest;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return rest;
        }
    }
    line
}

fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}...", trimmed.trim_end_matches([';', ',', '.', ':']))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Generator backed by an Ollama-compatible `/api/chat` endpoint.
pub struct OllamaNarrator {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    timeout_seconds: u64,
}

impl OllamaNarrator {
    pub fn new(config: &NarrativeConfig) -> Result<Self, NarrativeError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
        })
    }
}

#[async_trait]
impl NarrativeGenerator for OllamaNarrator {
    fn name(&self) -> &str {
        &self.model
    }

    fn source(&self) -> InsightsSource {
        InsightsSource::Model
    }

    async fn narrate(&self, document: &str) -> Result<String, NarrativeError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: document,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        debug!("Requesting narrative from {} ({} chars)", url, document.len());
        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NarrativeError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    NarrativeError::Connect(self.base_url.clone())
                } else {
                    NarrativeError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let text = chat.message.content.trim();
        if text.is_empty() {
            return Err(NarrativeError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::StatisticsAggregator;
    use crate::models::{PerformanceMetrics, StudentRecord};

    struct FailingNarrator;

    #[async_trait]
    impl NarrativeGenerator for FailingNarrator {
        fn name(&self) -> &str {
            "failing"
        }

        fn source(&self) -> InsightsSource {
            InsightsSource::Model
        }

        async fn narrate(&self, _document: &str) -> Result<String, NarrativeError> {
            Err(NarrativeError::EmptyResponse)
        }
    }

    fn student(id: i64, name: &str, grade: f64, attendance: f64) -> StudentRecord {
        StudentRecord {
            id,
            name: name.to_string(),
            grade,
            attendance,
            subjects: vec!["Mathematics".to_string()],
            performance_metrics: PerformanceMetrics {
                homework_completion: 92.0,
                class_participation: 81.5,
                test_scores: vec![88.0, 64.5],
            },
            last_updated: "2026-10-12 10:15:00".to_string(),
        }
    }

    fn sample_stats() -> SummaryStatistics {
        let records = vec![
            student(1, "Emma Smith", 95.0, 98.0),
            student(2, "Liam Brown", 82.0, 88.0),
            student(3, "Ava Jones", 58.0, 40.0),
        ];
        StatisticsAggregator::default().summarize(&records)
    }

    #[test]
    fn test_class_report_lists_every_bucket() {
        let report = class_report(&sample_stats(), &AnalyticsConfig::default());

        assert!(report.contains("- Average Grade: 78.33%"));
        assert!(report.contains("- Total Students: 3"));
        assert!(report.contains("- Excellent (90-100): 1 students"));
        assert!(report.contains("- Satisfactory (70-79): 0 students"));
        assert!(report.contains("- At Risk (Below 60): 1 students"));
        assert!(report.contains("- Mathematics: 78.3%"));
        assert!(report.contains("- Emma Smith: 95%"));
        assert!(report.contains("- Ava Jones: 40%"));
        assert!(report.contains("1. Focus on students with attendance below 80%"));
    }

    #[test]
    fn test_student_report_includes_metrics_and_advice() {
        let performance = StudentPerformance {
            student: student(2, "Liam Brown", 82.0, 88.0),
            percentile: 33.333,
            recommendations: vec!["Focus on improving test scores".to_string()],
        };
        let report = student_report(&performance);

        assert!(report.contains("- Name: Liam Brown"));
        assert!(report.contains("- Performance Percentile: 33.3%"));
        assert!(report.contains("- Test Scores: 88%, 64.5%"));
        assert!(report.contains("1. Focus on improving test scores"));
    }

    #[test]
    fn test_condense_joins_sections() {
        let narrator = ExtractiveNarrator::new(1000);
        let text = narrator.condense(
            "Report:\n\nTotals:\n- Students: 3\n- Average: 80%\n\nNext steps:\n1. Call parents.\n2. Review\n",
        );

        assert_eq!(
            text,
            "Totals: Students: 3; Average: 80%. Next steps: Call parents; Review."
        );
    }

    #[test]
    fn test_condense_truncates_on_word_boundary() {
        let narrator = ExtractiveNarrator::new(20);
        let text = narrator.condense("Notes:\n- alpha beta gamma delta epsilon\n");

        assert_eq!(text, "Notes: alpha beta...");
    }

    #[test]
    fn test_condense_never_returns_empty() {
        let narrator = ExtractiveNarrator::default();
        assert_eq!(narrator.condense("   \n"), "No analysis available.");
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("- item"), "item");
        assert_eq!(strip_marker("12. item"), "item");
        assert_eq!(strip_marker("2026 plan"), "2026 plan");
        assert_eq!(strip_marker("plain"), "plain");
    }

    #[actix_web::test]
    async fn test_fallback_used_when_generator_fails() {
        let document = class_report(&sample_stats(), &AnalyticsConfig::default());
        let fallback = ExtractiveNarrator::default();

        let (text, source) = narrate_with_fallback(&FailingNarrator, &fallback, &document).await;

        assert_eq!(source, InsightsSource::Extractive);
        assert!(text.starts_with("Overall Statistics: Average Grade: 78.33%"));
    }

    #[actix_web::test]
    async fn test_ollama_unreachable_is_an_error() {
        let config = NarrativeConfig {
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..NarrativeConfig::default()
        };
        let narrator = OllamaNarrator::new(&config).unwrap();

        let err = narrator.narrate("Totals:\n- Students: 1\n").await.unwrap_err();
        assert!(matches!(
            err,
            NarrativeError::Connect(_) | NarrativeError::Timeout(_) | NarrativeError::Request(_)
        ));
    }

    #[test]
    fn test_from_config_selects_provider() {
        let config = NarrativeConfig {
            provider: NarrativeProvider::Extractive,
            ..NarrativeConfig::default()
        };
        let narrator = from_config(&config).unwrap();

        assert_eq!(narrator.name(), "extractive");
        assert_eq!(narrator.source(), InsightsSource::Extractive);
    }
}
