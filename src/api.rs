use actix_cors::Cors;
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use tracing::{debug, info};

use crate::analytics::{AnalyticsConfig, StatisticsAggregator};
use crate::data::validate_records;
use crate::database::StudentRepository;
use crate::error::{ApiError, ErrorBody};
use crate::insights::{
    class_report, narrate_with_fallback, student_report, ExtractiveNarrator, NarrativeGenerator,
};
use crate::models::{
    AnalyticsSummaryResponse, StudentPerformanceResponse, StudentRecord, WelcomeMessage,
};

const MAX_JSON_BODY: usize = 4 * 1024 * 1024;

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub repository: Arc<dyn StudentRepository>,
    pub narrator: Arc<dyn NarrativeGenerator>,
    pub fallback: ExtractiveNarrator,
    pub aggregator: StatisticsAggregator,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn StudentRepository>,
        narrator: Arc<dyn NarrativeGenerator>,
        analytics: AnalyticsConfig,
        max_chars: usize,
    ) -> Self {
        AppState {
            repository,
            narrator,
            fallback: ExtractiveNarrator::new(max_chars),
            aggregator: StatisticsAggregator::new(analytics),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_JSON_BODY))
        .route("/", web::get().to(root))
        .route("/health", web::get().to(health_check))
        .route("/students", web::get().to(list_students))
        .route("/students/{id}", web::get().to(get_student))
        .route("/analytics/summary", web::get().to(analytics_summary))
        .route(
            "/analytics/performance/{id}",
            web::get().to(student_performance),
        )
        .route("/analytics/summarize", web::post().to(summarize_batch));
}

/// Any-origin CORS for the browser dashboard. Preflights are answered here.
pub fn cors() -> Cors {
    Cors::permissive()
}

/// JSON 404 for anything no route matched.
pub async fn fallback_route(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorBody {
        code: "NOT_FOUND".to_string(),
        message: format!("No route for {} {}", req.method(), req.path()),
        details: None,
    })
}

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(WelcomeMessage {
        message: "Welcome to Student Analytics Dashboard API".to_string(),
    })
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Student Analytics Dashboard API is running!")
}

async fn list_students(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let students = state.repository.list_students()?;
    debug!("Serving {} students", students.len());
    Ok(HttpResponse::Ok().json(&*students))
}

async fn get_student(
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let student = state
        .repository
        .find_student(id)?
        .ok_or(ApiError::StudentNotFound(id))?;
    Ok(HttpResponse::Ok().json(student))
}

async fn analytics_summary(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let students = state.repository.list_students()?;
    let statistics = state.aggregator.summarize(&students);

    let report = class_report(&statistics, state.aggregator.config());
    let (llm_insights, insights_source) =
        narrate_with_fallback(state.narrator.as_ref(), &state.fallback, &report).await;

    info!(
        "Class summary over {} students (insights: {:?})",
        statistics.total_students, insights_source
    );

    Ok(HttpResponse::Ok().json(AnalyticsSummaryResponse {
        statistics,
        llm_insights,
        insights_source,
    }))
}

async fn student_performance(
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let students = state.repository.list_students()?;
    let performance = state
        .aggregator
        .analyze_student(&students, id)
        .ok_or(ApiError::StudentNotFound(id))?;

    let report = student_report(&performance);
    let (llm_insights, insights_source) =
        narrate_with_fallback(state.narrator.as_ref(), &state.fallback, &report).await;

    Ok(HttpResponse::Ok().json(StudentPerformanceResponse {
        student_data: performance.student,
        llm_insights,
        insights_source,
        percentile: performance.percentile,
        recommendations: performance.recommendations,
    }))
}

/// Summarize a caller-supplied batch of records. No narrative is generated.
async fn summarize_batch(
    web::Json(students): web::Json<Vec<StudentRecord>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    validate_records(&students)?;
    let statistics = state.aggregator.summarize(&students);
    debug!("Summarized batch of {} students", statistics.total_students);
    Ok(HttpResponse::Ok().json(statistics))
}
