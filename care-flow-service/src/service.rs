use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use care_flow::{
    AnswerSource, EvalResult, FlowError, IntakeResult, Pipeline, PlaceholderAnswers,
    RoutingSuggestion, SessionRecord, SuppliedAnswers, run_clarifier, run_eval, run_intake,
    run_routing, run_summary,
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::models::{
    EvalRequest, IntakeRequest, NoteResponse, QuestionsResponse, RunRequest, RunResponse,
    SummaryRequest, SymptomsRequest,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

pub const CORRELATION_HEADER: &str = "x-correlation-id";

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// Model-side failures are the upstream's fault; anything else is ours.
fn flow_error(message: &str, e: &FlowError) -> ApiError {
    let status = match e {
        FlowError::EmptyResponse { .. }
        | FlowError::Format { .. }
        | FlowError::Model(_)
        | FlowError::Timeout(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({
            "error": message,
            "details": e.to_string()
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
}

pub fn create_app(pipeline: Pipeline) -> Router {
    build_router(AppState { pipeline })
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/stages/intake", post(intake_stage))
        .route("/stages/clarifier", post(clarifier_stage))
        .route("/stages/summary", post(summary_stage))
        .route("/stages/routing", post(routing_stage))
        .route("/stages/eval", post(eval_stage))
        .route("/run", post(run_pipeline))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Tag every request with a correlation id and run it inside a span carrying it
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header {
        request.headers_mut().insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Care Flow Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Turns a free-text symptom description into a doctor-ready visit note",
        "endpoints": {
            "POST /stages/intake": "Extract structured symptoms from raw text",
            "POST /stages/clarifier": "Generate follow-up questions",
            "POST /stages/summary": "Write the visit note",
            "POST /stages/routing": "Suggest doctor types and test categories",
            "POST /stages/eval": "Score a visit note",
            "POST /run": "Run the whole pipeline",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn validate_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(bad_request_error(&format!("{field} is required")));
    }
    Ok(())
}

async fn intake_stage(
    State(state): State<AppState>,
    Json(request): Json<IntakeRequest>,
) -> ApiResult<IntakeResult> {
    validate_text("raw_text", &request.raw_text)?;

    let intake = run_intake(state.pipeline.model(), &request.raw_text)
        .await
        .map_err(|e| {
            error!(error = %e, "Intake stage failed");
            flow_error("Intake stage failed", &e)
        })?;

    info!(symptoms = intake.symptoms.len(), "Intake stage complete");
    Ok(Json(intake))
}

async fn clarifier_stage(
    State(state): State<AppState>,
    Json(request): Json<SymptomsRequest>,
) -> ApiResult<QuestionsResponse> {
    validate_text("raw_text", &request.raw_text)?;

    let questions = run_clarifier(state.pipeline.model(), &request.raw_text, &request.intake)
        .await
        .map_err(|e| {
            error!(error = %e, "Clarifier stage failed");
            flow_error("Clarifier stage failed", &e)
        })?;

    info!(questions = questions.len(), "Clarifier stage complete");
    Ok(Json(QuestionsResponse { questions }))
}

async fn summary_stage(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> ApiResult<NoteResponse> {
    validate_text("raw_text", &request.raw_text)?;

    let doctor_note = run_summary(
        state.pipeline.model(),
        &request.raw_text,
        &request.intake,
        &request.answers,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Summary stage failed");
        flow_error("Summary stage failed", &e)
    })?;

    info!(note_len = doctor_note.len(), "Summary stage complete");
    Ok(Json(NoteResponse { doctor_note }))
}

async fn routing_stage(
    State(state): State<AppState>,
    Json(request): Json<SymptomsRequest>,
) -> ApiResult<RoutingSuggestion> {
    validate_text("raw_text", &request.raw_text)?;

    let routing = run_routing(state.pipeline.model(), &request.raw_text, &request.intake)
        .await
        .map_err(|e| {
            error!(error = %e, "Routing stage failed");
            flow_error("Routing stage failed", &e)
        })?;

    info!(
        doctor_types = routing.recommended_doctors.len(),
        "Routing stage complete"
    );
    Ok(Json(routing))
}

async fn eval_stage(
    State(state): State<AppState>,
    Json(request): Json<EvalRequest>,
) -> ApiResult<EvalResult> {
    validate_text("doctor_note", &request.doctor_note)?;

    let eval = run_eval(state.pipeline.model(), &request.doctor_note)
        .await
        .map_err(|e| {
            error!(error = %e, "Eval stage failed");
            flow_error("Eval stage failed", &e)
        })?;

    info!(score = eval.score.value(), "Eval stage complete");
    Ok(Json(eval))
}

/// Run all stages for one request. Nothing is kept between requests.
async fn run_pipeline(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> ApiResult<RunResponse> {
    validate_text("raw_text", &request.raw_text)?;

    let answers: Box<dyn AnswerSource> = match request.answers {
        Some(answers) => Box::new(SuppliedAnswers::new(answers)),
        None => Box::new(PlaceholderAnswers),
    };

    let mut session = SessionRecord::new(request.raw_text);
    match state.pipeline.execute(&mut session, answers.as_ref()).await {
        Ok(summary) => Ok(Json(RunResponse { session, summary })),
        Err(e) => {
            error!(session_id = %session.id, error = %e, "Pipeline run failed");
            let (status, Json(mut body)) = flow_error("Pipeline run aborted", &e);
            body["session"] = serde_json::to_value(&session).unwrap_or(Value::Null);
            Err((status, Json(body)))
        }
    }
}
