use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{
        multipart::MultipartError, DefaultBodyLimit, FromRequest, Multipart, Request, State,
    },
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{Html, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use repairdesk_shared::clock::{decode_base36, id_from_millis, MonotonicClock};
use repairdesk_shared::constants::UPLOADS_PREFIX;
use repairdesk_shared::{validate, RawSubmission, SubmissionRecord};
use repairdesk_store::RecordStore;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::attachments::AttachmentStore;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::view;

/// Multipart field carrying the optional image.
const IMAGE_FIELD: &str = "image";

/// Room for the text fields and multipart framing on top of the image.
const FORM_OVERHEAD: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<RecordStore>,
    pub attachments: Arc<AttachmentStore>,
    pub clock: Arc<MonotonicClock>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Open both stores and start the id clock past every stored id.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let records = RecordStore::open(config.submissions_file.clone()).await?;
        let attachments =
            AttachmentStore::new(config.uploads_dir.clone(), config.max_upload_size).await?;

        let clock = MonotonicClock::new();
        match records.read_all().await {
            Ok(existing) => {
                let newest = existing
                    .iter()
                    .filter_map(|r| decode_base36(&r.id))
                    .filter_map(|millis| i64::try_from(millis).ok())
                    .max();
                if let Some(millis) = newest {
                    clock.observe(millis);
                }
                info!(records = existing.len(), "Loaded existing submissions");
            }
            Err(e) => warn!(error = %e, "Existing submissions unreadable"),
        }

        Ok(Self {
            records: Arc::new(records),
            attachments: Arc::new(attachments),
            clock: Arc::new(clock),
            config: Arc::new(config),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let uploads = ServeDir::new(state.attachments.base_path());
    let body_limit = state.config.max_upload_size.saturating_add(FORM_OVERHEAD);

    Router::new()
        .route("/", get(health_check))
        .route("/submit", post(submit))
        .route(
            "/submit-with-apikey",
            post(submit).layer(middleware::from_fn_with_state(
                state.clone(),
                require_api_key,
            )),
        )
        .route("/submissions", get(list_submissions))
        .route("/submissions/view", get(view_submissions))
        .nest_service(UPLOADS_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    msg: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct SubmitResponse {
    ok: bool,
    submission: SubmissionRecord,
}

/// An image part of a submission, held in memory until validation passes.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Submission body as sent by the form: multipart (with an optional image),
/// or JSON / URL-encoded text fields only.
#[derive(Debug)]
pub struct SubmissionForm {
    pub fields: RawSubmission,
    pub image: Option<UploadedFile>,
}

#[async_trait]
impl FromRequest<AppState> for SubmissionForm {
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let max = state.config.max_upload_size;
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| rejected_body(e.status(), e.body_text(), max))?;
            return read_multipart(multipart, max).await;
        }

        let fields = if content_type.starts_with("application/json") {
            let Json(fields) = Json::<RawSubmission>::from_request(req, state)
                .await
                .map_err(|e| rejected_body(e.status(), e.body_text(), max))?;
            fields
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<RawSubmission>::from_request(req, state)
                .await
                .map_err(|e| rejected_body(e.status(), e.body_text(), max))?;
            fields
        } else {
            return Err(ServerError::BadRequest(format!(
                "Unsupported content type '{content_type}'"
            )));
        };

        Ok(Self {
            fields,
            image: None,
        })
    }
}

/// An over-limit body gets the same 413 as an oversized attachment; any
/// other unreadable body is a bad request.
fn rejected_body(status: StatusCode, detail: String, max: usize) -> ServerError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::UploadTooLarge { max }
    } else {
        ServerError::BadRequest(detail)
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    max: usize,
) -> Result<SubmissionForm, ServerError> {
    let mut fields = RawSubmission::default();
    let mut image = None;
    let field_error = move |e: MultipartError| {
        rejected_body(e.status(), format!("Failed to read field: {}", e), max)
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejected_body(e.status(), format!("Multipart error: {}", e), max))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(field_error)?;

            // browsers send an empty part when no file was picked
            if !data.is_empty() {
                image = Some(UploadedFile { file_name, data });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(field_error)?;
        if !fields.set_field(&name, value) {
            debug!(field = %name, "Ignoring unknown form field");
        }
    }

    Ok(SubmissionForm { fields, image })
}

/// Validate, store the image, build the record and append it. Nothing is
/// written unless validation passes, and an image whose record could not be
/// appended is removed again.
pub async fn accept_submission(
    state: &AppState,
    form: SubmissionForm,
) -> Result<SubmissionRecord, ServerError> {
    let draft = validate(&form.fields).map_err(|errors| {
        debug!(errors = errors.len(), "Submission failed validation");
        errors
    })?;

    let stored = match &form.image {
        Some(upload) => Some(
            state
                .attachments
                .store(&upload.file_name, &upload.data)
                .await?,
        ),
        None => None,
    };

    let millis = state.clock.next_millis();
    let created_at = DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now);
    let record = SubmissionRecord::from_draft(
        draft,
        id_from_millis(millis),
        stored.as_ref().map(|s| s.reference.clone()),
        created_at,
    );

    if let Err(e) = state.records.append(&record).await {
        if let Some(stored) = &stored {
            if let Err(cleanup) = state.attachments.remove(&stored.file_name).await {
                warn!(file = %stored.file_name, error = %cleanup, "Orphaned attachment left behind");
            }
        }
        return Err(e.into());
    }

    info!(
        id = %record.id,
        priority = %record.priority,
        image = record.image.is_some(),
        "Submission accepted"
    );
    Ok(record)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        msg: "Repair desk backend running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn submit(
    State(state): State<AppState>,
    form: SubmissionForm,
) -> Result<Json<SubmitResponse>, ServerError> {
    let submission = accept_submission(&state, form).await?;
    Ok(Json(SubmitResponse {
        ok: true,
        submission,
    }))
}

async fn list_submissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionRecord>>, ServerError> {
    let records = state
        .records
        .read_all()
        .await
        .map_err(ServerError::ReadSubmissions)?;
    Ok(Json(records))
}

async fn view_submissions(State(state): State<AppState>) -> Result<Html<String>, ServerError> {
    let records = state
        .records
        .read_all()
        .await
        .map_err(ServerError::ReadSubmissions)?;
    Ok(Html(view::render_submissions(&records)))
}

/// Gate for `/submit-with-apikey`; runs before the body is read.
async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if !api_key_matches(req.headers(), &state.config.api_key) {
        warn!(path = %req.uri().path(), "Rejected request with missing or invalid API key");
        return Err(ServerError::InvalidApiKey);
    }
    Ok(next.run(req).await)
}

/// A non-empty `x-api-key` wins over `authorization`; either may carry the
/// raw key or `Bearer <key>`.
fn api_key_matches(headers: &HeaderMap, expected: &str) -> bool {
    let Some(presented) = header_text(headers, "x-api-key")
        .or_else(|| header_text(headers, header::AUTHORIZATION.as_str()))
    else {
        return false;
    };

    let token = presented.strip_prefix("Bearer ").unwrap_or(presented);

    // Constant-time comparison to prevent timing attacks on the key.
    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    token_bytes.len() == expected_bytes.len() && token_bytes.ct_eq(expected_bytes).unwrap_u8() == 1
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
