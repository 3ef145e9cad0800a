use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::{self, Authenticator, SessionStore, StaticCredentials};
use crate::config::AppConfig;
use crate::desk::{DeskError, FormDesk};
use crate::downloader;
use crate::entry::{EntryField, FieldError};
use crate::export::{ExportPayload, export_filename, export_stem};
use crate::form::{FormError, HeaderField};
use crate::inspection::{CheckStatus, InspectionError, InspectionForm};
use crate::saving;
use crate::specs::{SpecError, SpecField, TargetSpecifications};
use crate::submit::{SubmitError, Submission, WorkflowClient};
use crate::summary::FormSummary;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct AppState {
    pub config: AppConfig,
    pub desk: Mutex<FormDesk>,
    pub inspection: Mutex<InspectionForm>,
    pub sessions: SessionStore,
    pub authenticator: Box<dyn Authenticator>,
    pub workflow: WorkflowClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let authenticator = StaticCredentials::new(&config.username, &config.password)?;
        Self::with_authenticator(config, Box::new(authenticator))
    }

    pub fn with_authenticator(
        config: AppConfig,
        authenticator: Box<dyn Authenticator>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            desk: Mutex::new(FormDesk::new(config.max_forms)),
            inspection: Mutex::new(InspectionForm::new()),
            sessions: SessionStore::new(config.session_ttl),
            workflow: WorkflowClient::new(&config)?,
            authenticator,
            config,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Desk(#[from] DeskError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Inspection(#[from] InspectionError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("export failed: {0}")]
    Export(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Form(e) => match e {
                FormError::NoSuchRow(_) => StatusCode::NOT_FOUND,
                FormError::RowLocked { .. }
                | FormError::LockedRowRemoval(_)
                | FormError::TargetSpecsIncomplete(_)
                | FormError::IncompleteRow { .. }
                | FormError::LastRemainingRow => StatusCode::CONFLICT,
                FormError::ConfirmationRequired(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FormError::MissingHeaderFields(_)
                | FormError::UnknownHeaderField(_)
                | FormError::InvalidDate(_)
                | FormError::InvalidValue { .. }
                | FormError::Spec(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::Desk(e) => match e {
                DeskError::DeskFull(_) | DeskError::LastForm => StatusCode::CONFLICT,
                DeskError::ConfirmationRequired(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DeskError::NoSuchForm(_) => StatusCode::NOT_FOUND,
            },
            ApiError::Field(_) | ApiError::Spec(_) => StatusCode::BAD_REQUEST,
            ApiError::Submit(e) => match e {
                SubmitError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                SubmitError::MissingHeader(_) => StatusCode::BAD_REQUEST,
                SubmitError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
                SubmitError::Http(_) | SubmitError::Status { .. } => StatusCode::BAD_GATEWAY,
            },
            ApiError::Inspection(e) => match e {
                InspectionError::NoSuchHour(_) | InspectionError::NoSuchCheckpoint(_) => {
                    StatusCode::NOT_FOUND
                }
                InspectionError::InvalidStatus(_) | InspectionError::MissingHeaderFields(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
            ApiError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiError::Io(_) | ApiError::Json(_) | ApiError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            debug!("rejected request: {}", self);
        }
        (
            status,
            Json(json!({ "status": "error", "message": self.to_string() })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;
type SharedState = State<Arc<AppState>>;

#[derive(Deserialize)]
struct FieldUpdate {
    field: String,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct SpecUpdate {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct ScanRequest {
    payload: String,
}

#[derive(Deserialize)]
struct ConfirmQuery {
    #[serde(default)]
    confirm: bool,
}

#[derive(Deserialize)]
struct InspectionHeader {
    facility: Option<String>,
    date: Option<NaiveDate>,
    shift: Option<String>,
    inspector: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectionUpdate {
    checkpoint: Option<usize>,
    status: Option<String>,
    comments: Option<String>,
    inspector_initials: Option<String>,
}

/// Everything the form page needs to render one tab.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormView<'a> {
    name: String,
    can_add_entry: bool,
    can_remove_last_entry: bool,
    specs_complete: bool,
    missing_header_fields: Vec<&'static str>,
    #[serde(flatten)]
    form: ExportPayload<'a>,
}

fn form_view(desk: &FormDesk, id: &str) -> ApiResult<Value> {
    let form = desk.get(id)?;
    let view = FormView {
        name: desk.name_of(id)?,
        can_add_entry: form.can_add_entry(),
        can_remove_last_entry: form.can_remove_last_entry(),
        specs_complete: form.target_specs.is_complete(),
        missing_header_fields: form.missing_header_fields(),
        form: ExportPayload::new(form),
    };
    Ok(serde_json::to_value(view)?)
}

fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename*=UTF-8''{}",
                    urlencoding::encode(filename)
                ),
            ),
        ],
        body,
    )
        .into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(serve_landing))
        .route("/api/forms", get(list_forms).post(open_form))
        .route("/api/forms/:id", get(get_form).delete(close_form))
        .route("/api/forms/:id/activate", post(activate_form))
        .route("/api/forms/:id/header", put(update_header))
        .route("/api/forms/:id/specs", put(replace_specs))
        .route("/api/forms/:id/specs/:field", put(update_spec))
        .route("/api/forms/:id/scan", post(scan_specs))
        .route("/api/forms/:id/entries", post(add_entry))
        .route(
            "/api/forms/:id/entries/:row",
            put(edit_entry).delete(remove_entry),
        )
        .route("/api/forms/:id/summary", get(form_summary))
        .route("/api/forms/:id/export", get(export_json))
        .route("/api/forms/:id/export.csv", get(export_csv))
        .route("/api/forms/:id/export.xlsx", get(export_xlsx))
        .route("/api/forms/:id/submit", post(submit_form))
        .route("/api/forms/:id/reset", post(reset_form))
        .route("/api/forms/:id/draft", post(save_draft))
        .route("/api/drafts", get(list_drafts))
        .route("/api/drafts/:draft/open", post(open_draft))
        .route("/api/inspection", get(get_inspection))
        .route("/api/inspection/header", put(update_inspection_header))
        .route("/api/inspection/hours/:hour", put(update_inspection_hour))
        .route("/api/inspection/save", post(save_inspection))
        .route("/api/inspection/reset", post(reset_inspection))
        .route("/api/inspection/export", get(export_inspection))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route(
            "/login",
            get(auth::serve_login_page).post(auth::handle_login),
        )
        .route(
            "/logout",
            get(auth::handle_logout).post(auth::handle_logout),
        )
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    if config.submit_url.is_none() {
        warn!("PRODLOG_SUBMIT_URL is not set; form submission is disabled");
    }
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/landing.html"))
}

async fn list_forms(State(state): SharedState) -> Json<Value> {
    let desk = lock(&state.desk);
    Json(json!({
        "forms": desk.tabs(),
        "maxForms": desk.max_forms(),
    }))
}

async fn open_form(State(state): SharedState) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut desk = lock(&state.desk);
    let id = desk.open()?;
    Ok((StatusCode::CREATED, Json(form_view(&desk, &id)?)))
}

async fn get_form(State(state): SharedState, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let desk = lock(&state.desk);
    Ok(Json(form_view(&desk, &id)?))
}

async fn close_form(
    State(state): SharedState,
    Path(id): Path<String>,
    Query(query): Query<ConfirmQuery>,
) -> ApiResult<Json<Value>> {
    let mut desk = lock(&state.desk);
    desk.close(&id, query.confirm)?;
    Ok(Json(json!({ "status": "ok", "forms": desk.tabs() })))
}

async fn activate_form(
    State(state): SharedState,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut desk = lock(&state.desk);
    desk.activate(&id)?;
    Ok(Json(form_view(&desk, &id)?))
}

async fn update_header(
    State(state): SharedState,
    Path(id): Path<String>,
    Json(update): Json<FieldUpdate>,
) -> ApiResult<Json<Value>> {
    let field = HeaderField::from_name(&update.field)?;
    let mut desk = lock(&state.desk);
    let form = desk.get_mut(&id)?;
    form.set_header_field(field, &update.value)?;
    let new_id = form.id.clone();
    Ok(Json(form_view(&desk, &new_id)?))
}

async fn replace_specs(
    State(state): SharedState,
    Path(id): Path<String>,
    Json(specs): Json<TargetSpecifications>,
) -> ApiResult<Json<Value>> {
    let mut desk = lock(&state.desk);
    desk.get_mut(&id)?.set_target_specs(specs);
    Ok(Json(form_view(&desk, &id)?))
}

async fn update_spec(
    State(state): SharedState,
    Path((id, field)): Path<(String, String)>,
    Json(update): Json<SpecUpdate>,
) -> ApiResult<Json<Value>> {
    let field = SpecField::from_name(&field).ok_or_else(|| SpecError::UnknownField(field.clone()))?;
    let mut desk = lock(&state.desk);
    desk.get_mut(&id)?
        .target_specs
        .set_from_input(field, &update.value)?;
    Ok(Json(form_view(&desk, &id)?))
}

async fn scan_specs(
    State(state): SharedState,
    Path(id): Path<String>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Json<Value>> {
    let mut desk = lock(&state.desk);
    desk.get_mut(&id)?.apply_qr_payload(&request.payload)?;
    Ok(Json(form_view(&desk, &id)?))
}

async fn edit_entry(
    State(state): SharedState,
    Path((id, row)): Path<(String, usize)>,
    Json(update): Json<FieldUpdate>,
) -> ApiResult<Json<Value>> {
    let field = EntryField::from_name(&update.field)?;
    let mut desk = lock(&state.desk);
    desk.get_mut(&id)?.edit_entry(row, field, &update.value)?;
    Ok(Json(form_view(&desk, &id)?))
}

/// Adds a row. When configured, the form is first submitted silently; a failed
/// submission is logged and the row is still added.
async fn add_entry(State(state): SharedState, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let pending = {
        let desk = lock(&state.desk);
        let form = desk.get(&id)?;
        form.ensure_can_add()?;
        if state.config.submit_on_add && state.workflow.is_configured() {
            match Submission::prepare(form) {
                Ok(submission) => Some(submission),
                Err(e) => {
                    debug!("form {} not submitted before new row: {}", id, e);
                    None
                }
            }
        } else {
            None
        }
    };

    if let Some(submission) = pending {
        if let Err(e) = state.workflow.submit(&submission).await {
            warn!("submission before new row on form {} failed: {}", id, e);
        }
    }

    let mut desk = lock(&state.desk);
    desk.get_mut(&id)?.add_entry()?;
    Ok(Json(form_view(&desk, &id)?))
}

async fn remove_entry(
    State(state): SharedState,
    Path((id, row)): Path<(String, usize)>,
    Query(query): Query<ConfirmQuery>,
) -> ApiResult<Json<Value>> {
    let mut desk = lock(&state.desk);
    desk.get_mut(&id)?.remove_entry(row, query.confirm)?;
    Ok(Json(form_view(&desk, &id)?))
}

async fn form_summary(
    State(state): SharedState,
    Path(id): Path<String>,
) -> ApiResult<Json<FormSummary>> {
    let desk = lock(&state.desk);
    Ok(Json(FormSummary::compute(desk.get(&id)?)))
}

async fn export_json(State(state): SharedState, Path(id): Path<String>) -> ApiResult<Response> {
    let desk = lock(&state.desk);
    let form = desk.get(&id)?;
    let body = ExportPayload::new(form).to_json_pretty()?;
    info!("form {} exported", form.id);
    Ok(attachment(
        "application/json",
        &export_filename(form),
        body.into_bytes(),
    ))
}

async fn export_csv(State(state): SharedState, Path(id): Path<String>) -> ApiResult<Response> {
    let desk = lock(&state.desk);
    let form = desk.get(&id)?;
    let csv = downloader::to_csv(form).map_err(|e| ApiError::Export(e.to_string()))?;
    Ok(attachment(
        "text/csv; charset=utf-8",
        &format!("{}.csv", export_stem(form)),
        csv.into_bytes(),
    ))
}

async fn export_xlsx(State(state): SharedState, Path(id): Path<String>) -> ApiResult<Response> {
    let desk = lock(&state.desk);
    let form = desk.get(&id)?;
    let bytes = downloader::to_xlsx(form).map_err(|e| ApiError::Export(e.to_string()))?;
    Ok(attachment(
        XLSX_CONTENT_TYPE,
        &format!("{}.xlsx", export_stem(form)),
        bytes,
    ))
}

async fn submit_form(State(state): SharedState, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let submission = {
        let desk = lock(&state.desk);
        Submission::prepare(desk.get(&id)?)?
    };
    state.workflow.submit(&submission).await?;
    Ok(Json(json!({
        "status": "ok",
        "message": format!("Form {} has been saved.", submission.form_id),
    })))
}

async fn reset_form(State(state): SharedState, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let mut desk = lock(&state.desk);
    desk.get_mut(&id)?.reset();
    Ok(Json(form_view(&desk, &id)?))
}

async fn save_draft(State(state): SharedState, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let desk = lock(&state.desk);
    let form = desk.get(&id)?;
    std::fs::create_dir_all(&state.config.draft_dir)?;
    saving::save_form(form, saving::draft_path(&state.config.draft_dir, &form.id))?;
    info!("draft of form {} saved", form.id);
    Ok(Json(json!({ "status": "ok", "draft": saving::draft_id(&form.id) })))
}

async fn list_drafts(State(state): SharedState) -> ApiResult<Json<Value>> {
    let drafts = saving::list_drafts(&state.config.draft_dir)?;
    Ok(Json(json!({ "drafts": drafts })))
}

async fn open_draft(
    State(state): SharedState,
    Path(draft): Path<String>,
) -> ApiResult<Json<Value>> {
    let form = saving::load_form(saving::draft_path(&state.config.draft_dir, &draft))?;
    let id = form.id.clone();

    let mut desk = lock(&state.desk);
    if desk.get(&id).is_ok() {
        *desk.get_mut(&id)? = form;
        desk.activate(&id)?;
    } else {
        desk.insert(form)?;
    }
    Ok(Json(form_view(&desk, &id)?))
}

fn inspection_view(form: &InspectionForm) -> Value {
    json!({
        "form": form,
        "summary": form.summary(),
        "exportFilename": form.export_filename(),
    })
}

async fn get_inspection(State(state): SharedState) -> Json<Value> {
    let form = lock(&state.inspection);
    Json(inspection_view(&form))
}

async fn update_inspection_header(
    State(state): SharedState,
    Json(update): Json<InspectionHeader>,
) -> Json<Value> {
    let mut form = lock(&state.inspection);
    if let Some(facility) = update.facility {
        form.facility = facility.trim().to_string();
    }
    if let Some(date) = update.date {
        form.date = date;
    }
    if let Some(shift) = update.shift {
        form.shift = shift.trim().to_string();
    }
    if let Some(inspector) = update.inspector {
        form.inspector = inspector.trim().to_string();
    }
    Json(inspection_view(&form))
}

async fn update_inspection_hour(
    State(state): SharedState,
    Path(hour): Path<usize>,
    Json(update): Json<InspectionUpdate>,
) -> ApiResult<Json<Value>> {
    let mut form = lock(&state.inspection);
    if let Some(checkpoint) = update.checkpoint {
        let status: CheckStatus = update.status.as_deref().unwrap_or("na").parse()?;
        form.set_check(hour, checkpoint, status)?;
    }
    if let Some(comments) = update.comments {
        form.set_comments(hour, &comments)?;
    }
    if let Some(initials) = update.inspector_initials {
        form.set_initials(hour, &initials)?;
    }
    Ok(Json(inspection_view(&form)))
}

async fn save_inspection(State(state): SharedState) -> ApiResult<Json<Value>> {
    let form = lock(&state.inspection);
    form.save()?;
    Ok(Json(json!({
        "status": "ok",
        "message": "Inspection form has been saved.",
        "summary": form.summary(),
    })))
}

async fn reset_inspection(State(state): SharedState) -> Json<Value> {
    let mut form = lock(&state.inspection);
    form.reset();
    Json(inspection_view(&form))
}

async fn export_inspection(State(state): SharedState) -> ApiResult<Response> {
    let form = lock(&state.inspection);
    let body = serde_json::to_string_pretty(&*form)?;
    Ok(attachment(
        "application/json",
        &form.export_filename(),
        body.into_bytes(),
    ))
}
