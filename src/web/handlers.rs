//! HTTP request handlers

use super::state::AppState;
use crate::error::{Result, SearchError};
use crate::export::ExportFormat;
use crate::filter::FilterSpec;
use crate::query::{QueryDescriptor, QueryParams, Region, ResultKind, SafeSearch, TimeRange, TimeWindow};
use crate::results::{Cell, ResultRecord, ResultTable};
use crate::search::{self, build_query};
use crate::session::{Session, SessionState, SharedSession};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tera::Context;
use tracing::{error, warn};

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "duck_session";

/// Query parameters for `/search`
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(flatten)]
    pub query: QueryParams,
    /// Output format, `json` or HTML
    pub format: Option<String>,
}

/// Query parameters for `/filter`
#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub terms: Option<String>,
    /// Checkbox value; `on`, `true` and `1` enable case-sensitive matching
    pub case_sensitive: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    /// `csv` or `xlsx`; the configured default otherwise
    pub format: Option<String>,
}

/// Stored table as shown to the user
#[derive(Debug, Serialize)]
pub struct TableView {
    pub kind: ResultKind,
    pub kind_label: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<String>>,
    pub records: Vec<ResultRecord>,
    /// Rows before filtering
    pub total: usize,
}

impl TableView {
    fn new(table: &ResultTable, total: usize) -> Self {
        Self {
            kind: table.kind(),
            kind_label: table.kind().label(),
            columns: table.columns(),
            rows: table
                .rows()
                .map(|row| row.iter().map(|cell| cell.as_filter_text().to_string()).collect())
                .collect(),
            records: table.records().to_vec(),
            total,
        }
    }
}

/// A table cell on the results page; only link columns become anchors
#[derive(Debug, Serialize)]
struct CellView {
    text: String,
    href: Option<String>,
}

impl CellView {
    fn new(cell: &Cell<'_>) -> Self {
        let href = match cell {
            Cell::Link(link) if !link.is_empty() => Some(link.to_string()),
            _ => None,
        };
        Self {
            text: cell.as_filter_text().to_string(),
            href,
        }
    }
}

fn cell_views(table: &ResultTable) -> Vec<Vec<CellView>> {
    table
        .rows()
        .map(|row| row.iter().map(CellView::new).collect())
        .collect()
}

/// Everything a page or JSON client needs to know about a session
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub query: Option<QueryDescriptor>,
    pub filter: Option<FilterSpec>,
    pub table: Option<TableView>,
    pub notices: Vec<String>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl SessionView {
    fn new(session: &Session) -> Self {
        let total = session.table().map_or(0, ResultTable::len);
        Self {
            state: session.state(),
            query: session.query().cloned(),
            filter: session.filter().cloned(),
            table: session.current_table().map(|table| TableView::new(table, total)),
            notices: session.notices().iter().map(ToString::to_string).collect(),
            warnings: session.warnings().to_vec(),
            error: session.last_error().map(str::to_string),
        }
    }
}

/// Values pre-filled in the search form
#[derive(Debug, Serialize)]
struct FormView {
    keyword: String,
    and_keywords: String,
    exclude_keywords: String,
    kind: ResultKind,
    region: Region,
    safesearch: SafeSearch,
    time_range: Option<TimeRange>,
    start: Option<String>,
    end: Option<String>,
    max_results: u32,
}

impl FormView {
    fn new(state: &AppState, query: Option<&QueryDescriptor>) -> Self {
        let defaults = &state.settings.search;
        let Some(query) = query else {
            return Self {
                keyword: defaults.default_keyword.clone(),
                and_keywords: String::new(),
                exclude_keywords: String::new(),
                kind: defaults.kind,
                region: defaults.region,
                safesearch: defaults.safesearch,
                time_range: None,
                start: None,
                end: None,
                max_results: defaults.max_results,
            };
        };

        let (time_range, start, end) = match query.time_window {
            Some(TimeWindow::Relative(range)) => (Some(range), None, None),
            Some(TimeWindow::Explicit { start, end }) => {
                (None, Some(start.to_string()), Some(end.to_string()))
            }
            None => (None, None, None),
        };

        Self {
            keyword: query.keyword.clone(),
            and_keywords: query.and_keywords.join(" "),
            exclude_keywords: query.exclude_keywords.join(" "),
            kind: query.kind,
            region: query.region,
            safesearch: query.safety,
            time_range,
            start,
            end,
            max_results: query.max_results,
        }
    }
}

#[derive(Debug, Serialize)]
struct KindOption {
    value: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct ExportOption {
    value: &'static str,
    label: &'static str,
}

/// The caller's session and whether it was just created
struct SessionHandle {
    id: String,
    session: SharedSession,
    created: bool,
}

impl SessionHandle {
    /// Attach the session cookie when the session is new
    fn with_cookie(&self, mut response: Response) -> Response {
        if self.created {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, self.id
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

/// Session id from the `Cookie` header
fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

async fn session_for(state: &AppState, headers: &HeaderMap) -> SessionHandle {
    let (id, session, created) = state.sessions.get_or_create(session_cookie(headers)).await;
    SessionHandle {
        id,
        session,
        created,
    }
}

fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.eq_ignore_ascii_case("json"))
}

fn is_checked(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("on" | "true" | "1" | "yes")
    )
}

/// HTTP status for an error surfaced to the client
fn error_status(err: &SearchError) -> StatusCode {
    match err {
        SearchError::SessionBusy(_) => StatusCode::CONFLICT,
        SearchError::Gateway(_) => StatusCode::BAD_GATEWAY,
        err if err.is_user_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn render(state: &AppState, template: &str, ctx: &Context, status: StatusCode) -> Response {
    match state.templates.render_with_context(template, ctx) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

fn page_context(state: &AppState, session: Option<&Session>) -> Context {
    let kinds: Vec<KindOption> = ResultKind::all()
        .iter()
        .map(|kind| KindOption {
            value: kind.as_str(),
            label: kind.label(),
        })
        .collect();

    let exports: Vec<ExportOption> = ExportFormat::all()
        .iter()
        .map(|format| ExportOption {
            value: format.extension(),
            label: format.label(),
        })
        .collect();

    let mut ctx = Context::new();
    ctx.insert("instance_name", state.instance_name());
    ctx.insert("kinds", &kinds);
    ctx.insert("exports", &exports);
    ctx.insert("form", &FormView::new(state, session.and_then(Session::query)));
    ctx.insert("export_format", &state.settings.search.export_format);
    ctx.insert(
        "filter_text",
        &session.and_then(Session::filter).map(FilterSpec::text).unwrap_or_default(),
    );
    ctx
}

/// Respond with the session's current table, or with `outcome`'s error
async fn respond(
    state: &AppState,
    handle: &SessionHandle,
    json: bool,
    outcome: Result<()>,
) -> Response {
    let session = handle.session.lock().await;
    let status = match &outcome {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!("Session {}: {}", handle.id, e);
            error_status(e)
        }
    };

    let response = if json {
        match outcome {
            Ok(()) => (status, Json(SessionView::new(&session))).into_response(),
            Err(e) => (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response(),
        }
    } else {
        let mut view = SessionView::new(&session);
        if let Err(e) = outcome {
            view.error = Some(e.to_string());
        }
        let mut ctx = page_context(state, Some(&*session));
        ctx.insert("view", &view);
        ctx.insert(
            "cells",
            &session.current_table().map(cell_views).unwrap_or_default(),
        );
        render(state, "results.html", &ctx, status)
    };

    handle.with_cookie(response)
}

/// Home page handler
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let existing = match session_cookie(&headers) {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };

    let ctx = match existing {
        Some(session) => {
            let session = session.lock().await;
            let mut ctx = page_context(&state, Some(&*session));
            ctx.insert("has_results", &session.table().is_some());
            ctx
        }
        None => {
            let mut ctx = page_context(&state, None);
            ctx.insert("has_results", &false);
            ctx
        }
    };

    render(&state, "index.html", &ctx, StatusCode::OK)
}

/// Settles a session left in `searching` when the request is dropped
///
/// Hyper drops the handler future when the client goes away, so the
/// `finish_search` after the provider call may never run.
struct PendingSearch {
    session: Option<SharedSession>,
}

impl PendingSearch {
    fn new(session: &SharedSession) -> Self {
        Self {
            session: Some(session.clone()),
        }
    }

    /// The search settled normally
    fn disarm(mut self) {
        self.session = None;
    }
}

impl Drop for PendingSearch {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        if let Ok(mut session) = session.try_lock() {
            let _ = session.finish_search(Err(SearchError::Cancelled));
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let _ = session.lock().await.finish_search(Err(SearchError::Cancelled));
                });
            }
            Err(_) => warn!("Search cancelled outside a runtime, session left busy"),
        }
    }
}

/// Run a search in the caller's session
///
/// The session lock is released while the provider is queried, so other
/// requests of the same session see it in the `searching` state and a
/// second search is refused as busy.
async fn run_search(state: &AppState, session: &SharedSession, params: &QueryParams) -> Result<()> {
    let query = build_query(params, &state.settings.search)?;
    session.lock().await.begin_search(query.clone())?;
    let pending = PendingSearch::new(session);

    let outcome = state.search.execute(&query).await;

    let settled = session.lock().await.finish_search(outcome).map(|_| ());
    pending.disarm();
    settled
}

/// Search handler
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(request): Query<SearchRequest>,
) -> Response {
    let handle = session_for(&state, &headers).await;
    let outcome = run_search(&state, &handle.session, &request.query).await;
    respond(&state, &handle, wants_json(request.format.as_deref()), outcome).await
}

/// Filter the stored table
pub async fn filter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(request): Query<FilterRequest>,
) -> Response {
    let handle = session_for(&state, &headers).await;
    let spec = FilterSpec::parse(
        request.terms.as_deref().unwrap_or_default(),
        is_checked(request.case_sensitive.as_deref()),
    );

    let outcome = search::apply_filter(&mut *handle.session.lock().await, spec).map(|_| ());
    respond(&state, &handle, wants_json(request.format.as_deref()), outcome).await
}

/// Show the stored table again
pub async fn results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(request): Query<ViewRequest>,
) -> Response {
    let handle = session_for(&state, &headers).await;
    respond(&state, &handle, wants_json(request.format.as_deref()), Ok(())).await
}

/// `Content-Disposition` value for a download
///
/// Non-ASCII names are sent in `filename*` with an ASCII fallback.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

/// Download the current table
pub async fn export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(request): Query<ExportRequest>,
) -> Response {
    let handle = session_for(&state, &headers).await;

    let format = match request.format.as_deref().map(str::parse::<ExportFormat>) {
        Some(Ok(format)) => format,
        Some(Err(e)) => return respond(&state, &handle, false, Err(e)).await,
        None => state.settings.search.export_format,
    };

    let outcome = search::export_results(&mut *handle.session.lock().await, format);

    match outcome {
        Ok(file) => {
            let response = (
                [
                    (header::CONTENT_TYPE, file.mime_type.to_string()),
                    (header::CONTENT_DISPOSITION, content_disposition(&file.file_name)),
                ],
                file.bytes,
            )
                .into_response();
            handle.with_cookie(response)
        }
        Err(e) => respond(&state, &handle, false, Err(e)).await,
    }
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "gateway": state.search.gateway_name(),
        "sessions": state.sessions.size(),
    }))
}

/// Robots.txt handler
pub async fn robots_txt(State(state): State<AppState>) -> impl IntoResponse {
    let content = if state.is_public() {
        "User-agent: *\nAllow: /\nDisallow: /search\nDisallow: /filter\nDisallow: /export\n"
    } else {
        "User-agent: *\nDisallow: /\n"
    };
    ([(header::CONTENT_TYPE, "text/plain")], content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; duck_session=abc-123"),
        );
        assert_eq!(session_cookie(&headers), Some("abc-123"));

        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn test_only_link_cells_get_anchors() {
        let table = ResultTable::from_records(
            ResultKind::Text,
            vec![ResultRecord::Text(crate::results::TextRecord {
                title: "http/2 explained".to_string(),
                body: "https://not-a-link.example in prose".to_string(),
                link: crate::results::Link::parse("https://example.com/h2").unwrap(),
            })],
        )
        .unwrap();

        let cells = cell_views(&table);
        assert_eq!(cells[0][0].href, None);
        assert_eq!(cells[0][1].href, None);
        assert_eq!(cells[0][2].href.as_deref(), Some("https://example.com/h2"));
        assert_eq!(cells[0][0].text, "http/2 explained");
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("rust_text_results.csv"),
            "attachment; filename=\"rust_text_results.csv\"; filename*=UTF-8''rust_text_results.csv"
        );
        assert_eq!(
            content_disposition("東京_news_results.xlsx"),
            "attachment; filename=\"__news_results.xlsx\"; filename*=UTF-8''%E6%9D%B1%E4%BA%AC_news_results.xlsx"
        );
    }

    #[test]
    fn test_error_status() {
        assert_eq!(error_status(&SearchError::NoResults), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_status(&SearchError::SessionBusy(SessionState::Searching)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&SearchError::Gateway("HTTP error: 503".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_status(&SearchError::Export("disk full".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_is_checked() {
        assert!(is_checked(Some("on")));
        assert!(is_checked(Some("TRUE")));
        assert!(!is_checked(Some("off")));
        assert!(!is_checked(None));
    }
}
