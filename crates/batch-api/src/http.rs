use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, header::REFERER},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use batch_model::ExecutionInfo;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, handler::ApiHandler};

/// Header carrying the authenticated principal, set by the fronting proxy.
pub const PRINCIPAL_HEADER: &str = "x-principal";

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    /// Create new HTTP API with the given handler.
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - POST /api/v1/projects/{project}/tasks/{task}/execute - Run a task now
    /// - GET /api/v1/projects/{project}/runs - Executions on the latest build
    pub fn router(self) -> Router {
        Router::new()
            .route(
                "/api/v1/projects/{project}/tasks/{task}/execute",
                post(execute_task::<H>),
            )
            .route("/api/v1/projects/{project}/runs", get(list_runs::<H>))
            .with_state(self.handler)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ListRunsResponse {
    runs: Vec<ExecutionInfo>,
}

/// POST /api/v1/projects/{project}/tasks/{task}/execute
///
/// Redirects back to the referring page, or to `..` without one.
async fn execute_task<H>(
    State(handler): State<Arc<H>>,
    Path((project, task)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let principal = headers
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok());
    handler.run_now(principal, &project, &task).await?;

    let target = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("..");
    Ok(Redirect::to(target))
}

/// GET /api/v1/projects/{project}/runs
async fn list_runs<H>(
    State(handler): State<Arc<H>>,
    Path(project): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let runs = handler.run_log(&project).await?;
    Ok(Json(ListRunsResponse { runs }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DispatcherAdapter;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::LOCATION},
    };
    use batch_core::{
        Dispatcher, RunLogs,
        memory::{AllowList, InMemoryBuildStore, InMemoryDirectory, RecordingQueue},
    };
    use batch_model::{BatchTaskSpec, ProjectSpec};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<RecordingQueue>) {
        let dir = Arc::new(InMemoryDirectory::new());
        dir.register(&ProjectSpec::new("team/app").with_task(BatchTaskSpec::new("deploy", "true")));
        dir.record_build("team/app", None);

        let logs = Arc::new(RunLogs::new(Arc::new(InMemoryBuildStore::new())));
        let queue = Arc::new(RecordingQueue::new());
        let dispatcher = Dispatcher::new(queue.clone(), Arc::new(AllowList::new(["admin"])));
        let handler = Arc::new(DispatcherAdapter::new(dir, logs, dispatcher));
        (HttpApi::new(handler).router(), queue)
    }

    fn execute(uri: &str, principal: Option<&str>, referer: Option<&str>) -> Request<Body> {
        let mut req = Request::post(uri);
        if let Some(p) = principal {
            req = req.header(PRINCIPAL_HEADER, p);
        }
        if let Some(r) = referer {
            req = req.header(REFERER, r);
        }
        req.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn execute_redirects_to_referer() {
        let (app, queue) = app();
        let res = app
            .oneshot(execute(
                "/api/v1/projects/team%2Fapp/tasks/deploy/execute",
                Some("admin"),
                Some("/job/team/app/batchTasks"),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/job/team/app/batchTasks");
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn execute_without_referer_goes_up() {
        let (app, _) = app();
        let res = app
            .oneshot(execute(
                "/api/v1/projects/team%2Fapp/tasks/deploy/execute",
                Some("admin"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.headers()[LOCATION], "..");
    }

    #[tokio::test]
    async fn forbidden_without_principal() {
        let (app, queue) = app();
        let res = app
            .oneshot(execute(
                "/api/v1/projects/team%2Fapp/tasks/deploy/execute",
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn unknown_task_is_not_found_with_hint() {
        let (app, _) = app();
        let res = app
            .oneshot(execute(
                "/api/v1/projects/team%2Fapp/tasks/deplyo/execute",
                Some("admin"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json["error"],
            "No such task exists: deplyo. Perhaps you meant deploy"
        );
    }

    #[tokio::test]
    async fn anonymous_caller_gets_no_task_hint() {
        let (app, queue) = app();
        let res = app
            .oneshot(execute(
                "/api/v1/projects/team%2Fapp/tasks/deplyo/execute",
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No such task exists: deplyo.");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn runs_lists_executions() {
        let (app, _) = app();
        let res = app
            .oneshot(
                Request::get("/api/v1/projects/team%2Fapp/runs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["runs"], serde_json::json!([]));
    }
}
