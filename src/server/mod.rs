//! HTTP 服务器模块
//!
//! 提供最大流运行、算法对比、最小割、图校验和回放查询的 REST API。
//! 服务无状态：每个请求都携带完整的图或事件日志。

use crate::algorithm::{
    compare_algorithms, compute_min_cut, run_max_flow, AlgorithmId, MinCut, RunOptions,
    RunResult, DEFAULT_MAX_STEPS,
};
use crate::error::{Error, Result};
use crate::event::FlowEvent;
use crate::graph::{EdgeId, Graph, NodeId};
use crate::metrics::{AlgorithmSummary, RunMetrics};
use crate::playback::{build_cache, state_at, PlaybackState, DEFAULT_SNAPSHOT_INTERVAL};
use crate::types::Capacity;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求未指定时的步数上限，也是请求可指定的最大值
    pub max_steps: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    fn run_options(&self, max_steps: Option<u64>) -> RunOptions {
        let limit = self.config.max_steps;
        RunOptions::new().with_max_steps(max_steps.map_or(limit, |steps| steps.min(limit)))
    }
}

/// 构建路由
pub fn router(config: ServerConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/algorithms", get(list_algorithms))
        // 算法
        .route("/algorithm/max-flow", post(max_flow))
        .route("/algorithm/compare", post(compare))
        .route("/algorithm/min-cut", post(min_cut))
        // 图与回放
        .route("/graph/validate", post(validate_graph))
        .route("/playback/state", post(playback_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 启动服务器
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(config);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::ServerError(format!("绑定地址失败: {}", e)))?;
    info!("FlowLab 服务器启动于 http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::ServerError(format!("服务器错误: {}", e)))?;

    Ok(())
}

// ==================== 处理器 ====================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 算法描述
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmInfo {
    pub id: AlgorithmId,
    pub label: &'static str,
    pub short_label: &'static str,
    pub description: &'static str,
}

async fn list_algorithms() -> Response {
    let algorithms: Vec<AlgorithmInfo> = AlgorithmId::ALL
        .iter()
        .map(|&id| AlgorithmInfo {
            id,
            label: id.label(),
            short_label: id.short_label(),
            description: id.description(),
        })
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(algorithms))).into_response()
}

/// 最大流请求
#[derive(Debug, Deserialize)]
pub struct MaxFlowRequest {
    #[serde(default)]
    pub algorithm: AlgorithmId,
    pub graph: Graph,
    #[serde(default)]
    pub max_steps: Option<u64>,
}

/// 最大流响应：运行结果加统计
#[derive(Debug, Serialize)]
pub struct MaxFlowResponse {
    #[serde(flatten)]
    pub result: RunResult,
    pub metrics: RunMetrics,
}

async fn max_flow(State(state): State<AppState>, Json(req): Json<MaxFlowRequest>) -> Response {
    let options = state.run_options(req.max_steps);
    let algorithm = req.algorithm;
    let graph = req.graph;

    let joined = tokio::task::spawn_blocking(move || run_max_flow(algorithm, &graph, &options)).await;
    match joined {
        Ok(result) => {
            let metrics = RunMetrics::from_events(&result.events);
            (
                StatusCode::OK,
                Json(ApiResponse::success(MaxFlowResponse { result, metrics })),
            )
                .into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// 对比请求
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub graph: Graph,
    #[serde(default)]
    pub max_steps: Option<u64>,
}

/// 对比响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    /// 三种算法的最大流值与割容量是否全部一致
    pub agreed: bool,
    pub summaries: Vec<AlgorithmSummary>,
}

async fn compare(State(state): State<AppState>, Json(req): Json<CompareRequest>) -> Response {
    let options = state.run_options(req.max_steps);
    let graph = req.graph;

    let joined = tokio::task::spawn_blocking(move || compare_algorithms(&graph, &options)).await;
    match joined {
        Ok(results) => {
            let summaries: Vec<AlgorithmSummary> =
                results.iter().map(AlgorithmSummary::from).collect();
            let agreed = summaries.windows(2).all(|pair| {
                pair[0].max_flow_value == pair[1].max_flow_value
                    && pair[0].cut_capacity == pair[1].cut_capacity
            });
            if !agreed {
                warn!("算法结果不一致");
            }
            (
                StatusCode::OK,
                Json(ApiResponse::success(CompareResponse { agreed, summaries })),
            )
                .into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// 最小割请求：按图中当前流量计算
#[derive(Debug, Deserialize)]
pub struct MinCutRequest {
    pub graph: Graph,
    /// 缺省时使用图中的源点
    #[serde(default)]
    pub source: Option<NodeId>,
}

async fn min_cut(Json(req): Json<MinCutRequest>) -> Response {
    let source = match req.source.or_else(|| req.graph.source_sink().source) {
        Some(source) => source,
        None => return bad_request(&Error::InvalidGraph("缺少源点".to_string())),
    };
    if !req.graph.contains_node(source.as_str()) {
        return bad_request(&Error::NodeNotFound(source.to_string()));
    }

    let cut: MinCut = compute_min_cut(&req.graph, source.as_str());
    (StatusCode::OK, Json(ApiResponse::success(cut))).into_response()
}

/// 校验请求
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub graph: Graph,
}

/// 校验结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<NodeId>,
    /// 源点到汇点是否存在正容量路径
    pub has_path: bool,
}

async fn validate_graph(Json(req): Json<ValidateRequest>) -> Response {
    let graph = req.graph;
    let errors = graph.validation_errors();
    let endpoints = graph.source_sink();
    let has_path = match (&endpoints.source, &endpoints.sink) {
        (Some(source), Some(sink)) => graph.has_path_candidate(source.as_str(), sink.as_str()),
        _ => false,
    };

    let response = ValidateResponse {
        valid: errors.is_empty(),
        errors,
        source: endpoints.source,
        sink: endpoints.sink,
        has_path,
    };
    (StatusCode::OK, Json(ApiResponse::success(response))).into_response()
}

/// 回放查询请求
#[derive(Debug, Deserialize)]
pub struct PlaybackRequest {
    pub events: Vec<FlowEvent>,
    #[serde(default)]
    pub initial_flows: BTreeMap<EdgeId, Capacity>,
    #[serde(default)]
    pub interval: Option<usize>,
    pub cursor: i64,
}

async fn playback_state(Json(req): Json<PlaybackRequest>) -> Response {
    let initial = PlaybackState::initial(req.initial_flows);
    let interval = req.interval.unwrap_or(DEFAULT_SNAPSHOT_INTERVAL);
    let cache = build_cache(&req.events, &initial, interval);
    let state = state_at(&req.events, &cache, req.cursor);
    (StatusCode::OK, Json(ApiResponse::success(state))).into_response()
}

fn bad_request(err: &Error) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(&err.to_string())),
    )
        .into_response()
}

fn internal_error(err: tokio::task::JoinError) -> Response {
    warn!(error = %err, "计算任务失败");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error(&format!("计算任务失败: {}", err))),
    )
        .into_response()
}

// ==================== 响应类型 ====================

/// API 响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};
    use serde_json::Value;

    fn state() -> AppState {
        AppState {
            config: Arc::new(ServerConfig::default()),
        }
    }

    fn diamond() -> Graph {
        let mut graph = Graph::default();
        graph.add_node(Node::source("s")).unwrap();
        graph.add_node(Node::normal("a")).unwrap();
        graph.add_node(Node::normal("b")).unwrap();
        graph.add_node(Node::sink("t")).unwrap();
        graph.add_edge(Edge::new("e1", "s", "a", 6)).unwrap();
        graph.add_edge(Edge::new("e2", "s", "b", 4)).unwrap();
        graph.add_edge(Edge::new("e3", "a", "b", 2)).unwrap();
        graph.add_edge(Edge::new("e4", "a", "t", 4)).unwrap();
        graph.add_edge(Edge::new("e5", "b", "t", 6)).unwrap();
        graph
    }

    async fn body_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_list_algorithms() {
        let (status, body) = body_json(list_algorithms().await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][2]["id"], "push-relabel");
        assert_eq!(body["data"][0]["shortLabel"], "EK");
    }

    #[tokio::test]
    async fn test_max_flow_handler() {
        let req = MaxFlowRequest {
            algorithm: AlgorithmId::Dinic,
            graph: diamond(),
            max_steps: None,
        };
        let (status, body) = body_json(max_flow(State(state()), Json(req)).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["algorithm"], "dinic");
        assert_eq!(body["data"]["maxFlowValue"], 10);
        assert_eq!(body["data"]["events"][0]["type"], "ALGORITHM_SELECTED");
        assert!(body["data"]["metrics"]["phases"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_max_flow_request_from_json() {
        let json = serde_json::json!({
            "algorithm": "push-relabel",
            "graph": diamond(),
            "max_steps": 1
        });
        let req: MaxFlowRequest = serde_json::from_value(json).unwrap();
        let (_, body) = body_json(max_flow(State(state()), Json(req)).await).await;
        let events = body["data"]["events"].as_array().unwrap();
        assert!(events.iter().any(|e| e["type"] == "ERROR"));
    }

    #[test]
    fn test_request_max_steps_is_clamped() {
        let state = AppState {
            config: Arc::new(ServerConfig {
                max_steps: 100,
                ..ServerConfig::default()
            }),
        };
        assert_eq!(state.run_options(None).max_steps, 100);
        assert_eq!(state.run_options(Some(7)).max_steps, 7);
        assert_eq!(state.run_options(Some(u64::MAX)).max_steps, 100);
    }

    #[tokio::test]
    async fn test_compare_handler() {
        let req = CompareRequest {
            graph: diamond(),
            max_steps: None,
        };
        let (status, body) = body_json(compare(State(state()), Json(req)).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["agreed"], true);
        assert_eq!(body["data"]["summaries"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_min_cut_handler() {
        let result = run_max_flow(AlgorithmId::EdmondsKarp, &diamond(), &RunOptions::new());
        let req = MinCutRequest {
            graph: result.graph,
            source: None,
        };
        let (status, body) = body_json(min_cut(Json(req)).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cutCapacity"], 10);

        let req = MinCutRequest {
            graph: diamond(),
            source: Some(NodeId::from("missing")),
        };
        let (status, body) = body_json(min_cut(Json(req)).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_validate_handler() {
        let mut graph = diamond();
        graph.add_node(Node::source("s2")).unwrap();
        let (_, body) = body_json(validate_graph(Json(ValidateRequest { graph })).await).await;
        assert_eq!(body["data"]["valid"], false);
        assert_eq!(body["data"]["hasPath"], true);
        assert!(!body["data"]["errors"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_playback_handler() {
        let graph = diamond();
        let result = run_max_flow(AlgorithmId::EdmondsKarp, &graph, &RunOptions::new());
        let last = result.events.len() as i64 - 1;
        let req = PlaybackRequest {
            events: result.events.clone(),
            initial_flows: graph.flows(),
            interval: Some(4),
            cursor: last + 10,
        };
        let (status, body) = body_json(playback_state(Json(req)).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["cursor"], last);
        assert_eq!(body["data"]["currentMaxFlow"], 10);
        assert_eq!(body["data"]["isRunning"], false);
    }

    #[test]
    fn test_router_builds() {
        let _ = router(ServerConfig::default());
    }
}
