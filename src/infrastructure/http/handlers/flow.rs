//! Flow Handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::{
    CloseFlowCommand, CloseFlowResponse, FlowView, GetCatalogQuery, GetFlowQuery, NavigateCommand,
    Navigation, ResetFlowCommand, SelectAnswerCommand, StartFlowCommand, SubmitFlowCommand,
    SubmitFlowResponse, ToggleMultiSelectCommand,
};
use crate::domain::flow::{AnswerValue, StepCatalog};
use crate::infrastructure::http::dto::{ApiResponse, FlowIdRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

type FlowResult = Result<Json<ApiResponse<FlowView>>, ApiError>;

// ============================================================================
// Catalog / Start / Get
// ============================================================================

pub async fn get_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Arc<StepCatalog>>>, ApiError> {
    let catalog = state.get_catalog_handler.handle(GetCatalogQuery).await?;
    Ok(Json(ApiResponse::success(catalog)))
}

pub async fn start_flow(State(state): State<Arc<AppState>>) -> FlowResult {
    let view = state.start_flow_handler.handle(StartFlowCommand).await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn get_flow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FlowIdRequest>,
) -> FlowResult {
    let view = state
        .get_flow_handler
        .handle(GetFlowQuery {
            flow_id: req.flow_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

// ============================================================================
// Answers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub flow_id: String,
    pub step_id: String,
    pub value: AnswerValue,
}

pub async fn answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> FlowResult {
    let cmd = SelectAnswerCommand {
        flow_id: req.flow_id,
        step_id: req.step_id,
        value: req.value,
    };
    let view = state.select_answer_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub flow_id: String,
    pub step_id: String,
    pub value: String,
}

pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ToggleRequest>,
) -> FlowResult {
    let cmd = ToggleMultiSelectCommand {
        flow_id: req.flow_id,
        step_id: req.step_id,
        value: req.value,
    };
    let view = state.toggle_multi_select_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(view)))
}

// ============================================================================
// Navigation
// ============================================================================

async fn navigate(state: &AppState, flow_id: String, navigation: Navigation) -> FlowResult {
    let view = state
        .navigate_handler
        .handle(NavigateCommand {
            flow_id,
            navigation,
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn next(State(state): State<Arc<AppState>>, Json(req): Json<FlowIdRequest>) -> FlowResult {
    navigate(&state, req.flow_id, Navigation::Next).await
}

pub async fn previous(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FlowIdRequest>,
) -> FlowResult {
    navigate(&state, req.flow_id, Navigation::Previous).await
}

pub async fn skip(State(state): State<Arc<AppState>>, Json(req): Json<FlowIdRequest>) -> FlowResult {
    navigate(&state, req.flow_id, Navigation::Skip).await
}

// ============================================================================
// Reset / Submit / Close
// ============================================================================

pub async fn reset_flow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FlowIdRequest>,
) -> FlowResult {
    let view = state
        .reset_flow_handler
        .handle(ResetFlowCommand {
            flow_id: req.flow_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn submit_flow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FlowIdRequest>,
) -> Result<Json<ApiResponse<SubmitFlowResponse>>, ApiError> {
    let result = state
        .submit_flow_handler
        .handle(SubmitFlowCommand {
            flow_id: req.flow_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Deserialize)]
pub struct CloseFlowRequest {
    pub flow_id: String,
    #[serde(default = "default_close_reason")]
    pub reason: String,
}

fn default_close_reason() -> String {
    "client_closed".to_string()
}

pub async fn close_flow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CloseFlowRequest>,
) -> Result<Json<ApiResponse<CloseFlowResponse>>, ApiError> {
    let result = state
        .close_flow_handler
        .handle(CloseFlowCommand {
            flow_id: req.flow_id,
            reason: req.reason,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
