//! Tool adapter endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    tools::{self, ToolDefinition, ToolInvocation, ToolOutput},
};

/// List available tools with their input schemas
#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    responses(
        (status = 200, description = "Tool definitions", body = Vec<ToolDefinition>)
    )
)]
pub async fn list_tools() -> Json<Vec<ToolDefinition>> {
    Json(tools::tool_definitions())
}

/// Invoke a tool by name
#[utoipa::path(
    post,
    path = "/tools/call",
    tag = "tools",
    request_body = ToolInvocation,
    responses(
        (status = 200, description = "Tool result", body = ToolOutput),
        (status = 400, description = "Unknown tool or invalid arguments", body = crate::error::ErrorResponse),
        (status = 404, description = "Referenced entity not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Operation refused", body = crate::error::ErrorResponse)
    )
)]
pub async fn call_tool(
    State(state): State<crate::AppState>,
    Json(invocation): Json<ToolInvocation>,
) -> AppResult<Json<ToolOutput>> {
    let output = tools::call_tool(&state.engine, invocation).await?;
    Ok(Json(output))
}
