//! Roles API
//!
//! REST endpoints for role management and sub-role membership.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::role::entity::RoleObject;
use crate::role::service::{DeletedRole, RolePage, RoleService};
use crate::shared::api_common::{required, MessageResponse, NumberOrString};
use crate::shared::error::{ErrorResponse, PlatformError};

/// Create role request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    /// Unique role name
    pub name: Option<String>,
    /// Unique display label
    pub label: Option<String>,
}

/// Update role request. Omitted or blank fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub label: Option<String>,
}

/// Add sub-role request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddSubRoleRequest {
    pub sub_role_id: Option<String>,
}

/// Query parameters for listing roles
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RolesQuery {
    /// 1-based page number
    #[param(value_type = Option<i64>)]
    pub page: Option<NumberOrString>,
    /// Roles per page
    #[param(value_type = Option<i64>)]
    pub per_page: Option<NumberOrString>,
}

/// Roles service state
#[derive(Clone)]
pub struct RolesState {
    pub service: Arc<RoleService>,
}

impl RolesState {
    pub fn new(service: Arc<RoleService>) -> Self {
        Self { service }
    }
}

/// Body or `Bad arguments.` when it is missing or malformed.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PlatformError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(error = %rejection, "Rejected request body");
        PlatformError::bad_arguments()
    })
}

/// Create a new role
#[utoipa::path(
    post,
    path = "/",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = MessageResponse<RoleObject>),
        (status = 400, description = "Missing name or label", body = ErrorResponse),
        (status = 409, description = "Name or label already taken", body = ErrorResponse)
    )
)]
pub async fn create_role(
    State(state): State<RolesState>,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse<RoleObject>>), PlatformError> {
    let req = body(payload)?;
    let name = required(req.name)?;
    let label = required(req.label)?;

    let role = state.service.create_role(&name, &label).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::new("Role created", role))))
}

/// List roles one page at a time
#[utoipa::path(
    get,
    path = "/",
    tag = "roles",
    params(RolesQuery),
    responses(
        (status = 200, description = "Page of roles", body = RolePage),
        (status = 400, description = "Missing parameters or page out of bounds", body = ErrorResponse)
    )
)]
pub async fn list_roles(
    State(state): State<RolesState>,
    query: Result<Query<RolesQuery>, QueryRejection>,
) -> Result<Json<RolePage>, PlatformError> {
    let Query(query) = query.map_err(|_| PlatformError::bad_arguments())?;
    let page = required(query.page)?.as_i64()?;
    let per_page = required(query.per_page)?.as_i64()?;

    Ok(Json(state.service.get_roles(page, per_page).await?))
}

/// Get role by ID
#[utoipa::path(
    get,
    path = "/{roleId}",
    tag = "roles",
    params(("roleId" = String, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role found", body = RoleObject),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn get_role(
    State(state): State<RolesState>,
    Path(role_id): Path<String>,
) -> Result<Json<RoleObject>, PlatformError> {
    Ok(Json(state.service.get_role(&role_id).await?))
}

/// Update role name and/or label
#[utoipa::path(
    patch,
    path = "/{roleId}",
    tag = "roles",
    params(("roleId" = String, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = MessageResponse<RoleObject>),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Name or label already taken", body = ErrorResponse)
    )
)]
pub async fn update_role(
    State(state): State<RolesState>,
    Path(role_id): Path<String>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<MessageResponse<RoleObject>>, PlatformError> {
    let req = body(payload)?;
    let role = state
        .service
        .update_role_informations(&role_id, req.name.as_deref(), req.label.as_deref())
        .await?;
    Ok(Json(MessageResponse::new("Role updated", role)))
}

/// Delete role
#[utoipa::path(
    delete,
    path = "/{roleId}",
    tag = "roles",
    params(("roleId" = String, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse<DeletedRole>),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn delete_role(
    State(state): State<RolesState>,
    Path(role_id): Path<String>,
) -> Result<Json<MessageResponse<DeletedRole>>, PlatformError> {
    let deleted = state.service.delete_role(&role_id).await?;
    Ok(Json(MessageResponse::new("Role deleted", deleted)))
}

/// Find role by name
#[utoipa::path(
    get,
    path = "/by-name/{name}",
    tag = "roles",
    params(("name" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Role found", body = RoleObject),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn get_role_by_name(
    State(state): State<RolesState>,
    Path(name): Path<String>,
) -> Result<Json<RoleObject>, PlatformError> {
    Ok(Json(state.service.find_role_by_name(&name).await?))
}

/// Find role by label
#[utoipa::path(
    get,
    path = "/by-label/{label}",
    tag = "roles",
    params(("label" = String, Path, description = "Role label")),
    responses(
        (status = 200, description = "Role found", body = RoleObject),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn get_role_by_label(
    State(state): State<RolesState>,
    Path(label): Path<String>,
) -> Result<Json<RoleObject>, PlatformError> {
    Ok(Json(state.service.find_role_by_label(&label).await?))
}

/// Add a sub-role to a role
#[utoipa::path(
    post,
    path = "/{roleId}/sub-roles",
    tag = "roles",
    params(("roleId" = String, Path, description = "Parent role ID")),
    request_body = AddSubRoleRequest,
    responses(
        (status = 200, description = "Sub-role added", body = MessageResponse<RoleObject>),
        (status = 400, description = "Sub-role already present", body = ErrorResponse),
        (status = 404, description = "Parent or sub-role not found", body = ErrorResponse)
    )
)]
pub async fn add_sub_role(
    State(state): State<RolesState>,
    Path(role_id): Path<String>,
    payload: Result<Json<AddSubRoleRequest>, JsonRejection>,
) -> Result<Json<MessageResponse<RoleObject>>, PlatformError> {
    let sub_role_id = required(body(payload)?.sub_role_id)?;
    let role = state.service.add_sub_role_to_role(&role_id, &sub_role_id).await?;
    Ok(Json(MessageResponse::new("subRole added", role)))
}

/// Remove a sub-role from a role
#[utoipa::path(
    delete,
    path = "/{roleId}/sub-roles/{subRoleId}",
    tag = "roles",
    params(
        ("roleId" = String, Path, description = "Parent role ID"),
        ("subRoleId" = String, Path, description = "Sub-role ID")
    ),
    responses(
        (status = 200, description = "Sub-role removed", body = MessageResponse<RoleObject>),
        (status = 400, description = "Sub-role not present", body = ErrorResponse),
        (status = 404, description = "Parent or sub-role not found", body = ErrorResponse)
    )
)]
pub async fn remove_sub_role(
    State(state): State<RolesState>,
    Path((role_id, sub_role_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse<RoleObject>>, PlatformError> {
    let role = state.service.remove_sub_role_from_role(&role_id, &sub_role_id).await?;
    Ok(Json(MessageResponse::new("subRole removed", role)))
}

/// Create roles router
pub fn roles_router(state: RolesState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_role, list_roles))
        .routes(routes!(get_role, update_role, delete_role))
        .routes(routes!(get_role_by_name))
        .routes(routes!(get_role_by_label))
        .routes(routes!(add_sub_role))
        .routes(routes!(remove_sub_role))
        .with_state(state)
}
