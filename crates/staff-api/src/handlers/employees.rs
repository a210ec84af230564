//! Employee CRUD endpoints.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;

use crate::context::ApiContext;
use crate::error::{ApiError, ApiResult};
use staff_domain::{Employee, EmployeeAttributes, EmployeeId, RequestContext};

type IdParam = Result<Path<EmployeeId>, PathRejection>;
type BodyParam = Result<Json<EmployeeAttributes>, JsonRejection>;

fn employee_id(param: IdParam) -> ApiResult<EmployeeId> {
    param
        .map(|Path(id)| id)
        .map_err(|e| ApiError::InvalidInput(format!("employee id must be an integer: {e}")))
}

fn attributes(body: BodyParam) -> ApiResult<EmployeeAttributes> {
    body.map(|Json(attrs)| attrs)
        .map_err(|e| ApiError::InvalidInput(e.body_text()))
}

/// `GET /employees`
pub async fn list_employees(
    State(ctx): State<ApiContext>,
    Extension(req): Extension<RequestContext>,
) -> ApiResult<Json<Vec<Employee>>> {
    Ok(Json(ctx.employees.list(&req).await?))
}

/// `GET /employees/{id}`
pub async fn get_employee(
    State(ctx): State<ApiContext>,
    Extension(req): Extension<RequestContext>,
    id: IdParam,
) -> ApiResult<Json<Employee>> {
    let id = employee_id(id)?;
    Ok(Json(ctx.employees.get_by_id(&req, id).await?))
}

/// `POST /employees`
pub async fn create_employee(
    State(ctx): State<ApiContext>,
    Extension(req): Extension<RequestContext>,
    body: BodyParam,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    let attrs = attributes(body)?;
    let created = ctx.employees.create(&req, attrs).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /employees/{id}`
pub async fn update_employee(
    State(ctx): State<ApiContext>,
    Extension(req): Extension<RequestContext>,
    id: IdParam,
    body: BodyParam,
) -> ApiResult<Json<Employee>> {
    let id = employee_id(id)?;
    let attrs = attributes(body)?;
    Ok(Json(ctx.employees.update(&req, id, attrs).await?))
}

/// `DELETE /employees/{id}`
pub async fn delete_employee(
    State(ctx): State<ApiContext>,
    Extension(req): Extension<RequestContext>,
    id: IdParam,
) -> ApiResult<Json<Employee>> {
    let id = employee_id(id)?;
    Ok(Json(ctx.employees.delete(&req, id).await?))
}
