use crate::AppState;
use crate::api::error::AppError;
use crate::entities::{clients, prelude::*};
use crate::services::client_store::to_active_model;
use crate::services::import::mapping::CanonicalField;
use crate::services::import::normalize::build_record;
use crate::services::import::types::Owner;
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const DEFAULT_LIST_LIMIT: u64 = 100;
const MAX_LIST_LIMIT: u64 = 500;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListClientsQuery {
    /// Maximum clients returned, newest first (default 100, max 500)
    pub limit: Option<u64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub goals: Option<String>,
    pub injuries: Option<String>,
    pub equipment: Vec<String>,
    pub notes: Option<String>,
    pub membership: Option<String>,
    pub fitness_level: Option<String>,
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub organization_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<clients::Model> for ClientResponse {
    fn from(model: clients::Model) -> Self {
        let equipment = serde_json::from_value(model.equipment).unwrap_or_default();
        Self {
            id: model.id,
            full_name: model.full_name,
            email: model.email,
            phone: model.phone,
            goals: model.goals,
            injuries: model.injuries,
            equipment,
            notes: model.notes,
            membership: model.membership,
            fitness_level: model.fitness_level,
            age: model.age,
            weight: model.weight,
            height: model.height,
            organization_id: model.organization_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub goals: Option<String>,
    pub injuries: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    pub notes: Option<String>,
    pub membership: Option<String>,
    pub fitness_level: Option<String>,
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

impl CreateClientRequest {
    /// Raw text for a field, so manual entries go through the same
    /// sanitization and range checks as imported rows.
    fn raw(&self, field: CanonicalField) -> Option<String> {
        match field {
            CanonicalField::FullName => Some(self.full_name.clone()),
            CanonicalField::FirstName | CanonicalField::LastName => None,
            CanonicalField::Email => self.email.clone(),
            CanonicalField::Phone => self.phone.clone(),
            CanonicalField::Goals => self.goals.clone(),
            CanonicalField::Injuries => self.injuries.clone(),
            CanonicalField::Equipment => {
                (!self.equipment.is_empty()).then(|| self.equipment.join(","))
            }
            CanonicalField::Notes => self.notes.clone(),
            CanonicalField::Membership => self.membership.clone(),
            CanonicalField::FitnessLevel => self.fitness_level.clone(),
            CanonicalField::Age => self.age.map(|v| v.to_string()),
            CanonicalField::Weight => self.weight.map(|v| v.to_string()),
            CanonicalField::Height => self.height.map(|v| v.to_string()),
        }
    }
}

#[utoipa::path(
    get,
    path = "/clients",
    params(
        ListClientsQuery,
        ("x-user-id" = String, Header, description = "Caller user id")
    ),
    responses(
        (status = 200, description = "The caller's clients, newest first", body = Vec<ClientResponse>),
        (status = 401, description = "Missing caller identity")
    ),
    tag = "clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let models = Clients::find()
        .filter(clients::Column::UserId.eq(&owner.user_id))
        .order_by_desc(clients::Column::CreatedAt)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(models.into_iter().map(ClientResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/clients",
    request_body = CreateClientRequest,
    params(
        ("x-user-id" = String, Header, description = "Caller user id"),
        ("x-organization-id" = Option<String>, Header, description = "Caller organization id")
    ),
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 400, description = "Invalid client data")
    ),
    tag = "clients"
)]
pub async fn create_client(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Json(req): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let record = build_record(&owner, |field| req.raw(field))
        .ok_or_else(|| AppError::BadRequest("fullName has no usable characters".to_string()))?;

    let model = to_active_model(&record).insert(&state.db).await?;
    tracing::info!("👤 Client {} created for user {}", model.id, owner.user_id);

    Ok((StatusCode::CREATED, Json(ClientResponse::from(model))))
}
