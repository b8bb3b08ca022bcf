use crate::entities::{clients, prelude::*};
use crate::services::import::types::ClientRecord;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

/// Persistence seam for imported clients.
///
/// A batch insert is all-or-nothing; callers fall back to `insert_one` to
/// isolate a bad record.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn insert_batch(&self, records: &[ClientRecord]) -> anyhow::Result<()>;

    async fn insert_one(&self, record: &ClientRecord) -> anyhow::Result<()>;
}

pub struct SeaOrmClientStore {
    db: DatabaseConnection,
}

impl SeaOrmClientStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub fn to_active_model(record: &ClientRecord) -> clients::ActiveModel {
    let now = Utc::now();
    clients::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(record.user_id.clone()),
        organization_id: Set(record.organization_id.clone()),
        full_name: Set(record.full_name.clone()),
        email: Set(record.email.clone()),
        phone: Set(record.phone.clone()),
        goals: Set(record.goals.clone()),
        injuries: Set(record.injuries.clone()),
        equipment: Set(serde_json::json!(record.equipment)),
        notes: Set(record.notes.clone()),
        membership: Set(record.membership.clone()),
        fitness_level: Set(record.fitness_level.clone()),
        age: Set(record.age),
        weight: Set(record.weight),
        height: Set(record.height),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[async_trait]
impl ClientStore for SeaOrmClientStore {
    async fn insert_batch(&self, records: &[ClientRecord]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        // A single multi-row INSERT, so the batch lands or fails as a unit.
        Clients::insert_many(records.iter().map(to_active_model))
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn insert_one(&self, record: &ClientRecord) -> anyhow::Result<()> {
        Clients::insert(to_active_model(record))
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}
