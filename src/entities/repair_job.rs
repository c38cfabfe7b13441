use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{JobStatus, Note, Quote, RepairJob};

/// The `repair_jobs` collection. Quotes and notes are embedded JSON arrays.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repair_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub item_model: String,
    pub serial_number: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub problem_description: String,
    pub status: JobStatus,
    pub date_received: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub customer_id: String,
    pub customer_name: String,
    #[sea_orm(column_type = "Json")]
    pub quotes: Json,
    #[sea_orm(column_type = "Json")]
    pub notes: Json,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for RepairJob {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let quotes: Vec<Quote> = serde_json::from_value(model.quotes)?;
        let notes: Vec<Note> = serde_json::from_value(model.notes)?;
        Ok(RepairJob {
            id: model.id,
            item_model: model.item_model,
            serial_number: model.serial_number,
            problem_description: model.problem_description,
            status: model.status,
            date_received: model.date_received,
            last_updated: model.last_updated,
            customer_id: model.customer_id,
            customer_name: model.customer_name,
            quotes,
            notes,
            version: model.version,
        })
    }
}

impl ActiveModel {
    /// Full document image of a job, ready for insert.
    pub fn from_job(job: &RepairJob) -> Result<Self, ServiceError> {
        Ok(ActiveModel {
            id: Set(job.id.clone()),
            item_model: Set(job.item_model.clone()),
            serial_number: Set(job.serial_number.clone()),
            problem_description: Set(job.problem_description.clone()),
            status: Set(job.status),
            date_received: Set(job.date_received),
            last_updated: Set(job.last_updated),
            customer_id: Set(job.customer_id.clone()),
            customer_name: Set(job.customer_name.clone()),
            quotes: Set(serde_json::to_value(&job.quotes)?),
            notes: Set(serde_json::to_value(&job.notes)?),
            version: Set(job.version),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuotePart;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use sea_orm::ActiveValue;
    use uuid::Uuid;

    #[test]
    fn model_round_trips_embedded_history() {
        let now = Utc::now();
        let quote = Quote {
            id: Uuid::new_v4(),
            labor_hours: dec!(2),
            labor_rate: dec!(750),
            tax_rate: dec!(0.15),
            parts: vec![QuotePart::new("Battery", 1, dec!(450.50))],
            created_at: now,
            valid_until: now + Duration::days(30),
        };
        let model = Model {
            id: "job-1".into(),
            item_model: "Phone".into(),
            serial_number: Some("SN-1".into()),
            problem_description: "Battery drains in an hour".into(),
            status: JobStatus::Diagnosis,
            date_received: now,
            last_updated: now,
            customer_id: "cust-1".into(),
            customer_name: "Sam".into(),
            quotes: serde_json::to_value(vec![quote.clone()]).unwrap(),
            notes: serde_json::json!([]),
            version: 3,
        };

        let job = RepairJob::try_from(model).unwrap();
        assert_eq!(job.quotes, vec![quote]);
        assert_eq!(job.version, 3);

        let active = ActiveModel::from_job(&job).unwrap();
        assert!(matches!(active.version, ActiveValue::Set(3)));
        assert!(matches!(active.status, ActiveValue::Set(JobStatus::Diagnosis)));
    }

    #[test]
    fn malformed_history_is_a_serialization_error() {
        let now = Utc::now();
        let model = Model {
            id: "job-2".into(),
            item_model: "Phone".into(),
            serial_number: None,
            problem_description: "Does not turn on".into(),
            status: JobStatus::Pending,
            date_received: now,
            last_updated: now,
            customer_id: "cust-1".into(),
            customer_name: "Sam".into(),
            quotes: serde_json::json!({"not": "a list"}),
            notes: serde_json::json!([]),
            version: 0,
        };
        assert!(matches!(
            RepairJob::try_from(model),
            Err(ServiceError::SerializationError(_))
        ));
    }
}
