//! Persisted repair requests produced by a completed intake.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Displayable, Identifiable, Timestamped};
use crate::intake::{ServiceLocation, Urgency, VehicleInfo};

/// Workshop lifecycle of a repair request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    #[default]
    Received,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RepairStatus::Received => "received",
            RepairStatus::InProgress => "in progress",
            RepairStatus::Completed => "completed",
            RepairStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Row stored in the `repair_requests` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairRequest {
    pub id: Uuid,
    /// Client-generated token; a retried submission with the same key never creates a second row.
    pub idempotency_key: Uuid,
    pub user_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    #[serde(default)]
    pub service_package_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_service: Option<String>,
    pub vehicle: VehicleInfo,
    pub problem_description: String,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_time: Option<NaiveTime>,
    pub service_location: ServiceLocation,
    #[serde(default)]
    pub photo_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: RepairStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepairRequest {
    /// Text describing the requested work, preferring package selections over free text.
    pub fn service_summary(&self) -> String {
        if !self.service_package_ids.is_empty() {
            self.service_package_ids.join(", ")
        } else {
            self.custom_service.clone().unwrap_or_default()
        }
    }
}

impl Identifiable for RepairRequest {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Timestamped for RepairRequest {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Displayable for RepairRequest {
    fn display_label(&self) -> String {
        format!(
            "{} for {} ({})",
            self.service_summary(),
            self.vehicle.label(),
            self.status
        )
    }
}
