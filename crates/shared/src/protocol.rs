use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AppointmentId, BookingRequest, BookingStatus, ProviderId, RecipientId, VisitRecord,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Clinician and recipient logins share the `{identifier, password}` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialLoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUpsertRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProviderId>,
    pub name: String,
    pub specialty: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_times: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef<T> {
    pub id: T,
}

/// Appointment body for submit/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AppointmentId>,
    pub doctor: EntityRef<ProviderId>,
    pub patient: EntityRef<RecipientId>,
    #[serde(with = "slot_time")]
    pub appointment_time: NaiveDateTime,
    pub status: BookingStatus,
}

impl From<&BookingRequest> for AppointmentPayload {
    fn from(request: &BookingRequest) -> Self {
        Self {
            id: None,
            doctor: EntityRef {
                id: request.provider_id,
            },
            patient: EntityRef {
                id: request.recipient_id,
            },
            appointment_time: request.slot_start,
            status: request.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecordPayload {
    pub appointment_id: AppointmentId,
    pub patient_name: String,
    pub medication: String,
    pub dosage: String,
    pub doctor_notes: String,
}

impl From<&VisitRecord> for VisitRecordPayload {
    fn from(record: &VisitRecord) -> Self {
        Self {
            appointment_id: record.appointment_id,
            patient_name: record.patient_name.clone(),
            medication: record.medication.clone(),
            dosage: record.dosage.clone(),
            doctor_notes: record.doctor_notes.clone(),
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SS`, no zone and no fractional seconds.
pub mod slot_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
