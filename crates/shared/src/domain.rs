use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ProviderId);
id_newtype!(RecipientId);
id_newtype!(AppointmentId);

/// Portal role as stored in the session.
///
/// `Patient` is the public care-recipient role (browsing, no credential);
/// `LoggedPatient` is the authenticated recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    #[default]
    Anonymous,
    Admin,
    Doctor,
    Patient,
    LoggedPatient,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Anonymous,
        Role::Admin,
        Role::Doctor,
        Role::Patient,
        Role::LoggedPatient,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
            Role::LoggedPatient => "loggedPatient",
        }
    }

    /// Parses a stored role label. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(label.trim()))
    }

    pub fn requires_token(self) -> bool {
        matches!(self, Role::Admin | Role::Doctor | Role::LoggedPatient)
    }

    /// Role shown when the credential backing this role is gone.
    pub fn public_variant(self) -> Role {
        match self {
            Role::LoggedPatient | Role::Patient => Role::Patient,
            Role::Admin | Role::Doctor | Role::Anonymous => Role::Anonymous,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: ProviderId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(
        default,
        alias = "availableTimes",
        alias = "available_time",
        deserialize_with = "nullable_slots"
    )]
    pub availability: Vec<String>,
}

fn nullable_slots<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientProfile {
    pub id: RecipientId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Appointment lifecycle status. Encoded on the wire as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum BookingStatus {
    #[default]
    Requested,
    Completed,
    Cancelled,
}

impl From<BookingStatus> for i32 {
    fn from(value: BookingStatus) -> Self {
        match value {
            BookingStatus::Requested => 0,
            BookingStatus::Completed => 1,
            BookingStatus::Cancelled => 2,
        }
    }
}

impl TryFrom<i32> for BookingStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BookingStatus::Requested),
            1 => Ok(BookingStatus::Completed),
            2 => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown appointment status {other}")),
        }
    }
}

/// Time-based filter over a recipient's own appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentCondition {
    Past,
    Future,
}

impl AppointmentCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentCondition::Past => "past",
            AppointmentCondition::Future => "future",
        }
    }
}

impl fmt::Display for AppointmentCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentCondition {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "past" => Ok(AppointmentCondition::Past),
            "future" => Ok(AppointmentCondition::Future),
            other => Err(format!("unknown appointment condition '{other}', expected 'past' or 'future'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub provider_id: ProviderId,
    pub recipient_id: RecipientId,
    pub slot_start: NaiveDateTime,
    pub status: BookingStatus,
}

impl BookingRequest {
    pub fn new(provider_id: ProviderId, recipient_id: RecipientId, slot_start: NaiveDateTime) -> Self {
        Self {
            provider_id,
            recipient_id,
            slot_start,
            status: BookingStatus::Requested,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub name: Option<String>,
    pub time_slot: Option<String>,
    pub specialty: Option<String>,
}

impl FilterCriteria {
    pub fn new(name: Option<&str>, time_slot: Option<&str>, specialty: Option<&str>) -> Self {
        Self {
            name: non_blank(name),
            time_slot: non_blank(time_slot),
            specialty: non_blank(specialty),
        }
    }

    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = non_blank(name);
        self
    }

    pub fn with_time_slot(mut self, time_slot: Option<&str>) -> Self {
        self.time_slot = non_blank(time_slot);
        self
    }

    pub fn with_specialty(mut self, specialty: Option<&str>) -> Self {
        self.specialty = non_blank(specialty);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.time_slot.is_none() && self.specialty.is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<RecipientId>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    pub appointment_time: NaiveDateTime,
    #[serde(default)]
    pub status: BookingStatus,
}

/// Free-text visit record (prescription) attached to one appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub appointment_id: AppointmentId,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub medication: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub doctor_notes: String,
}
