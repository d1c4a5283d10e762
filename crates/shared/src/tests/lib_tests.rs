use chrono::NaiveDate;
use serde_json::json;

use crate::{
    domain::{
        AppointmentCondition, BookingRequest, FilterCriteria, Provider, ProviderId, RecipientId,
        Role,
    },
    error::ErrorBody,
    protocol::AppointmentPayload,
};

#[test]
fn provider_accepts_every_availability_spelling() {
    for key in ["availability", "availableTimes", "available_time"] {
        let mut body = json!({"id": 3, "name": "Dr. Kim"});
        body[key] = json!(["09:00-10:00", "10:00-11:00"]);
        let provider: Provider = serde_json::from_value(body).expect("provider");
        assert_eq!(provider.availability, vec!["09:00-10:00", "10:00-11:00"]);
    }
}

#[test]
fn provider_availability_defaults_to_empty() {
    let missing: Provider = serde_json::from_value(json!({"id": 1})).expect("provider");
    assert!(missing.availability.is_empty());

    let null: Provider =
        serde_json::from_value(json!({"id": 1, "availableTimes": null})).expect("provider");
    assert!(null.availability.is_empty());
}

#[test]
fn role_labels_round_trip_and_unknown_labels_are_rejected() {
    for role in Role::ALL {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
    assert_eq!(Role::parse("LOGGEDPATIENT"), Some(Role::LoggedPatient));
    assert_eq!(Role::parse("superuser"), None);
}

#[test]
fn public_variants_drop_credentials() {
    assert_eq!(Role::LoggedPatient.public_variant(), Role::Patient);
    assert_eq!(Role::Admin.public_variant(), Role::Anonymous);
    assert_eq!(Role::Doctor.public_variant(), Role::Anonymous);
    assert!(!Role::Patient.requires_token());
    assert!(Role::LoggedPatient.requires_token());
}

#[test]
fn filter_criteria_treats_blank_fields_as_absent() {
    let criteria = FilterCriteria::new(Some("  "), Some(""), None);
    assert!(criteria.is_empty());

    let criteria = criteria.with_name(Some(" kim ")).with_specialty(Some("Dentist"));
    assert_eq!(criteria.name.as_deref(), Some("kim"));
    assert_eq!(criteria.specialty.as_deref(), Some("Dentist"));
    assert!(criteria.time_slot.is_none());
}

#[test]
fn appointment_payload_uses_upstream_shape() {
    let slot = NaiveDate::from_ymd_opt(2025, 3, 14)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .expect("slot");
    let request = BookingRequest::new(ProviderId(4), RecipientId(9), slot);
    let body = serde_json::to_value(AppointmentPayload::from(&request)).expect("json");
    assert_eq!(
        body,
        json!({
            "doctor": {"id": 4},
            "patient": {"id": 9},
            "appointmentTime": "2025-03-14T09:00:00",
            "status": 0
        })
    );
}

#[test]
fn error_body_prefers_message_over_error() {
    let body = ErrorBody::from_value(&json!({"error": "Doctor not found", "message": "Gone"}));
    assert_eq!(body.text(), Some("Gone"));

    let body = ErrorBody::from_value(&json!({"error": "Doctor not found"}));
    assert_eq!(body.text(), Some("Doctor not found"));

    let body = ErrorBody::from_value(&json!({"message": "  ", "detail": 3}));
    assert_eq!(body.text(), None);
}

#[test]
fn appointment_condition_parses_case_insensitively() {
    assert_eq!("Past".parse::<AppointmentCondition>(), Ok(AppointmentCondition::Past));
    assert_eq!(" future ".parse::<AppointmentCondition>(), Ok(AppointmentCondition::Future));
    assert!("tomorrow".parse::<AppointmentCondition>().is_err());
    assert_eq!(AppointmentCondition::Future.to_string(), "future");
}
