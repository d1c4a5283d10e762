//! Text rendering of portal UI events for the terminal.

use client_core::{
    AppointmentsView, BookingPhase, DirectoryView, HeaderView, NavOption, UiEvent,
};
use shared::domain::Appointment;

fn nav_label(option: NavOption) -> &'static str {
    match option {
        NavOption::AddProvider => "Add Doctor",
        NavOption::ProviderHome => "Home",
        NavOption::Login => "Login",
        NavOption::SignUp => "Sign Up",
        NavOption::Home => "Home",
        NavOption::Appointments => "Appointments",
        NavOption::Logout => "Logout",
        NavOption::Landing => "Home",
    }
}

pub fn header(view: &HeaderView) -> String {
    if view.is_minimal() {
        return "[portal]".to_string();
    }
    let nav: Vec<&str> = view.nav.iter().copied().map(nav_label).collect();
    format!("[portal] {}", nav.join(" | "))
}

pub fn directory(view: &DirectoryView) -> String {
    match view {
        DirectoryView::Loading => "loading doctors...".to_string(),
        DirectoryView::Empty { message } | DirectoryView::Error { message } => message.clone(),
        DirectoryView::Populated(cards) => cards
            .iter()
            .map(|card| {
                let provider = &card.provider;
                let actions: Vec<String> =
                    card.actions.iter().map(|action| format!("{action:?}")).collect();
                format!(
                    "#{} {} ({}) <{}> slots: [{}] actions: [{}]",
                    provider.id,
                    provider.name,
                    provider.specialty,
                    provider.email,
                    provider.availability.join(", "),
                    actions.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn appointment_line(appointment: &Appointment) -> String {
    format!(
        "#{} {} {} {:?}",
        appointment.id,
        appointment.appointment_time.format("%Y-%m-%d %H:%M"),
        appointment.patient_name,
        appointment.status
    )
}

pub fn appointments(view: &AppointmentsView) -> String {
    match view {
        AppointmentsView::Empty { message } | AppointmentsView::Error { message } => {
            message.clone()
        }
        AppointmentsView::Populated(items) => items
            .iter()
            .map(appointment_line)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// One line (or block) per event; `None` for events with nothing to show.
pub fn describe(event: &UiEvent) -> Option<String> {
    match event {
        UiEvent::HeaderRendered(view) => Some(header(view)),
        UiEvent::ModalOpened(kind) => Some(format!("opened {kind:?} form")),
        UiEvent::ModalClosed => None,
        UiEvent::Notice(message) => Some(message.clone()),
        UiEvent::Error(error) => Some(format!("error: {}", error.message())),
        UiEvent::Navigate(route) => Some(format!("-> {}", route.path())),
        UiEvent::Reload => Some("-> reload".to_string()),
        UiEvent::DirectoryRendered(view) => Some(directory(view)),
        UiEvent::ProviderRemoved(id) => Some(format!("removed doctor #{id}")),
        UiEvent::BookingOverlayOpened(overlay) => Some(format!(
            "booking with {} for {}: slots [{}]",
            overlay.provider.name,
            overlay.recipient.name,
            overlay.slots().join(", ")
        )),
        UiEvent::BookingPhaseChanged(BookingPhase::Failed(message)) => {
            Some(format!("booking failed: {message}"))
        }
        UiEvent::BookingPhaseChanged(_) | UiEvent::BookingOverlayClosed => None,
        UiEvent::AppointmentsRendered(view) => Some(appointments(view)),
    }
}
