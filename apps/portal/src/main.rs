use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client_core::{
    auth::{
        AdminLoginForm, ClinicianLoginForm, ProviderForm, RecipientLoginForm, SignupForm,
    },
    CardAction, Page, Portal, PortalError, SessionStore, UiEvent,
};
use shared::domain::{
    AppointmentCondition, AppointmentId, FilterCriteria, ProviderId, Role, VisitRecord,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Care portal client")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides the configured upstream base URL.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    session_file: Option<PathBuf>,
    #[arg(long)]
    debounce_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick a role on the landing page and open its login form.
    Role { label: String },
    /// Visit the landing page, ending any session.
    Landing,
    Header,
    #[command(subcommand)]
    Login(LoginCommand),
    Signup {
        name: String,
        email: String,
        password: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
    },
    Logout,
    Providers {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        specialty: Option<String>,
    },
    AddProvider {
        name: String,
        specialty: String,
        email: String,
        password: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long = "slot")]
        slots: Vec<String>,
    },
    /// Edit a listed doctor. A blank password leaves it unchanged.
    UpdateProvider {
        id: i64,
        name: String,
        specialty: String,
        email: String,
        #[arg(long, default_value = "")]
        password: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long = "slot")]
        slots: Vec<String>,
    },
    DeleteProvider { id: i64 },
    Book {
        provider_id: i64,
        date: NaiveDate,
        slot: String,
    },
    Appointments {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        patient: Option<String>,
    },
    MyAppointments {
        /// `past` or `future`.
        #[arg(long)]
        condition: Option<AppointmentCondition>,
        #[arg(long)]
        doctor: Option<String>,
    },
    CancelAppointment { id: i64 },
    #[command(subcommand)]
    Record(RecordCommand),
}

#[derive(Subcommand, Debug)]
enum LoginCommand {
    Admin { username: String, password: String },
    Doctor { email: String, password: String },
    Patient { email: String, password: String },
}

#[derive(Subcommand, Debug)]
enum RecordCommand {
    Get {
        appointment_id: i64,
    },
    Save {
        appointment_id: i64,
        patient_name: String,
        medication: String,
        #[arg(long, default_value = "")]
        dosage: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    if let Some(path) = cli.session_file {
        settings.session_file = path;
    }
    if let Some(ms) = cli.debounce_ms {
        settings.debounce_ms = ms;
    }
    let client_config = settings.client_config()?;

    let session = SessionStore::load(&settings.session_file).with_context(|| {
        format!(
            "failed to load session from '{}'",
            settings.session_file.display()
        )
    })?;
    let portal = Portal::new(&client_config, session);
    let mut events = portal.subscribe_events();

    let outcome = run(&portal, cli.command).await;

    // Let spawned refreshes land before rendering.
    portal.directory.settle().await;
    print_events(&mut events);

    portal
        .session
        .save(&settings.session_file)
        .with_context(|| {
            format!(
                "failed to save session to '{}'",
                settings.session_file.display()
            )
        })?;

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            warn!(category = ?err.category(), "portal: command failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_events(events: &mut broadcast::Receiver<UiEvent>) {
    while let Ok(event) = events.try_recv() {
        if let Some(text) = render::describe(&event) {
            match event {
                UiEvent::Error(_) => eprintln!("{text}"),
                _ => println!("{text}"),
            }
        }
    }
}

async fn run(portal: &Portal, command: Command) -> Result<(), PortalError> {
    match command {
        Command::Role { label } => {
            let modal = portal.auth.open_for_role(&label);
            info!(?modal, "portal: role selected");
            portal.render_header(Page::Dashboard);
        }
        Command::Landing => {
            portal.render_header(Page::Landing);
        }
        Command::Header => {
            portal.render_header(Page::Dashboard);
        }
        Command::Login(login) => match login {
            LoginCommand::Admin { username, password } => {
                portal
                    .auth
                    .login_admin(AdminLoginForm { username, password })
                    .await?
            }
            LoginCommand::Doctor { email, password } => {
                portal
                    .auth
                    .login_clinician(ClinicianLoginForm { email, password })
                    .await?
            }
            LoginCommand::Patient { email, password } => {
                portal
                    .auth
                    .login_recipient(RecipientLoginForm { email, password })
                    .await?
            }
        },
        Command::Signup {
            name,
            email,
            password,
            phone,
            address,
        } => {
            portal
                .auth
                .signup_recipient(SignupForm {
                    name,
                    email,
                    password,
                    phone,
                    address,
                })
                .await?
        }
        Command::Logout => {
            if portal.session.snapshot().role == Role::LoggedPatient {
                portal.auth.logout_recipient();
            } else {
                portal.auth.logout();
            }
        }
        Command::Providers {
            name,
            time,
            specialty,
        } => {
            let criteria =
                FilterCriteria::new(name.as_deref(), time.as_deref(), specialty.as_deref());
            portal.directory.search(criteria).await;
        }
        Command::AddProvider {
            name,
            specialty,
            email,
            password,
            phone,
            slots,
        } => {
            portal
                .auth
                .create_provider(ProviderForm {
                    name,
                    specialty,
                    email,
                    password,
                    phone,
                    availability: slots,
                })
                .await?
        }
        Command::UpdateProvider {
            id,
            name,
            specialty,
            email,
            password,
            phone,
            slots,
        } => {
            portal
                .auth
                .update_provider(
                    ProviderId(id),
                    ProviderForm {
                        name,
                        specialty,
                        email,
                        password,
                        phone,
                        availability: slots,
                    },
                )
                .await?
        }
        Command::DeleteProvider { id } => {
            portal
                .directory
                .activate(ProviderId(id), CardAction::Delete)
                .await?
        }
        Command::Book {
            provider_id,
            date,
            slot,
        } => {
            portal.directory.search(FilterCriteria::default()).await;
            portal
                .directory
                .activate(ProviderId(provider_id), CardAction::Book)
                .await?;
            portal.booking.set_date(date).await?;
            if let Err(err) = portal.booking.select_slot(&slot).await {
                portal.booking.cancel().await;
                return Err(err);
            }
            portal.booking.confirm().await?;
        }
        Command::Appointments { date, patient } => {
            portal
                .appointments
                .clinician_day(date, patient.as_deref())
                .await;
        }
        Command::MyAppointments { condition, doctor } => {
            portal
                .appointments
                .recipient_filter(condition, doctor.as_deref())
                .await;
        }
        Command::CancelAppointment { id } => {
            portal.appointments.cancel(AppointmentId(id)).await?;
        }
        Command::Record(record) => match record {
            RecordCommand::Get { appointment_id } => {
                match portal.records.load(AppointmentId(appointment_id)).await? {
                    Some(record) => println!(
                        "{}: {} {} ({})",
                        record.patient_name, record.medication, record.dosage, record.doctor_notes
                    ),
                    None => println!("No prescription for appointment #{appointment_id}"),
                }
            }
            RecordCommand::Save {
                appointment_id,
                patient_name,
                medication,
                dosage,
                notes,
            } => {
                let record = VisitRecord {
                    appointment_id: AppointmentId(appointment_id),
                    patient_name,
                    medication,
                    dosage,
                    doctor_notes: notes,
                };
                portal.records.save(&record).await?;
            }
        },
    }
    Ok(())
}
