use clap::{Parser, Subcommand};
use clinic_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic patient records and appointment booking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account acting in this invocation
    #[arg(long, global = true)]
    account: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the acting account, its role and available sections
    Whoami,

    /// Register the acting account
    Register {
        #[arg(long)]
        name: String,

        /// Role to register as (admin, patient, doctor)
        #[arg(long)]
        role: String,

        #[arg(long)]
        age: Option<u32>,

        #[arg(long, default_value = "")]
        gender: String,

        /// Vaccine status (none, one, two)
        #[arg(long, default_value = "none")]
        vaccine: String,

        #[arg(long, default_value = "")]
        district: String,

        #[arg(long, default_value = "")]
        symptoms: String,
    },

    /// Update a patient's vaccine status and life status (admin)
    UpdatePatient {
        id: PatientId,

        /// Vaccine status (none, one, two)
        #[arg(long)]
        vaccine: String,

        /// Mark the patient as deceased
        #[arg(long)]
        dead: bool,
    },

    /// List all patients (admin)
    Patients,

    /// Export the patient list to CSV (admin)
    Export { path: PathBuf },

    /// List registered doctors
    Doctors,

    /// Show a doctor's schedule
    Schedule { doctor: String },

    /// Book a slot with a doctor (patient)
    Book {
        doctor: String,

        /// Slot index, 0 to 4
        slot: usize,

        /// Fee paid in smallest units (defaults to the configured fee)
        #[arg(long)]
        fee: Option<u64>,
    },

    /// List all booked appointments
    Appointments {
        /// Read from the appointment journal instead of the record snapshot
        #[arg(long)]
        journal: bool,
    },

    /// Show patient population statistics
    Stats,
}

fn main() -> ExitCode {
    clinic_core::logging::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);
    let store = FileStore::open(data_dir)?;
    let policy = BookingPolicy::from(&config.booking);

    match cli.command {
        Commands::Whoami => cmd_whoami(&connect(store, policy, cli.account)?),
        Commands::Register {
            name,
            role,
            age,
            gender,
            vaccine,
            district,
            symptoms,
        } => {
            let mut session = connect(store, policy, cli.account)?;
            match role.parse::<Role>()? {
                Role::Patient => {
                    let age = age.ok_or_else(|| Error::Validation("age is required".into()))?;
                    let details = PatientRegistration {
                        name,
                        age,
                        gender,
                        vaccine_status: vaccine.parse()?,
                        district,
                        symptoms,
                    };
                    let id = session.register_patient(&details)?;
                    println!("✓ Registered patient #{}", id);
                }
                other => {
                    session.register_user(&name, other)?;
                    println!("✓ Registered {} as {}", session.account(), other);
                }
            }
            Ok(())
        }
        Commands::UpdatePatient { id, vaccine, dead } => {
            let session = connect(store, policy, cli.account)?;
            session.update_patient(id, vaccine.parse()?, dead)?;
            println!("✓ Patient #{} updated", id);
            Ok(())
        }
        Commands::Patients => {
            let session = connect(store, policy, cli.account)?;
            display_patients(&session.patients()?);
            Ok(())
        }
        Commands::Export { path } => {
            let session = connect(store, policy, cli.account)?;
            let count = write_patients_csv(&session.patients()?, &path)?;
            println!("✓ Exported {} patients", count);
            println!("  CSV: {}", path.display());
            Ok(())
        }
        Commands::Doctors => {
            let doctors = store.list_doctors()?;
            if doctors.is_empty() {
                println!("No doctors registered.");
            }
            for doctor in doctors {
                println!("{}", doctor);
            }
            Ok(())
        }
        Commands::Schedule { doctor } => {
            let schedule = get_schedule(&store, &Address::new(doctor))?;
            display_schedule(&render_schedule(&schedule));
            Ok(())
        }
        Commands::Book { doctor, slot, fee } => {
            let session = connect(store, policy, cli.account)?;
            let doctor = Address::new(doctor);
            let paid = fee.unwrap_or(session.policy().fee);
            let appointment = session.book(&doctor, slot, paid)?;
            println!(
                "✓ Appointment booked: {} with {}",
                appointment.slot.label(),
                appointment.doctor
            );
            Ok(())
        }
        Commands::Appointments { journal } => {
            let appointments = if journal {
                clinic_core::journal::read_appointments(&store.journal_path())?
            } else {
                store.list_appointments()?
            };
            if appointments.is_empty() {
                println!("No appointments booked.");
            }
            for a in appointments {
                println!(
                    "{}  {}  {}  {}",
                    a.booked_at.format("%Y-%m-%d %H:%M"),
                    a.doctor,
                    a.slot.label(),
                    a.patient
                );
            }
            Ok(())
        }
        Commands::Stats => {
            let summary = compute_statistics(&store.list_patients()?);
            println!("{}", summary);
            Ok(())
        }
    }
}

fn connect(
    store: FileStore,
    policy: BookingPolicy,
    account: Option<String>,
) -> Result<Session<FileStore>> {
    let account =
        account.ok_or_else(|| Error::Validation("--account is required for this command".into()))?;
    Session::connect(store, policy, Address::new(account))
}

fn cmd_whoami(session: &Session<FileStore>) -> Result<()> {
    println!("Account: {}", session.account());
    println!("Role:    {}", session.role());
    let sections: Vec<String> = session
        .visible_sections()
        .iter()
        .map(|s| s.to_string())
        .collect();
    println!("Access:  {}", sections.join(", "));
    Ok(())
}

fn display_patients(patients: &[Patient]) {
    println!(
        "{:<4} {:<5} {:<10} {:<14} {:<16} {:<8}",
        "ID", "Age", "Gender", "District", "Vaccine Status", "Status"
    );
    for p in patients {
        println!(
            "{:<4} {:<5} {:<10} {:<14} {:<16} {:<8}",
            p.id,
            p.age,
            p.gender,
            p.district,
            p.vaccine_status.to_string(),
            p.status_label()
        );
    }
}

fn display_schedule(rows: &[ScheduleEntry]) {
    println!("{:<14} Patient", "Time");
    for row in rows {
        let patient = row
            .patient
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| clinic_core::scheduler::NO_APPOINTMENT.to_string());
        println!("{:<14} {}", row.label, patient);
    }
}
