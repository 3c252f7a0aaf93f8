//! Per-account session context.
//!
//! A [`Session`] binds a record store to the account currently acting on
//! it, and caches that account's role. Switching accounts goes through
//! [`Session::switch_account`], which re-resolves the role explicitly.

use crate::scheduler::{self, BookingPolicy, ScheduleEntry};
use crate::stats::{compute_statistics, Summary};
use crate::{
    registry, Address, Appointment, BookingRequest, Error, Patient, PatientId,
    PatientRegistration, RecordStore, Result, Role, VaccineStatus,
};
use std::fmt;

/// A part of the application an account may use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Registration,
    Statistics,
    PatientAdmin,
    Booking,
    DoctorSchedule,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Section::Registration => "Registration",
            Section::Statistics => "Statistics",
            Section::PatientAdmin => "Patient admin",
            Section::Booking => "Booking",
            Section::DoctorSchedule => "Doctor schedule",
        };
        f.write_str(label)
    }
}

/// Store handle plus the acting account
pub struct Session<S> {
    store: S,
    policy: BookingPolicy,
    account: Address,
    role: Role,
}

impl<S: RecordStore> Session<S> {
    /// Open a session for `account`; unregistered accounts get `Role::None`
    pub fn connect(store: S, policy: BookingPolicy, account: Address) -> Result<Self> {
        let role = resolve_role(&store, &account)?;
        tracing::debug!("Session opened for {} as {}", account, role);
        Ok(Self {
            store,
            policy,
            account,
            role,
        })
    }

    /// Rebind the session to another account
    pub fn switch_account(&mut self, account: Address) -> Result<()> {
        let role = resolve_role(&self.store, &account)?;
        tracing::info!("Switched account {} -> {} ({})", self.account, account, role);
        self.account = account;
        self.role = role;
        Ok(())
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub fn visible_sections(&self) -> Vec<Section> {
        let mut sections = vec![Section::Statistics];
        match self.role {
            Role::None => sections.insert(0, Section::Registration),
            Role::Admin => sections.push(Section::PatientAdmin),
            Role::Patient => sections.push(Section::Booking),
            Role::Doctor => sections.push(Section::DoctorSchedule),
        }
        sections
    }

    /// Register the session account as an admin or doctor
    pub fn register_user(&mut self, name: &str, role: Role) -> Result<()> {
        registry::validate_user(name, role)?;
        self.store.register_user(&self.account, name.trim(), role)?;
        self.role = role;
        Ok(())
    }

    /// Register the session account as a patient
    ///
    /// Name, gender and district are stored trimmed.
    pub fn register_patient(&mut self, details: &PatientRegistration) -> Result<PatientId> {
        let details = PatientRegistration {
            name: details.name.trim().to_string(),
            gender: details.gender.trim().to_string(),
            district: details.district.trim().to_string(),
            ..details.clone()
        };
        registry::validate_patient(&details)?;
        let id = self.store.register_patient(&self.account, &details)?;
        self.role = Role::Patient;
        Ok(id)
    }

    pub fn update_patient(
        &self,
        id: PatientId,
        vaccine_status: VaccineStatus,
        is_dead: bool,
    ) -> Result<()> {
        self.require(Role::Admin)?;
        self.store.update_patient(id, vaccine_status, is_dead)
    }

    pub fn patients(&self) -> Result<Vec<Patient>> {
        self.require(Role::Admin)?;
        self.store.list_patients()
    }

    /// Statistics over a fresh snapshot of the patient population
    pub fn statistics(&self) -> Result<Summary> {
        let patients = self.store.list_patients()?;
        Ok(compute_statistics(&patients))
    }

    pub fn doctors(&self) -> Result<Vec<Address>> {
        self.store.list_doctors()
    }

    pub fn schedule(&self, doctor: &Address) -> Result<Vec<ScheduleEntry>> {
        let schedule = scheduler::get_schedule(&self.store, doctor)?;
        Ok(scheduler::render_schedule(&schedule))
    }

    /// Book a slot for the session's own patient account
    pub fn book(&self, doctor: &Address, slot: usize, fee_paid: u64) -> Result<Appointment> {
        self.require(Role::Patient)?;
        let request = BookingRequest {
            doctor: doctor.clone(),
            slot,
            patient: self.account.clone(),
            fee_paid,
        };
        scheduler::book(&self.store, &self.policy, &request)
    }

    fn require(&self, expected: Role) -> Result<()> {
        if self.role == expected {
            return Ok(());
        }
        Err(Error::RoleMismatch {
            address: self.account.to_string(),
            expected,
            actual: self.role,
        })
    }
}

fn resolve_role<S: RecordStore>(store: &S, account: &Address) -> Result<Role> {
    match store.get_user(account) {
        Ok(user) => Ok(user.role),
        Err(Error::NotFound(_)) => Ok(Role::None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    const FEE: u64 = 10;

    fn connect(store: &MemoryStore, account: &str) -> Session<MemoryStore> {
        Session::connect(store.clone(), BookingPolicy { fee: FEE }, account.into()).unwrap()
    }

    fn details(name: &str, age: u32) -> PatientRegistration {
        PatientRegistration {
            name: name.into(),
            age,
            gender: "male".into(),
            vaccine_status: VaccineStatus::NotVaccinated,
            district: "South".into(),
            symptoms: "fever".into(),
        }
    }

    #[test]
    fn test_unregistered_account_sees_registration() {
        let store = MemoryStore::new();
        let session = connect(&store, "0xnew");

        assert_eq!(session.role(), Role::None);
        assert_eq!(
            session.visible_sections(),
            vec![Section::Registration, Section::Statistics]
        );
    }

    #[test]
    fn test_registration_updates_cached_role() {
        let store = MemoryStore::new();
        let mut session = connect(&store, "0xdoc");
        session.register_user("Dr. Kim", Role::Doctor).unwrap();

        assert_eq!(session.role(), Role::Doctor);
        assert!(session.visible_sections().contains(&Section::DoctorSchedule));
        assert_eq!(session.doctors().unwrap(), vec![Address::from("0xdoc")]);
    }

    #[test]
    fn test_section_labels() {
        let labels: Vec<String> = [Section::PatientAdmin, Section::DoctorSchedule]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(labels, vec!["Patient admin", "Doctor schedule"]);
    }

    #[test]
    fn test_patient_registration_is_trimmed() {
        let store = MemoryStore::new();
        let mut session = connect(&store, "0xpat");

        let mut padded = details("  Pat  ", 28);
        padded.gender = " male ".into();
        padded.district = "\tSouth ".into();
        session.register_patient(&padded).unwrap();

        let patient = &store.list_patients().unwrap()[0];
        assert_eq!(patient.name, "Pat");
        assert_eq!(patient.gender, "male");
        assert_eq!(patient.district, "South");
        assert_eq!(store.get_user(&"0xpat".into()).unwrap().name, "Pat");
    }

    #[test]
    fn test_switch_account_reloads_role() {
        let store = MemoryStore::new();
        connect(&store, "0xadmin")
            .register_user("Root", Role::Admin)
            .unwrap();

        let mut session = connect(&store, "0xpat");
        session.register_patient(&details("Pat", 33)).unwrap();
        assert_eq!(session.role(), Role::Patient);

        session.switch_account("0xadmin".into()).unwrap();
        assert_eq!(session.account(), &Address::from("0xadmin"));
        assert_eq!(session.role(), Role::Admin);

        session.switch_account("0xstranger".into()).unwrap();
        assert_eq!(session.role(), Role::None);
    }

    #[test]
    fn test_admin_only_patient_management() {
        let store = MemoryStore::new();
        let mut patient = connect(&store, "0xpat");
        let id = patient.register_patient(&details("Pat", 70)).unwrap();

        let denied = patient.update_patient(id, VaccineStatus::OneDose, false);
        assert!(matches!(
            denied,
            Err(Error::RoleMismatch {
                expected: Role::Admin,
                ..
            })
        ));
        assert!(patient.patients().is_err());

        let mut admin = connect(&store, "0xadmin");
        admin.register_user("Root", Role::Admin).unwrap();
        admin.update_patient(id, VaccineStatus::TwoDose, true).unwrap();

        let patients = admin.patients().unwrap();
        assert!(patients[0].is_dead);
        assert_eq!(patients[0].status_label(), "Deceased");
    }

    #[test]
    fn test_statistics_exclude_deceased_after_update() {
        let store = MemoryStore::new();
        connect(&store, "0xa").register_patient(&details("A", 10)).unwrap();
        connect(&store, "0xb").register_patient(&details("B", 60)).unwrap();

        let mut admin = connect(&store, "0xadmin");
        admin.register_user("Root", Role::Admin).unwrap();
        assert_eq!(admin.statistics().unwrap().median, 35.0);

        admin.update_patient(1, VaccineStatus::OneDose, true).unwrap();
        let summary = admin.statistics().unwrap();
        assert_eq!(summary.median, 10.0);
        assert_eq!(summary.children, 100.0);
    }

    #[test]
    fn test_patient_books_for_own_account() {
        let store = MemoryStore::new();
        connect(&store, "0xdoc")
            .register_user("Dr. Kim", Role::Doctor)
            .unwrap();

        let mut patient = connect(&store, "0xpat");
        patient.register_patient(&details("Pat", 41)).unwrap();
        let appointment = patient.book(&"0xdoc".into(), 1, FEE).unwrap();
        assert_eq!(appointment.patient, Address::from("0xpat"));

        let rows = patient.schedule(&"0xdoc".into()).unwrap();
        assert_eq!(rows[1].patient, Some(Address::from("0xpat")));
        assert_eq!(rows[0].patient, None);
    }

    #[test]
    fn test_non_patient_cannot_book() {
        let store = MemoryStore::new();
        let mut doctor = connect(&store, "0xdoc");
        doctor.register_user("Dr. Kim", Role::Doctor).unwrap();

        let result = doctor.book(&"0xdoc".into(), 0, FEE);
        assert!(matches!(
            result,
            Err(Error::RoleMismatch {
                expected: Role::Patient,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_registration_leaves_role_unset() {
        let store = MemoryStore::new();
        let mut session = connect(&store, "0xnew");

        let mut incomplete = details("Pat", 20);
        incomplete.gender.clear();
        assert!(matches!(
            session.register_patient(&incomplete),
            Err(Error::Validation(_))
        ));
        assert_eq!(session.role(), Role::None);
        assert!(matches!(
            store.get_user(&"0xnew".into()),
            Err(Error::NotFound(_))
        ));
    }
}
