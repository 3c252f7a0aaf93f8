//! Record store abstraction and its backends.
//!
//! The store is the authoritative holder of users, patients, doctor
//! schedules and appointments. Two backends are provided:
//! - [`FileStore`]: a JSON snapshot guarded by an `fs2` lock file, shared
//!   safely between processes
//! - [`MemoryStore`]: a mutex-guarded snapshot for embedding and tests
//!
//! Both serialize writers, so `book_slot` is an atomic test-and-set on the
//! slot: of several racing bookings for one slot exactly one commits and
//! the rest observe `SlotUnavailable`. Reads are not linearized with
//! concurrent writes; a slot listed as free may be booked a moment later.

use crate::journal::{AppointmentSink, JsonlJournal};
use crate::{
    Address, Appointment, Error, Patient, PatientId, PatientRegistration, Result, Role, Schedule,
    SlotIndex, User, VaccineStatus,
};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Operations the core consumes from the record store
pub trait RecordStore {
    /// Look up an account; `NotFound` if it never registered
    fn get_user(&self, address: &Address) -> Result<User>;

    /// Register a non-patient account with its one-time role
    fn register_user(&self, address: &Address, name: &str, role: Role) -> Result<()>;

    /// Register a patient account and its record, returning the new id
    fn register_patient(
        &self,
        address: &Address,
        details: &PatientRegistration,
    ) -> Result<PatientId>;

    fn update_patient(
        &self,
        id: PatientId,
        vaccine_status: VaccineStatus,
        is_dead: bool,
    ) -> Result<()>;

    /// All patients in creation order
    fn list_patients(&self) -> Result<Vec<Patient>>;

    /// Doctor addresses in registration order
    fn list_doctors(&self) -> Result<Vec<Address>>;

    fn get_schedule(&self, doctor: &Address) -> Result<Schedule>;

    /// Atomically claim a free slot; `SlotUnavailable` if already booked
    fn book_slot(
        &self,
        doctor: &Address,
        slot: SlotIndex,
        patient: &Address,
        fee_paid: u64,
    ) -> Result<Appointment>;

    /// All appointments in booking order
    fn list_appointments(&self) -> Result<Vec<Appointment>>;
}

// ============================================================================
// Snapshot
// ============================================================================

/// Complete contents of a store
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RecordSnapshot {
    #[serde(default)]
    users: BTreeMap<Address, User>,
    #[serde(default)]
    doctors: Vec<Address>,
    #[serde(default)]
    patients: Vec<Patient>,
    #[serde(default)]
    schedules: BTreeMap<Address, Schedule>,
    #[serde(default)]
    appointments: Vec<Appointment>,
}

impl RecordSnapshot {
    fn user(&self, address: &Address) -> Result<User> {
        self.users
            .get(address)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("No user registered at {}", address)))
    }

    fn ensure_unregistered(&self, address: &Address) -> Result<()> {
        if let Some(existing) = self.users.get(address) {
            return Err(Error::Validation(format!(
                "{} is already registered as {}",
                address, existing.role
            )));
        }
        Ok(())
    }

    fn register_user(&mut self, address: &Address, name: &str, role: Role) -> Result<()> {
        match role {
            Role::None => Err(Error::Validation("a role must be selected".into())),
            Role::Patient => Err(Error::Validation(
                "patients register with their patient details".into(),
            )),
            Role::Admin | Role::Doctor => self.insert_user(address, name, role),
        }
    }

    fn insert_user(&mut self, address: &Address, name: &str, role: Role) -> Result<()> {
        self.ensure_unregistered(address)?;

        match role {
            Role::Doctor => {
                self.doctors.push(address.clone());
                self.schedules.insert(address.clone(), Schedule::default());
            }
            Role::Admin | Role::Patient | Role::None => {}
        }

        self.users.insert(
            address.clone(),
            User {
                address: address.clone(),
                name: name.to_string(),
                role,
            },
        );
        Ok(())
    }

    fn register_patient(
        &mut self,
        address: &Address,
        details: &PatientRegistration,
    ) -> Result<PatientId> {
        self.insert_user(address, &details.name, Role::Patient)?;

        let id = self.patients.len() as PatientId;
        self.patients.push(Patient {
            id,
            address: address.clone(),
            name: details.name.clone(),
            age: details.age,
            gender: details.gender.clone(),
            vaccine_status: details.vaccine_status,
            district: details.district.clone(),
            symptoms: details.symptoms.clone(),
            is_dead: false,
        });
        Ok(id)
    }

    fn update_patient(
        &mut self,
        id: PatientId,
        vaccine_status: VaccineStatus,
        is_dead: bool,
    ) -> Result<()> {
        let patient = usize::try_from(id)
            .ok()
            .and_then(|index| self.patients.get_mut(index))
            .ok_or_else(|| Error::NotFound(format!("No patient with id {}", id)))?;

        patient.vaccine_status = vaccine_status;
        patient.is_dead = is_dead;
        Ok(())
    }

    fn schedule(&self, doctor: &Address) -> Schedule {
        self.schedules.get(doctor).cloned().unwrap_or_default()
    }

    fn book_slot(
        &mut self,
        doctor: &Address,
        slot: SlotIndex,
        patient: &Address,
        fee_paid: u64,
    ) -> Result<Appointment> {
        let role = self.users.get(doctor).map(|u| u.role).unwrap_or_default();
        if role != Role::Doctor {
            return Err(Error::RoleMismatch {
                address: doctor.to_string(),
                expected: Role::Doctor,
                actual: role,
            });
        }

        let schedule = self.schedules.entry(doctor.clone()).or_default();
        if !schedule.claim(slot, patient) {
            return Err(Error::SlotUnavailable {
                doctor: doctor.to_string(),
                slot: slot.get(),
            });
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor: doctor.clone(),
            slot,
            patient: patient.clone(),
            fee_paid,
            booked_at: Utc::now(),
        };
        self.appointments.push(appointment.clone());
        Ok(appointment)
    }
}

// ============================================================================
// File-backed store
// ============================================================================

const RECORDS_FILE: &str = "records.json";
const LOCK_FILE: &str = "records.lock";
const JOURNAL_FILE: &str = "appointments.jsonl";

/// Store persisted as a JSON snapshot in a data directory
///
/// Every write takes an exclusive lock on `records.lock`, re-reads the
/// snapshot, applies the change and atomically replaces the file before
/// releasing the lock. Readers take a shared lock.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::StoreUnavailable(format!("cannot create data dir {:?}: {}", dir, e))
        })?;
        Ok(Self { dir })
    }

    pub fn records_path(&self) -> PathBuf {
        self.dir.join(RECORDS_FILE)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    fn open_lock(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.dir.join(LOCK_FILE))
            .map_err(Error::store)
    }

    fn load(&self) -> Result<RecordSnapshot> {
        let path = self.records_path();
        if !path.exists() {
            return Ok(RecordSnapshot::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(Error::store)?;
        let snapshot = serde_json::from_str(&contents).map_err(|e| {
            Error::StoreUnavailable(format!("corrupt records file {:?}: {}", path, e))
        })?;
        tracing::debug!("Loaded records from {:?}", path);
        Ok(snapshot)
    }

    fn save(&self, snapshot: &RecordSnapshot) -> Result<()> {
        let path = self.records_path();
        let temp = NamedTempFile::new_in(&self.dir)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(snapshot)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved records to {:?}", path);
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&RecordSnapshot) -> Result<T>) -> Result<T> {
        let lock = self.open_lock()?;
        lock.lock_shared().map_err(Error::store)?;

        // Lock is released when `lock` is dropped
        self.load().and_then(|snapshot| f(&snapshot))
    }

    fn write<T>(&self, f: impl FnOnce(&mut RecordSnapshot) -> Result<T>) -> Result<T> {
        self.write_with(f, |_| Ok(()))
    }

    /// Apply `f`, save, then run `on_commit` while the lock is still held
    ///
    /// An `on_commit` error is returned to the caller, but the saved
    /// snapshot stays committed.
    fn write_with<T>(
        &self,
        f: impl FnOnce(&mut RecordSnapshot) -> Result<T>,
        on_commit: impl FnOnce(&T) -> Result<()>,
    ) -> Result<T> {
        let lock = self.open_lock()?;
        lock.lock_exclusive().map_err(Error::store)?;

        let mut snapshot = self.load()?;
        let out = f(&mut snapshot)?;
        self.save(&snapshot)?;
        on_commit(&out)?;

        drop(lock);
        Ok(out)
    }
}

impl RecordStore for FileStore {
    fn get_user(&self, address: &Address) -> Result<User> {
        self.read(|s| s.user(address))
    }

    fn register_user(&self, address: &Address, name: &str, role: Role) -> Result<()> {
        self.write(|s| s.register_user(address, name, role))?;
        tracing::info!("Registered {} as {}", address, role);
        Ok(())
    }

    fn register_patient(
        &self,
        address: &Address,
        details: &PatientRegistration,
    ) -> Result<PatientId> {
        let id = self.write(|s| s.register_patient(address, details))?;
        tracing::info!("Registered patient {} with id {}", address, id);
        Ok(id)
    }

    fn update_patient(
        &self,
        id: PatientId,
        vaccine_status: VaccineStatus,
        is_dead: bool,
    ) -> Result<()> {
        self.write(|s| s.update_patient(id, vaccine_status, is_dead))?;
        tracing::info!("Updated patient {}", id);
        Ok(())
    }

    fn list_patients(&self) -> Result<Vec<Patient>> {
        self.read(|s| Ok(s.patients.clone()))
    }

    fn list_doctors(&self) -> Result<Vec<Address>> {
        self.read(|s| Ok(s.doctors.clone()))
    }

    fn get_schedule(&self, doctor: &Address) -> Result<Schedule> {
        self.read(|s| Ok(s.schedule(doctor)))
    }

    fn book_slot(
        &self,
        doctor: &Address,
        slot: SlotIndex,
        patient: &Address,
        fee_paid: u64,
    ) -> Result<Appointment> {
        let journal_path = self.journal_path();
        let appointment = self.write_with(
            |s| s.book_slot(doctor, slot, patient, fee_paid),
            |appointment| {
                JsonlJournal::new(journal_path)
                    .append(appointment)
                    .map_err(|e| {
                        tracing::error!(
                            "Appointment {} committed but not journaled: {}",
                            appointment.id,
                            e
                        );
                        Error::StoreUnavailable(format!(
                            "appointment {} committed but not journaled: {}",
                            appointment.id, e
                        ))
                    })
            },
        )?;
        tracing::info!(
            "Booked slot {} of {} for {}",
            appointment.slot.get(),
            appointment.doctor,
            appointment.patient
        );
        Ok(appointment)
    }

    fn list_appointments(&self) -> Result<Vec<Appointment>> {
        self.read(|s| Ok(s.appointments.clone()))
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store held in process memory; clones share the same records
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<RecordSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut RecordSnapshot) -> Result<T>) -> Result<T> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::StoreUnavailable("record mutex poisoned".into()))?;
        f(&mut records)
    }
}

impl RecordStore for MemoryStore {
    fn get_user(&self, address: &Address) -> Result<User> {
        self.with(|s| s.user(address))
    }

    fn register_user(&self, address: &Address, name: &str, role: Role) -> Result<()> {
        self.with(|s| s.register_user(address, name, role))
    }

    fn register_patient(
        &self,
        address: &Address,
        details: &PatientRegistration,
    ) -> Result<PatientId> {
        self.with(|s| s.register_patient(address, details))
    }

    fn update_patient(
        &self,
        id: PatientId,
        vaccine_status: VaccineStatus,
        is_dead: bool,
    ) -> Result<()> {
        self.with(|s| s.update_patient(id, vaccine_status, is_dead))
    }

    fn list_patients(&self) -> Result<Vec<Patient>> {
        self.with(|s| Ok(s.patients.clone()))
    }

    fn list_doctors(&self) -> Result<Vec<Address>> {
        self.with(|s| Ok(s.doctors.clone()))
    }

    fn get_schedule(&self, doctor: &Address) -> Result<Schedule> {
        self.with(|s| Ok(s.schedule(doctor)))
    }

    fn book_slot(
        &self,
        doctor: &Address,
        slot: SlotIndex,
        patient: &Address,
        fee_paid: u64,
    ) -> Result<Appointment> {
        self.with(|s| s.book_slot(doctor, slot, patient, fee_paid))
    }

    fn list_appointments(&self) -> Result<Vec<Appointment>> {
        self.with(|s| Ok(s.appointments.clone()))
    }
}
