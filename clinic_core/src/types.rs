//! Core record shapes for the clinic records system.
//!
//! This module defines the types shared by the store, statistics engine
//! and scheduler:
//! - Accounts and roles
//! - Patient records and their registration inputs
//! - Doctor schedules, slots and appointments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

// ============================================================================
// Accounts
// ============================================================================

/// Opaque unique account identifier (e.g. a wallet address)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Account role, assigned once at registration
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    None,
    Admin,
    Patient,
    Doctor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::None => "None",
            Role::Admin => "Admin",
            Role::Patient => "Patient",
            Role::Doctor => "Doctor",
        };
        f.write_str(label)
    }
}

/// Numeric role codes as used by ledger-backed stores
impl TryFrom<u8> for Role {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Role::None),
            1 => Ok(Role::Admin),
            2 => Ok(Role::Patient),
            3 => Ok(Role::Doctor),
            other => Err(Error::Validation(format!("Unknown role code {}", other))),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Role::None),
            "admin" => Ok(Role::Admin),
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => other
                .parse::<u8>()
                .map_err(|_| Error::Validation(format!("Unknown role: {}", s)))
                .and_then(Role::try_from),
        }
    }
}

/// A registered account
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub address: Address,
    pub name: String,
    pub role: Role,
}

// ============================================================================
// Patients
// ============================================================================

/// Store-assigned patient id, dense and in creation order
pub type PatientId = u64;

/// Vaccination status of a patient
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum VaccineStatus {
    #[default]
    NotVaccinated,
    OneDose,
    TwoDose,
}

impl fmt::Display for VaccineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VaccineStatus::NotVaccinated => "Not Vaccinated",
            VaccineStatus::OneDose => "One Dose",
            VaccineStatus::TwoDose => "Two Dose",
        };
        f.write_str(label)
    }
}

impl FromStr for VaccineStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "0" | "none" | "not_vaccinated" => Ok(VaccineStatus::NotVaccinated),
            "1" | "one" | "one_dose" => Ok(VaccineStatus::OneDose),
            "2" | "two" | "two_dose" => Ok(VaccineStatus::TwoDose),
            _ => Err(Error::Validation(format!("Unknown vaccine status: {}", s))),
        }
    }
}

/// A patient record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: PatientId,
    pub address: Address,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub vaccine_status: VaccineStatus,
    pub district: String,
    pub symptoms: String,
    pub is_dead: bool,
}

impl Patient {
    pub fn status_label(&self) -> &'static str {
        if self.is_dead {
            "Deceased"
        } else {
            "Active"
        }
    }
}

/// Patient details submitted at registration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRegistration {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub vaccine_status: VaccineStatus,
    pub district: String,
    pub symptoms: String,
}

// ============================================================================
// Schedules
// ============================================================================

/// Number of bookable slots per doctor
pub const SLOT_COUNT: usize = 5;

/// Fixed real-world time window of each slot, index-aligned
pub const SLOT_LABELS: [&str; SLOT_COUNT] = [
    "4:00–4:10 PM",
    "4:10–4:20 PM",
    "4:20–4:30 PM",
    "4:30–4:40 PM",
    "4:40–4:50 PM",
];

/// A validated slot index in `0..SLOT_COUNT`
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "usize", into = "usize")]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub fn new(index: usize) -> Result<Self> {
        if index < SLOT_COUNT {
            Ok(Self(index as u8))
        } else {
            Err(Error::InvalidSlot(index))
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    pub fn label(self) -> &'static str {
        SLOT_LABELS[self.get()]
    }

    /// All slot indices in ascending order
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..SLOT_COUNT as u8).map(SlotIndex)
    }
}

impl TryFrom<usize> for SlotIndex {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        SlotIndex::new(index)
    }
}

impl From<SlotIndex> for usize {
    fn from(index: SlotIndex) -> usize {
        index.get()
    }
}

/// State of a single slot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    #[default]
    Free,
    Booked { patient: Address },
}

impl SlotState {
    pub fn is_free(&self) -> bool {
        matches!(self, SlotState::Free)
    }

    pub fn patient(&self) -> Option<&Address> {
        match self {
            SlotState::Free => None,
            SlotState::Booked { patient } => Some(patient),
        }
    }
}

/// A doctor's fixed five-slot schedule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Schedule {
    slots: [SlotState; SLOT_COUNT],
}

impl Schedule {
    pub fn slot(&self, index: SlotIndex) -> &SlotState {
        &self.slots[index.get()]
    }

    /// Slots paired with their index, in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &SlotState)> {
        SlotIndex::all().zip(self.slots.iter())
    }

    pub fn as_slice(&self) -> &[SlotState] {
        &self.slots
    }

    /// Transition a free slot to booked; returns false if it was already taken
    pub(crate) fn claim(&mut self, index: SlotIndex, patient: &Address) -> bool {
        let slot = &mut self.slots[index.get()];
        if !slot.is_free() {
            return false;
        }
        *slot = SlotState::Booked {
            patient: patient.clone(),
        };
        true
    }
}

// ============================================================================
// Appointments
// ============================================================================

/// A booking attempt as submitted by a patient
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingRequest {
    pub doctor: Address,
    pub slot: usize,
    pub patient: Address,
    pub fee_paid: u64,
}

/// The materialized booked state of one (doctor, slot) pair
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor: Address,
    pub slot: SlotIndex,
    pub patient: Address,
    pub fee_paid: u64,
    pub booked_at: DateTime<Utc>,
}
