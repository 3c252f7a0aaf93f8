//! Fixed-slot appointment scheduler.
//!
//! Each doctor has five slots that move one way, from free to booked.
//! Booking checks its preconditions in a fixed order (doctor role, slot
//! range, fee, availability) and the first failure is returned. The final
//! availability check is the store's atomic claim, so of several racing
//! bookers exactly one wins and the rest see `SlotUnavailable`. The
//! scheduler never retries; a caller whose booking timed out should
//! re-read the schedule before trying again.

use crate::config::BookingConfig;
use crate::{
    Address, Appointment, BookingRequest, Error, RecordStore, Result, Role, Schedule, SlotIndex,
};
use std::fmt;

/// Placeholder shown for a slot nobody has booked
pub const NO_APPOINTMENT: &str = "No appointment";

/// Fee rule applied to every booking
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookingPolicy {
    pub fee: u64,
}

impl From<&BookingConfig> for BookingPolicy {
    fn from(config: &BookingConfig) -> Self {
        Self { fee: config.fee }
    }
}

/// Read a doctor's schedule
///
/// The result may already be stale when returned; only `book` is
/// authoritative about availability.
pub fn get_schedule<S: RecordStore + ?Sized>(store: &S, doctor: &Address) -> Result<Schedule> {
    require_doctor(store, doctor)?;
    store.get_schedule(doctor)
}

/// Book a slot with a doctor
pub fn book<S: RecordStore + ?Sized>(
    store: &S,
    policy: &BookingPolicy,
    request: &BookingRequest,
) -> Result<Appointment> {
    require_doctor(store, &request.doctor)?;

    let slot = SlotIndex::new(request.slot)?;

    if request.fee_paid != policy.fee {
        return Err(Error::InsufficientPayment {
            required: policy.fee,
            paid: request.fee_paid,
        });
    }

    store.book_slot(&request.doctor, slot, &request.patient, request.fee_paid)
}

/// Unknown accounts count as `Role::None`
fn require_doctor<S: RecordStore + ?Sized>(store: &S, address: &Address) -> Result<()> {
    let role = match store.get_user(address) {
        Ok(user) => user.role,
        Err(Error::NotFound(_)) => Role::None,
        Err(e) => return Err(e),
    };

    match role {
        Role::Doctor => Ok(()),
        Role::None | Role::Admin | Role::Patient => Err(Error::RoleMismatch {
            address: address.to_string(),
            expected: Role::Doctor,
            actual: role,
        }),
    }
}

/// One display row of a schedule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub slot: SlotIndex,
    pub label: &'static str,
    pub patient: Option<Address>,
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.patient {
            Some(patient) => write!(f, "{}  {}", self.label, patient),
            None => write!(f, "{}  {}", self.label, NO_APPOINTMENT),
        }
    }
}

/// Rows for every slot in ascending index order
pub fn render_schedule(schedule: &Schedule) -> Vec<ScheduleEntry> {
    schedule
        .iter()
        .map(|(slot, state)| ScheduleEntry {
            slot,
            label: slot.label(),
            patient: state.patient().cloned(),
        })
        .collect()
}
