//! Boundary validation for account registration and patient updates.

use crate::{Error, PatientRegistration, Result, Role};

/// Check the inputs of a non-patient registration
///
/// Patients must register through [`validate_patient`] so their record is
/// created alongside the account; `Role::None` is never registrable.
pub fn validate_user(name: &str, role: Role) -> Result<()> {
    match role {
        Role::None => Err(Error::Validation("a role must be selected".into())),
        Role::Patient => Err(Error::Validation(
            "patients register with their patient details".into(),
        )),
        Role::Admin | Role::Doctor => require("name", name),
    }
}

/// Check the required fields of a patient registration
pub fn validate_patient(details: &PatientRegistration) -> Result<()> {
    require("name", &details.name)?;
    require("gender", &details.gender)?;
    require("district", &details.district)?;
    Ok(())
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(())
}
