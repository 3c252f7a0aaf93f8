//! CSV export of the patient list.
//!
//! Produces the same columns as the admin patient table, one row per
//! patient in id order, deceased patients included.

use crate::{Patient, Result};
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: u64,
    name: &'a str,
    age: u32,
    gender: &'a str,
    district: &'a str,
    vaccine_status: String,
    status: &'static str,
    symptoms: &'a str,
}

impl<'a> From<&'a Patient> for CsvRow<'a> {
    fn from(patient: &'a Patient) -> Self {
        CsvRow {
            id: patient.id,
            name: &patient.name,
            age: patient.age,
            gender: &patient.gender,
            district: &patient.district,
            vaccine_status: patient.vaccine_status.to_string(),
            status: patient.status_label(),
            symptoms: &patient.symptoms,
        }
    }
}

/// Write patients to a CSV file, replacing any previous export
///
/// Returns the number of rows written.
pub fn write_patients_csv(patients: &[Patient], csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(csv_path)?;
    for patient in patients {
        writer.serialize(CsvRow::from(patient))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} patients to {:?}", patients.len(), csv_path);
    Ok(patients.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, VaccineStatus};

    fn patient(id: u64, is_dead: bool) -> Patient {
        Patient {
            id,
            address: Address::new(format!("0x{}", id)),
            name: format!("Patient {}", id),
            age: 30 + id as u32,
            gender: "female".into(),
            vaccine_status: VaccineStatus::TwoDose,
            district: "Harbor, East".into(),
            symptoms: String::new(),
            is_dead,
        }
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out/patients.csv");

        let count = write_patients_csv(&[patient(0, false), patient(1, true)], &path).unwrap();
        assert_eq!(count, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,age,gender,district,vaccine_status,status,symptoms")
        );
        assert!(content.contains("\"Harbor, East\""));
        assert!(content.contains("Two Dose,Deceased"));
    }

    #[test]
    fn test_export_replaces_previous_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("patients.csv");

        write_patients_csv(&[patient(0, false), patient(1, false)], &path).unwrap();
        write_patients_csv(&[patient(0, false)], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
