//! Demographic statistics over the patient population.
//!
//! The engine is a total, pure function of a patient snapshot: deceased
//! patients are excluded, and an empty living population yields the
//! all-zero summary rather than an error.

use crate::Patient;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bounds (exclusive) of the children, teenage and young buckets
const CHILD_LIMIT: u32 = 13;
const TEEN_LIMIT: u32 = 20;
const YOUNG_LIMIT: u32 = 50;

/// Median age and age-bucket percentages of the living population
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Summary {
    /// Number of living patients the summary covers
    pub population: usize,
    pub median: f64,
    pub children: f64,
    pub teenage: f64,
    pub young: f64,
    pub elder: f64,
}

impl Summary {
    /// Sum of the four bucket percentages (100 unless the population is empty)
    pub fn bucket_total(&self) -> f64 {
        self.children + self.teenage + self.young + self.elder
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Median age:  {:.1}", self.median)?;
        writeln!(f, "Children:    {:.1}%", self.children)?;
        writeln!(f, "Teenage:     {:.1}%", self.teenage)?;
        writeln!(f, "Young:       {:.1}%", self.young)?;
        write!(f, "Elder:       {:.1}%", self.elder)
    }
}

/// Compute the demographic summary of a patient snapshot
pub fn compute_statistics(patients: &[Patient]) -> Summary {
    let mut ages: Vec<u32> = patients
        .iter()
        .filter(|p| !p.is_dead)
        .map(|p| p.age)
        .collect();

    if ages.is_empty() {
        return Summary::default();
    }

    ages.sort_unstable();

    let mut counts = [0usize; 4];
    for &age in &ages {
        let bucket = match age {
            a if a < CHILD_LIMIT => 0,
            a if a < TEEN_LIMIT => 1,
            a if a < YOUNG_LIMIT => 2,
            _ => 3,
        };
        counts[bucket] += 1;
    }

    let total = ages.len();
    let percent = |count: usize| count as f64 / total as f64 * 100.0;

    Summary {
        population: total,
        median: median(&ages),
        children: percent(counts[0]),
        teenage: percent(counts[1]),
        young: percent(counts[2]),
        elder: percent(counts[3]),
    }
}

/// Median of a non-empty, ascending slice
fn median(sorted: &[u32]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    } else {
        f64::from(sorted[mid])
    }
}
