//! Horas prohibidas como inicio o fin de una clase

use std::collections::BTreeSet;

use serde::Serialize;

/// Resultado de una regla: horas del día (0-23) vetadas como inicio o como fin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Blacklist {
    pub start_hour: BTreeSet<u32>,
    pub end_hour: BTreeSet<u32>,
}

impl Blacklist {
    pub fn new(start_hour: BTreeSet<u32>, end_hour: BTreeSet<u32>) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_hour.is_empty() && self.end_hour.is_empty()
    }

    /// Unión con el resultado de otra regla
    pub fn merge(&mut self, other: Blacklist) {
        self.start_hour.extend(other.start_hour);
        self.end_hour.extend(other.end_hour);
    }

    pub fn allows(&self, start_hour: u32, end_hour: u32) -> bool {
        !self.start_hour.contains(&start_hour) && !self.end_hour.contains(&end_hour)
    }
}
