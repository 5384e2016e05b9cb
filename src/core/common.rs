//! Shared primitives used across the node and workload models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identity and labeling metadata shared by nodes and workloads, mirroring the
/// `metadata` section of a Kubernetes API object.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub creation_timestamp: f64,
}

/// A multi-dimensional resource vector: cpu in millicores, memory in bytes, plus an
/// open-ended map of named extended resources (e.g. `nvidia.com/gpu`).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Resources {
    pub cpu: u32,
    pub memory: u64,
    #[serde(default)]
    pub extended: HashMap<String, i64>,
}

impl Resources {
    pub fn new(cpu: u32, memory: u64) -> Self {
        Self {
            cpu,
            memory,
            extended: Default::default(),
        }
    }

    /// Returns `true` if every dimension of `self` is less than or equal to the matching
    /// dimension of `other`. Extended resources absent from `other` are treated as zero.
    pub fn fits_within(&self, other: &Resources) -> bool {
        if self.cpu > other.cpu || self.memory > other.memory {
            return false;
        }
        for (name, quantity) in self.extended.iter() {
            let available = other.extended.get(name).copied().unwrap_or(0);
            if *quantity > available {
                return false;
            }
        }
        true
    }

    pub fn saturating_sub(&self, other: &Resources) -> Resources {
        let mut extended = self.extended.clone();
        for (name, quantity) in other.extended.iter() {
            let entry = extended.entry(name.clone()).or_insert(0);
            *entry = (*entry - quantity).max(0);
        }
        Resources {
            cpu: self.cpu.saturating_sub(other.cpu),
            memory: self.memory.saturating_sub(other.memory),
            extended,
        }
    }

    pub fn add(&self, other: &Resources) -> Resources {
        let mut extended = self.extended.clone();
        for (name, quantity) in other.extended.iter() {
            *extended.entry(name.clone()).or_insert(0) += quantity;
        }
        Resources {
            cpu: self.cpu + other.cpu,
            memory: self.memory + other.memory,
            extended,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.cpu == 0 && self.memory == 0 && self.extended.values().all(|v| *v == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_within_checks_all_dimensions() {
        let request = Resources::new(100, 1024);
        let allocatable = Resources::new(200, 2048);
        assert!(request.fits_within(&allocatable));
        assert!(!allocatable.fits_within(&request));
    }

    #[test]
    fn fits_within_considers_extended_resources() {
        let mut request = Resources::new(100, 1024);
        request.extended.insert("gpu".to_string(), 2);

        let mut allocatable = Resources::new(200, 2048);
        allocatable.extended.insert("gpu".to_string(), 1);
        assert!(!request.fits_within(&allocatable));

        allocatable.extended.insert("gpu".to_string(), 2);
        assert!(request.fits_within(&allocatable));
    }

    #[test]
    fn saturating_sub_never_underflows() {
        let a = Resources::new(100, 1024);
        let b = Resources::new(200, 2048);
        let diff = a.saturating_sub(&b);
        assert_eq!(diff.cpu, 0);
        assert_eq!(diff.memory, 0);
    }
}
