//! Memory budget ledger
//!
//! Tracks the memory ceiling and the charge each loaded model holds
//! against it. Accounting uses each profile's declared estimate, not
//! measured resident memory. The ledger is the single place where the
//! "sum of charges never exceeds the ceiling" invariant is enforced.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Ledger of memory charges against a fixed ceiling.
#[derive(Debug)]
pub struct ResourceBudget {
    max_bytes: u64,
    charges: HashMap<String, u64>,
}

impl ResourceBudget {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            charges: HashMap::new(),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Sum of all outstanding charges.
    pub fn used(&self) -> u64 {
        self.charges.values().sum()
    }

    pub fn available(&self) -> u64 {
        self.max_bytes.saturating_sub(self.used())
    }

    /// Whether `bytes` could ever fit, even with everything else evicted.
    pub fn fits_ceiling(&self, bytes: u64) -> bool {
        bytes <= self.max_bytes
    }

    /// Record a charge for `name`. Fails if it would push usage past the
    /// ceiling; callers must evict first.
    pub fn charge(&mut self, name: &str, bytes: u64) -> Result<()> {
        if bytes > self.available() {
            return Err(Error::InvalidResource(format!(
                "model {name} requires {bytes} bytes, only {} available of {} ceiling",
                self.available(),
                self.max_bytes
            )));
        }
        self.charges.insert(name.to_string(), bytes);
        Ok(())
    }

    /// Release the charge for `name`, returning the bytes freed.
    pub fn release(&mut self, name: &str) -> u64 {
        self.charges.remove(name).unwrap_or(0)
    }
}
