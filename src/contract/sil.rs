//! SIL specification: which structural subsets of the mesh a request
//! targets.
//!
//! The subset-inclusion lattice itself lives with the metadata catalog;
//! the pipeline only needs the *restriction*: which domains and materials
//! are in, plus an optional single data-chunk override.

use std::collections::BTreeSet;

/// Restriction over domains and materials. An empty restriction with
/// `use_restriction == false` means "all data".
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SilRestriction {
    /// Selected domain indices. Empty = all domains.
    pub domains: BTreeSet<usize>,
    /// Selected material names. Empty = all materials.
    pub materials: BTreeSet<String>,
}

impl SilRestriction {
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.materials.is_empty()
    }
}

/// Identifies which structural subsets of the mesh are included in a
/// request.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SilSpec {
    pub use_restriction: bool,
    pub restriction: SilRestriction,
    /// Optional single data-chunk index override.
    pub data_chunk: Option<usize>,
}

impl SilSpec {
    /// A specification that selects everything.
    pub fn all_data() -> Self {
        Self::default()
    }

    /// Restrict to an explicit set of domains.
    pub fn restricted_to_domains(domains: impl IntoIterator<Item = usize>) -> Self {
        Self {
            use_restriction: true,
            restriction: SilRestriction {
                domains: domains.into_iter().collect(),
                materials: BTreeSet::new(),
            },
            data_chunk: None,
        }
    }

    /// True iff no restriction and no chunk override are present.
    pub fn empty_specification(&self) -> bool {
        !self.use_restriction && self.restriction.is_empty() && self.data_chunk.is_none()
    }

    /// True iff this specification selects all data. An empty restriction
    /// with `use_restriction == false` behaves as "all data".
    pub fn uses_all_data(&self) -> bool {
        if self.data_chunk.is_some() {
            return false;
        }
        !self.use_restriction || self.restriction.is_empty()
    }

    /// Whether domain `d` is selected under this specification.
    pub fn uses_domain(&self, d: usize) -> bool {
        if let Some(chunk) = self.data_chunk {
            return chunk == d;
        }
        if !self.use_restriction || self.restriction.domains.is_empty() {
            return true;
        }
        self.restriction.domains.contains(&d)
    }

    /// Whether material `m` is selected.
    pub fn uses_material(&self, m: &str) -> bool {
        if !self.use_restriction || self.restriction.materials.is_empty() {
            return true;
        }
        self.restriction.materials.contains(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spec_uses_all_data() {
        let s = SilSpec::all_data();
        assert!(s.empty_specification());
        assert!(s.uses_all_data());
        assert!(s.uses_domain(0));
        assert!(s.uses_domain(17));
        assert!(s.uses_material("steel"));
    }

    #[test]
    fn domain_restriction() {
        let s = SilSpec::restricted_to_domains([1, 3]);
        assert!(!s.empty_specification());
        assert!(!s.uses_all_data());
        assert!(s.uses_domain(1));
        assert!(!s.uses_domain(2));
    }

    #[test]
    fn data_chunk_overrides() {
        let mut s = SilSpec::all_data();
        s.data_chunk = Some(4);
        assert!(!s.uses_all_data());
        assert!(s.uses_domain(4));
        assert!(!s.uses_domain(0));
    }
}
