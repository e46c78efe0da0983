//! Contig ordering declared by the two compared call sets.
//!
//! The order is seeded from VCF `##contig` header lines. Contigs no header
//! declares have no rank; the matcher orders those by how each stream
//! reaches them.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ContigOrder {
    ranks: HashMap<String, usize>,
}

impl ContigOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an order from header contig lists. Earlier lists take
    /// precedence; later lists only append contigs not yet declared.
    pub fn from_headers(headers: &[&[String]]) -> Self {
        let mut order = Self::new();
        for names in headers {
            for name in names.iter() {
                let next = order.ranks.len();
                order.ranks.entry(name.clone()).or_insert(next);
            }
        }
        order
    }

    pub fn rank(&self, name: &str) -> Option<usize> {
        self.ranks.get(name).copied()
    }
}
