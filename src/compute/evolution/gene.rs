//! Connection genes and innovation numbering.

use crate::schema::{GeneRecord, SNAPSHOT_VERSION};

/// Node identifier. Inputs, hidden nodes and outputs occupy disjoint ranges.
pub type NodeId = i32;

/// An evolvable connection between two nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gene {
    /// Source node.
    pub into: NodeId,
    /// Target node.
    pub out: NodeId,
    pub weight: f32,
    pub enabled: bool,
    /// Historical marking used to align genes across genomes.
    pub innovation: i32,
}

impl Gene {
    /// Whether this gene connects the same pair of nodes as `other`.
    #[inline]
    pub fn same_link(&self, other: &Gene) -> bool {
        self.into == other.into && self.out == other.out
    }

    pub fn to_record(&self) -> GeneRecord {
        GeneRecord {
            version: SNAPSHOT_VERSION,
            into: self.into,
            out: self.out,
            weight: self.weight,
            enabled: self.enabled,
            innovation: self.innovation,
        }
    }

    pub fn from_record(record: &GeneRecord) -> Self {
        Self {
            into: record.into,
            out: record.out,
            weight: record.weight,
            enabled: record.enabled,
            innovation: record.innovation,
        }
    }
}

/// Monotonic innovation counter shared by the whole pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnovationCounter {
    last: i32,
}

impl InnovationCounter {
    /// Start counting after `last`; the first id handed out is `last + 1`.
    pub fn starting_after(last: i32) -> Self {
        Self { last }
    }

    /// Allocate a fresh innovation id.
    #[inline]
    pub fn next(&mut self) -> i32 {
        self.last += 1;
        self.last
    }

    /// Last id handed out.
    #[inline]
    pub fn last(&self) -> i32 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_innovations_are_monotonic() {
        let mut counter = InnovationCounter::starting_after(5);
        assert_eq!(counter.next(), 6);
        assert_eq!(counter.next(), 7);
        assert_eq!(counter.last(), 7);
    }

    #[test]
    fn test_same_link_ignores_weight_and_innovation() {
        let a = Gene {
            into: 1,
            out: 9,
            weight: 0.3,
            enabled: true,
            innovation: 10,
        };
        let b = Gene {
            weight: -1.0,
            innovation: 11,
            enabled: false,
            ..a
        };
        assert!(a.same_link(&b));
        assert!(!a.same_link(&Gene { out: 8, ..a }));
    }
}
