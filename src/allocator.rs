// 🔢 Identifier Allocator - Surrogate ids for newly admitted companies
//
// next id = max(existing company_id) + 1, or 1 on an empty registry.
// Ids are handed out in input order, one at a time, no gaps.

use crate::records::{ClassifiedRecord, RegistryRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierAllocator {
    next: i64,
}

impl IdentifierAllocator {
    /// Continue after the highest id present in the snapshot
    pub fn from_registry(registry: &[RegistryRow]) -> Self {
        let max_id = registry.iter().map(|row| row.company_id).max().unwrap_or(0);
        Self::starting_at(max_id.max(0) + 1)
    }

    pub fn starting_at(first_id: i64) -> Self {
        IdentifierAllocator {
            next: first_id.max(1),
        }
    }

    /// Id the next call to `next_id` will return
    pub fn peek(&self) -> i64 {
        self.next
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Stamp an id on every record, in order
    pub fn allocate(&mut self, records: Vec<ClassifiedRecord>) -> Vec<ClassifiedRecord> {
        records
            .into_iter()
            .map(|mut record| {
                record.company_id = Some(self.next_id());
                record
            })
            .collect()
    }
}

/// Assign ids to NEW records, continuing from the registry's highest id
pub fn allocate_ids(new_records: Vec<ClassifiedRecord>, registry: &[RegistryRow]) -> Vec<ClassifiedRecord> {
    IdentifierAllocator::from_registry(registry).allocate(new_records)
}
