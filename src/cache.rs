//! Concurrent, append-only cache of [`Plan`]s keyed by [`TypeId`].
//!
//! Encode and decode plans are cached separately, matching spec's own
//! split between the two dispatch tables even though both are built by the
//! same [`crate::plan::build`] — it keeps a lookup from ever paying for
//! the other direction's plan.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::CodecError;
use crate::key::{Codable, Descriptor};
use crate::plan::{self, Plan};

/// Builds and caches [`Plan`]s for every type this process has encoded or
/// decoded. A writer that loses the race to insert a freshly built plan
/// simply discards it and returns whichever one is already present — both
/// are built by the same deterministic [`plan::build`], so either is
/// correct.
#[derive(Default)]
pub struct PlanCache {
    encode: RwLock<HashMap<TypeId, Arc<Plan>>>,
    decode: RwLock<HashMap<TypeId, Arc<Plan>>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self { encode: RwLock::new(HashMap::new()), decode: RwLock::new(HashMap::new()) }
    }

    pub fn encode_plan<T: Codable>(&self) -> Result<Arc<Plan>, CodecError> {
        self.plan_for::<T>(&self.encode)
    }

    pub fn decode_plan<T: Codable>(&self) -> Result<Arc<Plan>, CodecError> {
        self.plan_for::<T>(&self.decode)
    }

    fn plan_for<T: Codable>(
        &self,
        table: &RwLock<HashMap<TypeId, Arc<Plan>>>,
    ) -> Result<Arc<Plan>, CodecError> {
        let type_id = TypeId::of::<T>();
        if let Some(plan) = table.read().unwrap().get(&type_id) {
            return Ok(plan.clone());
        }

        let desc: Descriptor = T::describe();
        let built = Arc::new(plan::build(&desc)?);

        let mut guard = table.write().unwrap();
        let plan = guard.entry(type_id).or_insert(built).clone();
        Ok(plan)
    }

    pub fn len(&self) -> (usize, usize) {
        (self.encode.read().unwrap().len(), self.decode.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_reuse_the_same_plan() {
        let cache = PlanCache::new();
        let a = cache.encode_plan::<i64>().unwrap();
        let b = cache.encode_plan::<i64>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn encode_and_decode_tables_are_independent() {
        let cache = PlanCache::new();
        cache.encode_plan::<i64>().unwrap();
        let (enc, dec) = cache.len();
        assert_eq!(enc, 1);
        assert_eq!(dec, 0);
    }
}
