//! ICU readmission flags.

use std::collections::BTreeMap;

use icustate_ingest::StayRegistry;
use icustate_model::StayId;

/// 1 for every stay that is not the first of its hospital admission.
///
/// Stays of an admission are ordered by `(intime, stay_id)`.
pub fn readmission_flags(registry: &StayRegistry) -> BTreeMap<StayId, i32> {
    registry
        .iter()
        .map(|stay| {
            let first = registry.stays_for_admission(stay.hadm_id).first();
            let flag = i32::from(first.is_some_and(|id| *id != stay.stay_id));
            (stay.stay_id, flag)
        })
        .collect()
}
