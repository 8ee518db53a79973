use icustate_transform::StateAssembler;
use polars::prelude::DataFrame;

use crate::error::Result;

/// Turns a row slice of the derived frame into an output batch.
///
/// Implementations must be row-local: finalizing slices and concatenating
/// the results equals finalizing the whole frame.
pub trait BatchFinalizer {
    fn finalize_batch(&self, batch: &DataFrame) -> Result<DataFrame>;
}

impl BatchFinalizer for StateAssembler {
    fn finalize_batch(&self, batch: &DataFrame) -> Result<DataFrame> {
        Ok(self.finalize(batch)?)
    }
}
