//! Random baseline policy: uniform over the ladder except for the bootstrap
//! segment, which always starts at the lowest quality.

use rand::RngExt;

use crate::catalogue::Catalogue;
use crate::pipeline::{PipelineState, QualityPolicy};

#[derive(Debug, Default)]
pub struct RandomPolicy;

impl QualityPolicy for RandomPolicy {
    fn decide_quality(&mut self, index: i32, _state: &PipelineState, catalogue: &Catalogue) -> i32 {
        if index == 1 {
            return 0;
        }
        let k = catalogue.quality_count().max(1);
        rand::rng().random_range(0..k) as i32
    }
}
