use std::time::Instant;

use crate::job::Job;
use crate::preset::Preset;

pub struct PipelineContext {
    // Input
    pub job: Job,

    // Preset actually handed to the engine (after fallback)
    pub effective_preset: Preset,

    pub started: Instant,
}

impl PipelineContext {
    pub fn new(job: Job) -> Self {
        let effective_preset = job.preset;
        Self {
            job,
            effective_preset,
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
