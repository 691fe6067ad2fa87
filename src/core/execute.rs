use serde::{Deserialize, Serialize};

/// Starting state of one generator instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningInstance {
    pub start_point: u32,
    pub transformation_shift: u32,
}

/// Request to sample a particle through the runner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub particle_name: String,
    pub samples_count: u32,
    #[serde(default)]
    pub running_instances: Vec<RunningInstance>,
}

impl ExecuteRequest {
    /// Instances as `(start_point, transformation_shift)` pairs.
    pub fn instance_pairs(&self) -> Vec<(u32, u32)> {
        self.running_instances
            .iter()
            .map(|ri| (ri.start_point, ri.transformation_shift))
            .collect()
    }
}

/// Values produced along one path of the particle tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Samples {
    pub path: String,
    pub data: Vec<u32>,
}
