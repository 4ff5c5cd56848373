use crate::{memory::Memory, trigger::RandomSource};

/// State which is lost across sessions
///
/// Punishment state (role membership, thread membership) intentionally has no home here:
/// Discord itself is the source of truth, and provisioning reconciles against it on every
/// run.
pub struct VolatileState {
    pub memory: Memory,
    pub rng: Box<dyn RandomSource>,
}

impl VolatileState {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            memory: Memory::new(),
            rng,
        }
    }
}
