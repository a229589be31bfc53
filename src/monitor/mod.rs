//! Process discovery and metric sampling.

mod matcher;
mod provider;
mod sample;
mod sampler;

#[cfg(test)]
pub(crate) use provider::MockProbe;
pub use provider::{ActiveProbe, ProcessProbe};
pub use sample::{ProcessRole, Sample};
pub use sampler::{Sampler, SamplerOptions};
