pub mod cycle;
pub mod probe;

pub use cycle::CycleRunner;
pub use probe::{PingProber, ProbeSettings, Prober, probe};
