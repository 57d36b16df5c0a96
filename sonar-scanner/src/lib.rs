pub mod error;
pub mod fingerprint;
pub mod ports;
pub mod probe;
pub mod prompts;
pub mod report;
pub mod result;
pub mod summarize;

pub use error::ScanError;
pub use ports::PortScanner;
pub use probe::{HttpProber, Probe, ProbeOptions, ProberSettings, TargetKind};
pub use result::{Priority, Tag, TagKind, TargetResult};
pub use summarize::{AiProvider, Summarizer};
