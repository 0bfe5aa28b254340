//! Raw OS counter readers.
//!
//! ```text
//!   CounterSource (trait) ── RawReadings::read_all ──► rates::DeltaAccountant
//!        │
//!        ├── ProcfsSource<F: FileSystem>   /proc + /sys parsers
//!        │        ├── RealFs
//!        │        └── MockFs (+ scenarios)
//!        └── UnsupportedSource             non-Linux fallback
//! ```
//!
//! # Testing (with MockFs)
//!
//! ```
//! use perfctx_core::collector::{CounterSource, MockFs, ProcfsSource};
//!
//! let mut source = ProcfsSource::new(MockFs::typical_system(), "/proc", "/sys");
//! let memory = source.read_memory().unwrap();
//! assert!(memory.mem_total_kb > 0);
//! ```

pub mod mock;
pub mod parser;
pub mod source;
pub mod traits;

pub use mock::MockFs;
pub use parser::ParseError;
pub use source::{
    default_counter_source, is_relevant_disk, CollectError, CounterSource, NetworkReading,
    ProcfsSource, RawReadings, ThermalReading, UnsupportedSource,
};
pub use traits::{FileSystem, RealFs};
