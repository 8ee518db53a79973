pub mod discovery;
pub mod error;
pub mod reader;
pub mod registry;
pub mod tables;

pub use discovery::{DiscoveredTables, discover_tables};
pub use error::{IngestError, Result};
pub use reader::{RawTableReader, ReadOptions, for_each_chunk};
pub use registry::{AdmissionResolution, RegistryReport, StayRegistry};
pub use tables::TableSpec;
