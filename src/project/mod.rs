mod discovery;

pub use discovery::{PackageKind, detect_package, discover_build_files};
