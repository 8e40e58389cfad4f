//! Resource symbol tables: loading, merging and emitting per-package artifacts.

pub mod classfile;
pub mod java;
pub mod loader;
pub mod pool;
pub mod static_ids;
pub mod writer;

pub use loader::{LoadedSymbols, PackageSymbolGroup, SymbolTableLoader};
pub use pool::{WorkerPool, default_threads};
pub use writer::{
    ArtifactKind, ClassFileSink, JavaSourceSink, PackageSymbolWriter, SymbolSink, resolve_package,
};
