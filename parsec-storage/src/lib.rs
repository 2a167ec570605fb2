//! `parsec-storage` is the client-side storage core of an end-to-end
//! encrypted, versioned, multi-user virtual file system: it turns file
//! operations (create/read/write/truncate/flush/commit/restore) into a
//! stream of encrypted, content-addressed objects exchanged with an
//! untrusted backend, while preserving integrity, version linearity, and
//! the ability to recover from partial failures.
//!
//! Three layers, leaves first:
//! - [`block`] -- immutable encrypted chunks addressed by opaque id.
//! - [`vlob`] -- versioned encrypted blobs describing a file's block
//!   layout, with optimistic concurrency via server-issued trust seeds.
//! - [`file`] -- the in-memory `File` engine: coalesces writes/truncates
//!   into new vlob versions and reclaims orphaned blocks.
//!
//! The command dispatch / JSON-RPC envelope that talks to the backend over
//! the wire, the user-identity subsystem, and the user-manifest directory
//! namespace that embeds this crate are all external collaborators and are
//! not implemented here.
//!
//! ## Getting started
//!
//! ```rust
//! use parsec_storage::block::InMemoryBlockStore;
//! use parsec_storage::config::SynchronizerConfig;
//! use parsec_storage::file::{File, FileRegistry};
//! use parsec_storage::sync::Synchronizer;
//! use parsec_storage::vlob::InMemoryVlobStore;
//!
//! fn main() -> parsec_storage::error::CResult<()> {
//!     let registry = FileRegistry::new();
//!     let mut sync = Synchronizer::new(InMemoryBlockStore::new(), InMemoryVlobStore::new());
//!     let config = SynchronizerConfig::default();
//!
//!     let handle = File::create(&registry, &mut sync, &config)?;
//!     let mut file = handle.lock().expect("file mutex poisoned");
//!     file.write(b"hello parsec".to_vec(), 0);
//!     file.commit(&mut sync, &registry)?;
//!
//!     assert_eq!(file.read(&mut sync, None, 0)?, b"hello parsec".to_vec());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod block;
pub mod config;
pub mod crypto;
pub mod effects;
pub mod encoding;
pub mod error;
pub mod executor;
pub mod file;
pub mod sync;
pub mod trace;
pub mod vlob;
