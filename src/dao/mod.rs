//! Persistence layer: store-agnostic document access and typed entities.

/// Minimal key/value document store contract and its implementations.
pub mod document_store;
/// Serde-typed shapes of the persisted documents.
pub mod entities;
/// Typed entity accessors layered over a [`document_store::DocumentStore`].
pub mod repository;
/// Storage-level error types shared by every backend.
pub mod storage;
