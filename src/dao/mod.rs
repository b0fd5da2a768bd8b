/// Backends persisting raw JSON documents.
pub mod document_store;
/// Entity definitions stored by the application.
pub mod models;
/// Typed access to a collection of entities.
pub mod repository;
/// Storage abstraction layer for database operations.
pub mod storage;
