//! gatekeeper-db – Datenzugriffs-Abstraktion
//!
//! Dieses Crate stellt das Repository-Pattern bereit, das das fuehrende
//! System (Benutzer-, Rollen- und API-Verwaltung) hinter schmalen
//! Schnittstellen abstrahiert. Der Kern konsumiert ausschliesslich diese
//! Traits; die In-Memory-Implementierungen dienen als Referenz fuer
//! Verdrahtung und Tests.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;

pub use error::{DbError, DbResult};
pub use memory::{MemoryRoleApiRepository, MemoryUserRepository};
pub use models::{ApiRecord, BenutzerRecord, RolleRecord};
pub use repository::{RoleApiRepository, UserRepository};
