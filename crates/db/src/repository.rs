//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt den Autorisierungskern von der
//! konkreten Anbindung an das fuehrende System. Der Kern behandelt jeden
//! Fehler dieser Schnittstellen als ein einzelnes Ausfallsignal und
//! wiederholt Zugriffe nicht selbst.

use chrono::{DateTime, Utc};
use gatekeeper_core::{ApiId, RoleId, UserId};

use crate::{
    error::DbResult,
    models::{ApiRecord, BenutzerRecord, RolleRecord},
};

/// Repository fuer Benutzer-Datenzugriffe
///
/// Schreibzugriffe auf die Fehlversuchszaehler muessen pro Benutzer
/// serialisiert erfolgen (Zeilensperre o. ae.), damit konkurrierende
/// fehlgeschlagene Logins keine Inkremente verlieren.
#[allow(async_fn_in_trait)]
pub trait UserRepository: Send + Sync {
    /// Einen Benutzer anhand seiner ID laden
    async fn get_by_id(&self, id: UserId) -> DbResult<Option<BenutzerRecord>>;

    /// Einen Benutzer anhand seines Namens laden
    async fn get_by_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>>;

    /// Fehlversuchszaehler und juengsten Fehlversuchszeitpunkt schreiben
    async fn update_failure_counter(
        &self,
        id: UserId,
        count: u32,
        last_failure_at: Option<DateTime<Utc>>,
    ) -> DbResult<()>;

    /// Administrative Sperre setzen oder aufheben
    async fn set_locked(&self, id: UserId, locked: bool) -> DbResult<()>;
}

/// Repository fuer Rollen- und API-Datenzugriffe
#[allow(async_fn_in_trait)]
pub trait RoleApiRepository: Send + Sync {
    /// Alle registrierten APIs laden (fuer den Bulk-Aufbau des Schnappschusses)
    async fn all_apis(&self) -> DbResult<Vec<ApiRecord>>;

    /// Alle Rollen laden
    async fn all_roles(&self) -> DbResult<Vec<RolleRecord>>;

    /// API-IDs einer Rolle laden
    async fn api_ids_of_role(&self, role_id: RoleId) -> DbResult<Vec<ApiId>>;

    /// Rollen-IDs eines Benutzers laden
    async fn role_ids_of_user(&self, user_id: UserId) -> DbResult<Vec<RoleId>>;
}
