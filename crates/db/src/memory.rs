//! In-Memory-Implementierungen der Repository-Traits
//!
//! Referenz-Implementierungen fuer Verdrahtung und Tests. Alle Schreibzugriffe
//! laufen unter der Schreibsperre der jeweiligen Map und sind damit pro
//! Benutzer serialisiert. Die Mutations-Hilfsmethoden (anlegen, zuweisen,
//! binden) gehoeren nicht zu den Traits – sie bilden die Verwaltungsseite
//! des fuehrenden Systems nach.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use gatekeeper_core::{ApiId, RoleId, UserId};

use crate::{
    error::{DbError, DbResult},
    models::{ApiRecord, BenutzerRecord, RolleRecord},
    repository::{RoleApiRepository, UserRepository},
};

/// In-Memory-Benutzerspeicher
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    benutzer: RwLock<Innen>,
}

#[derive(Debug, Default)]
struct Innen {
    records: HashMap<UserId, BenutzerRecord>,
    naechste_id: i64,
}

impl MemoryUserRepository {
    pub fn neu() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    /// Legt einen neuen Benutzer an und vergibt die naechste freie ID
    pub fn anlegen(&self, username: &str, password_hash: &str) -> DbResult<BenutzerRecord> {
        let mut innen = self.benutzer.write();
        if innen.records.values().any(|b| b.username == username) {
            return Err(DbError::Eindeutigkeit(format!(
                "Benutzername bereits vergeben: {username}"
            )));
        }
        innen.naechste_id += 1;
        let record = BenutzerRecord {
            id: UserId(innen.naechste_id),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            locked: false,
            login_failure_count: 0,
            last_failure_at: None,
        };
        innen.records.insert(record.id, record.clone());
        Ok(record)
    }
}

impl UserRepository for MemoryUserRepository {
    async fn get_by_id(&self, id: UserId) -> DbResult<Option<BenutzerRecord>> {
        Ok(self.benutzer.read().records.get(&id).cloned())
    }

    async fn get_by_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>> {
        Ok(self
            .benutzer
            .read()
            .records
            .values()
            .find(|b| b.username == username)
            .cloned())
    }

    async fn update_failure_counter(
        &self,
        id: UserId,
        count: u32,
        last_failure_at: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        let mut innen = self.benutzer.write();
        let record = innen
            .records
            .get_mut(&id)
            .ok_or_else(|| DbError::nicht_gefunden(id.to_string()))?;
        record.login_failure_count = count;
        if last_failure_at.is_some() {
            record.last_failure_at = last_failure_at;
        }
        Ok(())
    }

    async fn set_locked(&self, id: UserId, locked: bool) -> DbResult<()> {
        let mut innen = self.benutzer.write();
        let record = innen
            .records
            .get_mut(&id)
            .ok_or_else(|| DbError::nicht_gefunden(id.to_string()))?;
        record.locked = locked;
        Ok(())
    }
}

/// In-Memory-Speicher fuer Rollen, APIs und ihre Zuordnungen
#[derive(Debug, Default)]
pub struct MemoryRoleApiRepository {
    innen: RwLock<RollenApiInnen>,
}

#[derive(Debug, Default)]
struct RollenApiInnen {
    apis: HashMap<ApiId, ApiRecord>,
    rollen: HashMap<RoleId, RolleRecord>,
    rollen_apis: HashMap<RoleId, HashSet<ApiId>>,
    benutzer_rollen: HashMap<UserId, HashSet<RoleId>>,
    naechste_api_id: i64,
    naechste_rollen_id: i64,
}

impl MemoryRoleApiRepository {
    pub fn neu() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    /// Registriert eine API; (url, Methode) muss eindeutig sein
    pub fn api_anlegen(&self, url: &str, method: &str) -> DbResult<ApiRecord> {
        let method = method.to_ascii_uppercase();
        let mut innen = self.innen.write();
        if innen
            .apis
            .values()
            .any(|a| a.url == url && a.method == method)
        {
            return Err(DbError::Eindeutigkeit(format!("{method} {url}")));
        }
        innen.naechste_api_id += 1;
        let record = ApiRecord {
            id: ApiId(innen.naechste_api_id),
            url: url.to_string(),
            method,
            beschreibung: None,
        };
        innen.apis.insert(record.id, record.clone());
        Ok(record)
    }

    /// Legt eine Rolle an
    pub fn rolle_anlegen(&self, name: &str) -> DbResult<RolleRecord> {
        let mut innen = self.innen.write();
        if innen.rollen.values().any(|r| r.name == name) {
            return Err(DbError::Eindeutigkeit(format!("Rollenname: {name}")));
        }
        innen.naechste_rollen_id += 1;
        let record = RolleRecord {
            id: RoleId(innen.naechste_rollen_id),
            name: name.to_string(),
            beschreibung: None,
        };
        innen.rollen.insert(record.id, record.clone());
        innen.rollen_apis.insert(record.id, HashSet::new());
        Ok(record)
    }

    /// Bindet eine API an eine Rolle (Grant)
    pub fn api_binden(&self, role_id: RoleId, api_id: ApiId) {
        let mut innen = self.innen.write();
        innen.rollen_apis.entry(role_id).or_default().insert(api_id);
    }

    /// Loest eine API-Bindung von einer Rolle
    pub fn bindung_loesen(&self, role_id: RoleId, api_id: ApiId) {
        let mut innen = self.innen.write();
        if let Some(apis) = innen.rollen_apis.get_mut(&role_id) {
            apis.remove(&api_id);
        }
    }

    /// Weist einem Benutzer eine Rolle zu
    pub fn rolle_zuweisen(&self, user_id: UserId, role_id: RoleId) {
        let mut innen = self.innen.write();
        innen
            .benutzer_rollen
            .entry(user_id)
            .or_default()
            .insert(role_id);
    }

    /// Entzieht einem Benutzer eine Rolle
    pub fn rolle_entziehen(&self, user_id: UserId, role_id: RoleId) {
        let mut innen = self.innen.write();
        if let Some(rollen) = innen.benutzer_rollen.get_mut(&user_id) {
            rollen.remove(&role_id);
        }
    }
}

impl RoleApiRepository for MemoryRoleApiRepository {
    async fn all_apis(&self) -> DbResult<Vec<ApiRecord>> {
        Ok(self.innen.read().apis.values().cloned().collect())
    }

    async fn all_roles(&self) -> DbResult<Vec<RolleRecord>> {
        Ok(self.innen.read().rollen.values().cloned().collect())
    }

    async fn api_ids_of_role(&self, role_id: RoleId) -> DbResult<Vec<ApiId>> {
        Ok(self
            .innen
            .read()
            .rollen_apis
            .get(&role_id)
            .map(|apis| apis.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn role_ids_of_user(&self, user_id: UserId) -> DbResult<Vec<RoleId>> {
        Ok(self
            .innen
            .read()
            .benutzer_rollen
            .get(&user_id)
            .map(|rollen| rollen.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn benutzer_anlegen_und_laden() {
        let repo = MemoryUserRepository::neu();
        let angelegt = repo.anlegen("erika", "hash").unwrap();

        let geladen = repo.get_by_id(angelegt.id).await.unwrap().unwrap();
        assert_eq!(geladen.username, "erika");
        assert_eq!(geladen.login_failure_count, 0);
        assert!(!geladen.locked);

        let nach_name = repo.get_by_name("erika").await.unwrap().unwrap();
        assert_eq!(nach_name.id, angelegt.id);
    }

    #[tokio::test]
    async fn doppelter_benutzername_abgelehnt() {
        let repo = MemoryUserRepository::neu();
        repo.anlegen("doppelt", "hash").unwrap();
        let ergebnis = repo.anlegen("doppelt", "anderer_hash");
        assert!(matches!(ergebnis, Err(DbError::Eindeutigkeit(_))));
    }

    #[tokio::test]
    async fn fehlversuchszaehler_schreiben() {
        let repo = MemoryUserRepository::neu();
        let benutzer = repo.anlegen("zaehler", "hash").unwrap();

        let jetzt = Utc::now();
        repo.update_failure_counter(benutzer.id, 3, Some(jetzt))
            .await
            .unwrap();

        let geladen = repo.get_by_id(benutzer.id).await.unwrap().unwrap();
        assert_eq!(geladen.login_failure_count, 3);
        assert_eq!(geladen.last_failure_at, Some(jetzt));

        // Reset auf 0 ohne neuen Zeitstempel laesst den alten stehen
        repo.update_failure_counter(benutzer.id, 0, None)
            .await
            .unwrap();
        let geladen = repo.get_by_id(benutzer.id).await.unwrap().unwrap();
        assert_eq!(geladen.login_failure_count, 0);
        assert_eq!(geladen.last_failure_at, Some(jetzt));
    }

    #[tokio::test]
    async fn sperre_setzen_und_aufheben() {
        let repo = MemoryUserRepository::neu();
        let benutzer = repo.anlegen("gesperrt", "hash").unwrap();

        repo.set_locked(benutzer.id, true).await.unwrap();
        assert!(repo.get_by_id(benutzer.id).await.unwrap().unwrap().locked);

        repo.set_locked(benutzer.id, false).await.unwrap();
        assert!(!repo.get_by_id(benutzer.id).await.unwrap().unwrap().locked);
    }

    #[tokio::test]
    async fn api_eindeutigkeit_pro_url_und_methode() {
        let repo = MemoryRoleApiRepository::neu();
        repo.api_anlegen("/config/role/{id}", "GET").unwrap();

        // Gleiche URL, gleiche Methode (auch kleingeschrieben): abgelehnt
        let ergebnis = repo.api_anlegen("/config/role/{id}", "get");
        assert!(matches!(ergebnis, Err(DbError::Eindeutigkeit(_))));

        // Gleiche URL, andere Methode: erlaubt
        repo.api_anlegen("/config/role/{id}", "DELETE").unwrap();
    }

    #[tokio::test]
    async fn rollen_und_bindungen() {
        let repo = MemoryRoleApiRepository::neu();
        let rolle = repo.rolle_anlegen("leser").unwrap();
        let api = repo.api_anlegen("/config/api", "GET").unwrap();

        repo.api_binden(rolle.id, api.id);
        assert_eq!(repo.api_ids_of_role(rolle.id).await.unwrap(), vec![api.id]);

        repo.bindung_loesen(rolle.id, api.id);
        assert!(repo.api_ids_of_role(rolle.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn benutzer_rollen_zuweisung() {
        let repo = MemoryRoleApiRepository::neu();
        let rolle = repo.rolle_anlegen("leser").unwrap();
        let uid = UserId(1);

        assert!(repo.role_ids_of_user(uid).await.unwrap().is_empty());

        repo.rolle_zuweisen(uid, rolle.id);
        assert_eq!(repo.role_ids_of_user(uid).await.unwrap(), vec![rolle.id]);

        repo.rolle_entziehen(uid, rolle.id);
        assert!(repo.role_ids_of_user(uid).await.unwrap().is_empty());
    }
}
