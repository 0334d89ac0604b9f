//! Autorisierungs-Engine
//!
//! Entscheidet ob ein Benutzer eine (URL, Methode)-Kombination aufrufen
//! darf. Grundlage sind die Rolle-zu-API-Bindungen aus dem
//! Berechtigungs-Cache; der erste Treffer gewinnt.

use std::collections::HashSet;
use std::sync::Arc;

use gatekeeper_core::ApiId;
use gatekeeper_db::{models::BenutzerRecord, repository::RoleApiRepository};

use crate::{
    error::{AuthError, AuthResult},
    permission_cache::PermissionCache,
};

/// Reservierter Name des Administratorkontos
///
/// Das Konto mit diesem Namen umgeht die Berechtigungspruefung vollstaendig.
/// Der Vergleich erfolgt ausschliesslich gegen die verifizierte Identitaet
/// aus dem Token, niemals gegen Eingaben des Aufrufers.
pub const ADMIN_BENUTZERNAME: &str = "admin";

/// Autorisierungs-Engine ueber dem Berechtigungs-Cache
pub struct AuthorizationService<R: RoleApiRepository> {
    cache: Arc<PermissionCache<R>>,
}

impl<R: RoleApiRepository + 'static> AuthorizationService<R> {
    /// Erstellt eine neue Engine
    pub fn neu(cache: Arc<PermissionCache<R>>) -> Arc<Self> {
        Arc::new(Self { cache })
    }

    /// Prueft ob der Benutzer die (URL, Methode)-Kombination aufrufen darf
    ///
    /// Ablauf: Rollen des Benutzers holen (Read-Through bei Cache-Miss),
    /// API-IDs aller Rollen dedupliziert einsammeln (eine von mehreren
    /// Rollen gebundene API wird nur einmal geprueft), dann gegen Methode
    /// und Pfad matchen. Der erste Treffer beendet die Suche.
    /// Ein leerer Schnappschuss liefert keine Treffer und lehnt damit ab.
    pub async fn zugriff_pruefen(
        &self,
        benutzer: &BenutzerRecord,
        url: &str,
        methode: &str,
    ) -> AuthResult<bool> {
        if benutzer.username == ADMIN_BENUTZERNAME {
            return Ok(true);
        }

        let rollen = self.cache.rollen_von(benutzer.id).await?;
        let schnappschuss = self.cache.schnappschuss();

        let mut api_ids: HashSet<ApiId> = HashSet::new();
        for rolle in &rollen {
            if let Some(ids) = schnappschuss.apis_der_rolle(*rolle) {
                api_ids.extend(ids);
            }
        }

        for api_id in api_ids {
            if let Some(eintrag) = schnappschuss.api(api_id) {
                if eintrag.passt(methode, url) {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Erfordert die Berechtigung – gibt einen Fehler zurueck wenn nicht erlaubt
    pub async fn zugriff_erfordern(
        &self,
        benutzer: &BenutzerRecord,
        url: &str,
        methode: &str,
    ) -> AuthResult<()> {
        if self.zugriff_pruefen(benutzer, url, methode).await? {
            Ok(())
        } else {
            Err(AuthError::ZugriffVerweigert(format!("{methode} {url}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uhr::TestUhr;
    use gatekeeper_core::UserId;
    use gatekeeper_db::MemoryRoleApiRepository;

    fn benutzer(id: i64, username: &str) -> BenutzerRecord {
        BenutzerRecord {
            id: UserId(id),
            username: username.to_string(),
            password_hash: "hash".into(),
            locked: false,
            login_failure_count: 0,
            last_failure_at: None,
        }
    }

    async fn engine_mit_bindung() -> (
        Arc<AuthorizationService<MemoryRoleApiRepository>>,
        Arc<MemoryRoleApiRepository>,
        BenutzerRecord,
    ) {
        let uhr = TestUhr::ab_jetzt();
        let repo = MemoryRoleApiRepository::neu();
        let rolle = repo.rolle_anlegen("leser").unwrap();
        let api = repo.api_anlegen("/config/role/{id}", "GET").unwrap();
        repo.api_binden(rolle.id, api.id);

        let u1 = benutzer(1, "u1");
        repo.rolle_zuweisen(u1.id, rolle.id);

        let cache = PermissionCache::neu(repo.clone(), 300, 600, uhr);
        cache.aktualisieren().await.unwrap();
        (AuthorizationService::neu(cache), repo, u1)
    }

    #[tokio::test]
    async fn gebundene_api_wird_erlaubt() {
        let (engine, _repo, u1) = engine_mit_bindung().await;

        assert!(engine
            .zugriff_pruefen(&u1, "/config/role/7", "GET")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn andere_methode_wird_abgelehnt() {
        let (engine, _repo, u1) = engine_mit_bindung().await;

        assert!(!engine
            .zugriff_pruefen(&u1, "/config/role/7", "DELETE")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn methodenvergleich_ignoriert_gross_kleinschreibung() {
        let (engine, _repo, u1) = engine_mit_bindung().await;

        assert!(engine
            .zugriff_pruefen(&u1, "/config/role/7", "get")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn benutzer_ohne_rollen_wird_abgelehnt() {
        let (engine, _repo, _u1) = engine_mit_bindung().await;
        let fremder = benutzer(99, "fremder");

        assert!(!engine
            .zugriff_pruefen(&fremder, "/config/role/7", "GET")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn leerer_schnappschuss_lehnt_ab() {
        let uhr = TestUhr::ab_jetzt();
        let repo = MemoryRoleApiRepository::neu();
        let rolle = repo.rolle_anlegen("leser").unwrap();
        let u1 = benutzer(1, "u1");
        repo.rolle_zuweisen(u1.id, rolle.id);

        // Keine Aktualisierung: Schnappschuss bleibt leer, Pruefung lehnt ab
        let cache = PermissionCache::neu(repo, 300, 600, uhr);
        let engine = AuthorizationService::neu(cache);

        assert!(!engine
            .zugriff_pruefen(&u1, "/config/role/7", "GET")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn admin_umgeht_pruefung_immer() {
        let uhr = TestUhr::ab_jetzt();
        let repo = MemoryRoleApiRepository::neu();
        let cache = PermissionCache::neu(repo, 300, 600, uhr);
        let engine = AuthorizationService::neu(cache);

        // Keine Rollen, keine Bindungen, leerer Schnappschuss
        let admin = benutzer(1, ADMIN_BENUTZERNAME);
        assert!(engine
            .zugriff_pruefen(&admin, "/beliebig/irgendwo", "DELETE")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn zugriff_erfordern_meldet_verweigerung() {
        let (engine, _repo, u1) = engine_mit_bindung().await;

        assert!(engine
            .zugriff_erfordern(&u1, "/config/role/7", "GET")
            .await
            .is_ok());
        let ergebnis = engine.zugriff_erfordern(&u1, "/config/role/7", "DELETE").await;
        assert!(matches!(ergebnis, Err(AuthError::ZugriffVerweigert(_))));
    }
}
