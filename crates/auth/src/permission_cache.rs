//! Prozessweiter Berechtigungs-Cache
//!
//! Haelt einen unveraenderlichen, versionierten Schnappschuss aller APIs und
//! Rolle-zu-API-Bindungen. Eine Aktualisierung baut den neuen Schnappschuss
//! vollstaendig ausserhalb der Sperre auf und tauscht dann nur einen Zeiger:
//! Leser sehen immer entweder den alten oder den neuen kompletten Stand,
//! niemals einen teilweisen.
//!
//! Die Rollen eines Benutzers sind bewusst NICHT Teil des Schnappschusses:
//! sie werden pro Benutzer beim ersten Zugriff nachgeladen und mit eigener
//! TTL gehalten. Aenderungen an Bindungen oder Rollen greifen damit
//! spaetestens nach Aktualisierungsintervall + Rollen-TTL.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use gatekeeper_core::{ApiId, RoleId, UserId};
use gatekeeper_db::{models::ApiRecord, repository::RoleApiRepository};

use crate::{
    error::AuthResult,
    path_matcher::PathMatcher,
    uhr::Uhr,
};

/// Ein Schnappschuss-Eintrag: API-Datensatz plus vorkompilierter Matcher
#[derive(Debug, Clone)]
pub struct KompilierteApi {
    pub api: ApiRecord,
    matcher: PathMatcher,
}

impl KompilierteApi {
    /// Prueft Methode (ohne Beachtung der Gross-/Kleinschreibung) und Pfad
    pub fn passt(&self, methode: &str, url: &str) -> bool {
        self.api.method.eq_ignore_ascii_case(methode) && self.matcher.passt(url)
    }
}

/// Unveraenderlicher Schnappschuss der Berechtigungsdaten
///
/// Nach dem Aufbau wird nicht mehr geschrieben; eine Aktualisierung
/// veroeffentlicht einen komplett neuen Schnappschuss.
#[derive(Debug, Default)]
pub struct PermissionSnapshot {
    pub version: u64,
    api_by_id: HashMap<ApiId, KompilierteApi>,
    apis_of_role: HashMap<RoleId, HashSet<ApiId>>,
}

impl PermissionSnapshot {
    /// Leerer Startzustand (Version 0, vor der ersten Aktualisierung)
    pub fn leer() -> Self {
        Self::default()
    }

    pub fn api(&self, id: ApiId) -> Option<&KompilierteApi> {
        self.api_by_id.get(&id)
    }

    pub fn apis_der_rolle(&self, id: RoleId) -> Option<&HashSet<ApiId>> {
        self.apis_of_role.get(&id)
    }

    pub fn api_anzahl(&self) -> usize {
        self.api_by_id.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.api_by_id.is_empty()
    }
}

/// Rollen-Cache-Eintrag eines Benutzers mit eigener Ablaufzeit
#[derive(Debug, Clone)]
struct RollenEintrag {
    role_ids: HashSet<RoleId>,
    laeuft_ab_am: DateTime<Utc>,
}

/// Berechtigungs-Cache mit periodischer Aktualisierung
pub struct PermissionCache<R: RoleApiRepository> {
    repo: Arc<R>,
    /// Aktueller Schnappschuss; Schreibzugriff ist ein einzelner Zeigertausch
    schnappschuss: RwLock<Arc<PermissionSnapshot>>,
    /// user_id -> Rollen-IDs mit eigener TTL (lazy befuellt)
    rollen_cache: DashMap<UserId, RollenEintrag>,
    rollen_ttl: Duration,
    aktualisierungs_intervall: StdDuration,
    version: AtomicU64,
    uhr: Arc<dyn Uhr>,
}

impl<R: RoleApiRepository + 'static> PermissionCache<R> {
    /// Erstellt einen neuen Cache mit leerem Schnappschuss
    ///
    /// Vor dem ersten Bedienen von Anfragen muss einmal `aktualisieren()`
    /// laufen; ein leerer Schnappschuss lehnt jede Pruefung ab.
    pub fn neu(
        repo: Arc<R>,
        rollen_ttl_sekunden: i64,
        aktualisierungs_intervall_sekunden: u64,
        uhr: Arc<dyn Uhr>,
    ) -> Arc<Self> {
        Arc::new(Self {
            repo,
            schnappschuss: RwLock::new(Arc::new(PermissionSnapshot::leer())),
            rollen_cache: DashMap::new(),
            rollen_ttl: Duration::seconds(rollen_ttl_sekunden),
            aktualisierungs_intervall: StdDuration::from_secs(aktualisierungs_intervall_sekunden),
            version: AtomicU64::new(0),
            uhr,
        })
    }

    /// Startet die periodische Aktualisierung als eigenstaendigen Task
    ///
    /// Laeuft auf einem eigenen Thread mit block_on, da async_fn_in_trait
    /// keine Send-Garantie fuer die Repository-Futures bietet.
    pub fn aktualisierungs_task_starten(cache: Arc<Self>) {
        let handle = tokio::runtime::Handle::current();
        std::thread::spawn(move || {
            handle.block_on(async move {
                loop {
                    tokio::time::sleep(cache.aktualisierungs_intervall).await;
                    if let Err(e) = cache.aktualisieren().await {
                        tracing::error!("Fehler bei der Schnappschuss-Aktualisierung: {}", e);
                    }
                }
            });
        });
    }

    /// Laedt alle APIs und Rollenbindungen und tauscht den Schnappschuss atomar
    ///
    /// Schlaegt der Aufbau fehl, bleibt der bisherige Schnappschuss
    /// unveraendert stehen.
    pub async fn aktualisieren(&self) -> AuthResult<()> {
        let apis = self.repo.all_apis().await?;
        let rollen = self.repo.all_roles().await?;

        let mut api_by_id = HashMap::with_capacity(apis.len());
        for api in apis {
            match PathMatcher::kompilieren(&api.url) {
                Ok(matcher) => {
                    api_by_id.insert(api.id, KompilierteApi { api, matcher });
                }
                Err(e) => {
                    // Nicht kompilierbare Templates koennen nie matchen (fail closed)
                    tracing::warn!(
                        api_id = %api.id,
                        url = %api.url,
                        fehler = %e,
                        "API-Template uebersprungen"
                    );
                }
            }
        }

        let mut apis_of_role = HashMap::with_capacity(rollen.len());
        for rolle in rollen {
            let api_ids: HashSet<ApiId> =
                self.repo.api_ids_of_role(rolle.id).await?.into_iter().collect();
            apis_of_role.insert(rolle.id, api_ids);
        }

        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        let neuer = Arc::new(PermissionSnapshot {
            version,
            api_by_id,
            apis_of_role,
        });

        let apis = neuer.api_anzahl();
        let rollen = neuer.apis_of_role.len();
        *self.schnappschuss.write() = neuer;

        tracing::info!(version, apis, rollen, "Berechtigungs-Schnappschuss veroeffentlicht");
        Ok(())
    }

    /// Gibt den aktuellen Schnappschuss zurueck
    ///
    /// Leser blockieren nie auf eine laufende Aktualisierung; sie arbeiten
    /// bis zum Zeigertausch mit dem bisherigen Stand weiter.
    pub fn schnappschuss(&self) -> Arc<PermissionSnapshot> {
        self.schnappschuss.read().clone()
    }

    /// Rollen-IDs eines Benutzers, mit synchronem Read-Through bei
    /// Cache-Miss oder abgelaufener TTL
    pub async fn rollen_von(&self, uid: UserId) -> AuthResult<HashSet<RoleId>> {
        let jetzt = self.uhr.jetzt();

        if let Some(eintrag) = self.rollen_cache.get(&uid) {
            if eintrag.laeuft_ab_am > jetzt {
                return Ok(eintrag.role_ids.clone());
            }
        }

        let role_ids: HashSet<RoleId> =
            self.repo.role_ids_of_user(uid).await?.into_iter().collect();
        self.rollen_cache.insert(
            uid,
            RollenEintrag {
                role_ids: role_ids.clone(),
                laeuft_ab_am: jetzt + self.rollen_ttl,
            },
        );
        tracing::debug!(user_id = %uid, rollen = role_ids.len(), "Rollen nachgeladen");
        Ok(role_ids)
    }

    /// Anzahl gehaltener Rollen-Cache-Eintraege
    pub fn rollen_cache_groesse(&self) -> usize {
        self.rollen_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uhr::TestUhr;
    use gatekeeper_db::{DbError, DbResult, MemoryRoleApiRepository};
    use gatekeeper_db::models::RolleRecord;

    const ROLLEN_TTL: i64 = 5 * 60;

    fn cache_mit_repo() -> (Arc<PermissionCache<MemoryRoleApiRepository>>, Arc<MemoryRoleApiRepository>, Arc<TestUhr>)
    {
        let uhr = TestUhr::ab_jetzt();
        let repo = MemoryRoleApiRepository::neu();
        let cache = PermissionCache::neu(repo.clone(), ROLLEN_TTL, 600, uhr.clone());
        (cache, repo, uhr)
    }

    #[tokio::test]
    async fn startzustand_ist_leer_und_version_null() {
        let (cache, _repo, _uhr) = cache_mit_repo();
        let schnappschuss = cache.schnappschuss();
        assert!(schnappschuss.ist_leer());
        assert_eq!(schnappschuss.version, 0);
    }

    #[tokio::test]
    async fn aktualisieren_veroeffentlicht_neuen_schnappschuss() {
        let (cache, repo, _uhr) = cache_mit_repo();
        let rolle = repo.rolle_anlegen("leser").unwrap();
        let api = repo.api_anlegen("/config/role/{id}", "GET").unwrap();
        repo.api_binden(rolle.id, api.id);

        let alter = cache.schnappschuss();
        cache.aktualisieren().await.unwrap();
        let neuer = cache.schnappschuss();

        // Der alte Arc bleibt unveraendert, der neue traegt die Daten
        assert!(alter.ist_leer());
        assert_eq!(neuer.version, 1);
        assert_eq!(neuer.api_anzahl(), 1);
        assert!(neuer.apis_der_rolle(rolle.id).unwrap().contains(&api.id));
        assert!(neuer.api(api.id).unwrap().passt("GET", "/config/role/7"));
    }

    #[tokio::test]
    async fn rollen_read_through_und_ttl() {
        let (cache, repo, uhr) = cache_mit_repo();
        let rolle = repo.rolle_anlegen("leser").unwrap();
        let uid = UserId(1);
        repo.rolle_zuweisen(uid, rolle.id);

        // Erster Zugriff laedt nach
        let rollen = cache.rollen_von(uid).await.unwrap();
        assert!(rollen.contains(&rolle.id));
        assert_eq!(cache.rollen_cache_groesse(), 1);

        // Entzug der Rolle ist innerhalb der TTL noch nicht sichtbar
        repo.rolle_entziehen(uid, rolle.id);
        let rollen = cache.rollen_von(uid).await.unwrap();
        assert!(rollen.contains(&rolle.id));

        // Nach Ablauf der TTL greift der Read-Through erneut
        uhr.vorstellen(Duration::seconds(ROLLEN_TTL + 1));
        let rollen = cache.rollen_von(uid).await.unwrap();
        assert!(rollen.is_empty());
    }

    #[tokio::test]
    async fn fehlgeschlagene_aktualisierung_laesst_schnappschuss_stehen() {
        struct KaputtesRepo;

        impl RoleApiRepository for KaputtesRepo {
            async fn all_apis(&self) -> DbResult<Vec<ApiRecord>> {
                Err(DbError::nicht_verfuegbar("Verbindung unterbrochen"))
            }
            async fn all_roles(&self) -> DbResult<Vec<RolleRecord>> {
                Err(DbError::nicht_verfuegbar("Verbindung unterbrochen"))
            }
            async fn api_ids_of_role(&self, _role_id: RoleId) -> DbResult<Vec<ApiId>> {
                Err(DbError::nicht_verfuegbar("Verbindung unterbrochen"))
            }
            async fn role_ids_of_user(&self, _user_id: UserId) -> DbResult<Vec<RoleId>> {
                Err(DbError::nicht_verfuegbar("Verbindung unterbrochen"))
            }
        }

        let uhr = TestUhr::ab_jetzt();
        let cache = PermissionCache::neu(Arc::new(KaputtesRepo), ROLLEN_TTL, 600, uhr);

        assert!(cache.aktualisieren().await.is_err());
        assert_eq!(cache.schnappschuss().version, 0);
        assert!(cache.schnappschuss().ist_leer());
    }
}
