//! gatekeeper-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module, verdrahtet die Kernkomponenten und stellt
//! den oeffentlichen Einstiegspunkt fuer Integrationstests bereit.

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use rand::distr::Alphanumeric;
use rand::Rng;

use gatekeeper_auth::{
    AuthService, AuthorizationService, LockoutService, PermissionCache, RevocationStore,
    SperrRegeln, SystemUhr, TokenDienst,
};
use gatekeeper_db::{MemoryRoleApiRepository, MemoryUserRepository};

pub mod config;
pub mod routes;

use config::ServerConfig;
use routes::AppState;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Speicher und Kerndienste verdrahten
    /// 2. Berechtigungs-Schnappschuss einmal eager aufbauen
    /// 3. Aktualisierungs- und Cleanup-Tasks starten
    /// 4. REST-API binden
    /// 5. Auf Ctrl-C / SIGTERM warten
    pub async fn starten(self) -> Result<()> {
        let uhr = SystemUhr::neu();

        // Referenz-Speicher; produktiv haengt hier das fuehrende System
        let user_repo = MemoryUserRepository::neu();
        let rollen_repo = MemoryRoleApiRepository::neu();

        let geheimnis = match self.config.auth.signatur_geheimnis.clone() {
            Some(geheimnis) => geheimnis,
            None => {
                tracing::warn!(
                    "Kein Signatur-Geheimnis konfiguriert, generiere ein zufaelliges \
                     (laufende Sitzungen ueberleben keinen Neustart)"
                );
                zufallsgeheimnis()
            }
        };

        let widerrufe = RevocationStore::neu(
            Duration::seconds(self.config.auth.token_gueltigkeit_sekunden),
            uhr.clone(),
        );
        RevocationStore::cleanup_task_starten(widerrufe.clone());

        let token_dienst = TokenDienst::neu(
            user_repo.clone(),
            widerrufe,
            &geheimnis,
            self.config.auth.token_gueltigkeit_sekunden,
            uhr.clone(),
        );

        let lockout = LockoutService::neu(
            user_repo.clone(),
            SperrRegeln {
                max_fehlversuche: self.config.auth.max_fehlversuche,
                kurzzeit_max_fehlversuche: self.config.auth.kurzzeit_max_fehlversuche,
                kurzzeit_sperrfenster: Duration::seconds(
                    self.config.auth.kurzzeit_sperrfenster_sekunden,
                ),
            },
            uhr.clone(),
        );

        let cache = PermissionCache::neu(
            rollen_repo.clone(),
            self.config.cache.rollen_ttl_sekunden,
            self.config.cache.aktualisierungs_intervall_sekunden,
            uhr,
        );

        // Eager-Aufbau VOR dem Binden: ein leerer Schnappschuss wuerde jede
        // Pruefung ablehnen
        cache.aktualisieren().await?;
        PermissionCache::aktualisierungs_task_starten(cache.clone());

        let authz = AuthorizationService::neu(cache);
        let auth = Arc::new(AuthService::neu(user_repo, token_dienst, lockout, authz));

        let state = AppState {
            auth,
            auth_freiliste: Arc::new(self.config.auth.auth_freiliste.iter().cloned().collect()),
            berechtigungs_freiliste: Arc::new(
                self.config.auth.berechtigungs_freiliste.iter().cloned().collect(),
            ),
        };
        let router = routes::router(state);

        let adresse = self.config.api_bind_adresse();
        let listener = tokio::net::TcpListener::bind(&adresse).await?;
        tracing::info!(adresse = %adresse, "REST-API bereit");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        Ok(())
    }
}

/// Generiert ein zufaelliges Signatur-Geheimnis (64 alphanumerische Zeichen)
fn zufallsgeheimnis() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Wartet auf Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Fehler beim Warten auf das Shutdown-Signal: {}", e);
    }
}
