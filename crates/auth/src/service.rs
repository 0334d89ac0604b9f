//! Auth-Fassade fuer die Transportschicht
//!
//! Buendelt Token-Dienst, Sperr-Dienst und Autorisierungs-Engine hinter den
//! Operationen, die die HTTP-Schicht konsumiert: anmelden, Token pruefen,
//! Berechtigung pruefen, Sitzung widerrufen, Konto sperren/entsperren.

use std::sync::Arc;

use gatekeeper_core::UserId;
use gatekeeper_db::{
    models::BenutzerRecord,
    repository::{RoleApiRepository, UserRepository},
};

use crate::{
    authorization::AuthorizationService,
    error::{AuthError, AuthResult},
    lockout::{LockoutService, SperrEntscheidung},
    password::passwort_verifizieren,
    token::TokenDienst,
};

/// Auth-Fassade – zentraler Einstiegspunkt fuer alle Autorisierungsvorgaenge
pub struct AuthService<U: UserRepository, R: RoleApiRepository> {
    user_repo: Arc<U>,
    token_dienst: TokenDienst<U>,
    lockout: LockoutService<U>,
    authz: Arc<AuthorizationService<R>>,
}

impl<U: UserRepository, R: RoleApiRepository + 'static> AuthService<U, R> {
    /// Erstellt eine neue Fassade
    pub fn neu(
        user_repo: Arc<U>,
        token_dienst: TokenDienst<U>,
        lockout: LockoutService<U>,
        authz: Arc<AuthorizationService<R>>,
    ) -> Self {
        Self {
            user_repo,
            token_dienst,
            lockout,
            authz,
        }
    }

    /// Meldet einen Benutzer an und stellt ein Token aus
    ///
    /// Pipeline: Benutzer laden → Sperr-Tor → Passwortvergleich →
    /// Verbuchung → Token. Ein unbekannter Benutzer liefert dieselbe
    /// Antwort wie ein falsches Passwort.
    pub async fn anmelden(
        &self,
        username: &str,
        passwort: &str,
    ) -> AuthResult<(BenutzerRecord, String)> {
        let benutzer = self
            .user_repo
            .get_by_name(username)
            .await?
            .ok_or(AuthError::UngueltigeAnmeldedaten)?;

        let entscheidung = self
            .lockout
            .anmeldeversuch_verarbeiten(&benutzer, || {
                passwort_verifizieren(passwort, &benutzer.password_hash).unwrap_or(false)
            })
            .await;

        match entscheidung {
            SperrEntscheidung::Verweigert => Err(AuthError::AnmeldungBegrenzt),
            SperrEntscheidung::Erlaubt {
                passwort_korrekt: false,
            } => {
                tracing::warn!(username = %username, "Fehlgeschlagener Anmeldeversuch");
                Err(AuthError::UngueltigeAnmeldedaten)
            }
            SperrEntscheidung::Erlaubt {
                passwort_korrekt: true,
            } => {
                let token = self.token_dienst.ausstellen(&benutzer)?;
                tracing::info!(user_id = %benutzer.id, username = %benutzer.username, "Benutzer angemeldet");
                Ok((benutzer, token))
            }
        }
    }

    /// Prueft ein Traegertoken und gibt die Identitaet zurueck
    pub async fn token_pruefen(&self, token: &str) -> AuthResult<BenutzerRecord> {
        self.token_dienst.pruefen(token).await
    }

    /// Widerruft alle bis jetzt ausgestellten Tokens eines Benutzers (Logout)
    pub fn abmelden(&self, uid: UserId) {
        self.token_dienst.widerrufen(uid);
    }

    /// Prueft ob der Benutzer die (URL, Methode)-Kombination aufrufen darf
    ///
    /// Ein Fehler beim Laden der Berechtigungsdaten fuehrt zu Ablehnung,
    /// niemals zu Erlaubnis.
    pub async fn berechtigung_pruefen(
        &self,
        benutzer: &BenutzerRecord,
        url: &str,
        methode: &str,
    ) -> bool {
        match self.authz.zugriff_pruefen(benutzer, url, methode).await {
            Ok(erlaubt) => erlaubt,
            Err(e) => {
                tracing::warn!(
                    user_id = %benutzer.id,
                    fehler = %e,
                    "Berechtigungspruefung fehlgeschlagen, Zugriff wird verweigert"
                );
                false
            }
        }
    }

    /// Sperrt ein Konto administrativ
    pub async fn konto_sperren(&self, uid: UserId) -> AuthResult<()> {
        self.user_repo.set_locked(uid, true).await?;
        // Laufende Sitzungen des gesperrten Kontos sofort beenden
        self.token_dienst.widerrufen(uid);
        tracing::info!(user_id = %uid, "Konto administrativ gesperrt");
        Ok(())
    }

    /// Hebt eine administrative Kontosperre auf
    pub async fn konto_entsperren(&self, uid: UserId) -> AuthResult<()> {
        self.user_repo.set_locked(uid, false).await?;
        tracing::info!(user_id = %uid, "Kontosperre aufgehoben");
        Ok(())
    }
}
