//! Signierte Session-Tokens (HS256)
//!
//! Tokens sind zustandslose Traegertokens: der Server haelt keine
//! Session-Tabelle, sondern rekonstruiert die Identitaet auf jedem Request
//! aus der Signatur. Vorzeitige Invalidierung laeuft ausschliesslich ueber
//! den Widerrufs-Marker pro Benutzer.

use std::sync::Arc;

use chrono::{DateTime, Duration};
#[cfg(test)]
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use gatekeeper_core::UserId;
use gatekeeper_db::{models::BenutzerRecord, repository::UserRepository};

use crate::{
    error::{AuthError, AuthResult},
    revocation::RevocationStore,
    uhr::Uhr,
};

/// Claims eines ausgestellten Tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Benutzer-ID
    pub uid: i64,
    /// Benutzername zum Zeitpunkt der Ausstellung
    pub username: String,
    /// Ausstellungszeitpunkt (Unix-Sekunden)
    pub iat: i64,
    /// Ablaufzeitpunkt (Unix-Sekunden)
    pub exp: i64,
}

/// Token-Dienst – stellt Tokens aus und prueft sie
pub struct TokenDienst<U: UserRepository> {
    user_repo: Arc<U>,
    widerrufe: Arc<RevocationStore>,
    kodierung: EncodingKey,
    dekodierung: DecodingKey,
    gueltigkeit: Duration,
    uhr: Arc<dyn Uhr>,
}

impl<U: UserRepository> TokenDienst<U> {
    /// Erstellt einen neuen Token-Dienst
    pub fn neu(
        user_repo: Arc<U>,
        widerrufe: Arc<RevocationStore>,
        geheimnis: &str,
        gueltigkeit_sekunden: i64,
        uhr: Arc<dyn Uhr>,
    ) -> Self {
        Self {
            user_repo,
            widerrufe,
            kodierung: EncodingKey::from_secret(geheimnis.as_bytes()),
            dekodierung: DecodingKey::from_secret(geheimnis.as_bytes()),
            gueltigkeit: Duration::seconds(gueltigkeit_sekunden),
            uhr,
        }
    }

    /// Stellt ein signiertes Token fuer einen Benutzer aus
    ///
    /// Reine Signatur-Operation, kein Datenzugriff.
    pub fn ausstellen(&self, benutzer: &BenutzerRecord) -> AuthResult<String> {
        let jetzt = self.uhr.jetzt().timestamp();
        let claims = TokenClaims {
            uid: benutzer.id.inner(),
            username: benutzer.username.clone(),
            iat: jetzt,
            exp: jetzt + self.gueltigkeit.num_seconds(),
        };

        encode(&Header::default(), &claims, &self.kodierung)
            .map_err(|e| AuthError::intern(format!("Token-Signierung fehlgeschlagen: {e}")))
    }

    /// Prueft ein Token und gibt die zugehoerige Identitaet zurueck
    ///
    /// Saemtliche Fehlerwege (Signatur, Format, Ablauf, Widerruf, Benutzer
    /// fehlt oder gesperrt, Datenzugriff gestoert) liefern einheitlich
    /// `TokenUngueltig` – niemals eine Erlaubnis und keinen Hinweis auf
    /// den gescheiterten Teilschritt.
    pub async fn pruefen(&self, token: &str) -> AuthResult<BenutzerRecord> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Ablauf wird unten gegen die injizierte Uhr geprueft
        validation.validate_exp = false;

        let claims = decode::<TokenClaims>(token, &self.dekodierung, &validation)
            .map_err(|_| AuthError::TokenUngueltig)?
            .claims;

        if claims.exp < self.uhr.jetzt().timestamp() {
            return Err(AuthError::TokenUngueltig);
        }

        let ausgestellt_am =
            DateTime::from_timestamp(claims.iat, 0).ok_or(AuthError::TokenUngueltig)?;
        let uid = UserId(claims.uid);
        if self.widerrufe.ist_widerrufen(uid, ausgestellt_am) {
            return Err(AuthError::TokenUngueltig);
        }

        let benutzer = match self.user_repo.get_by_id(uid).await {
            Ok(Some(benutzer)) => benutzer,
            Ok(None) => return Err(AuthError::TokenUngueltig),
            Err(e) => {
                tracing::warn!(user_id = %uid, fehler = %e, "Benutzerabruf bei Token-Pruefung fehlgeschlagen");
                return Err(AuthError::TokenUngueltig);
            }
        };

        if benutzer.locked {
            return Err(AuthError::TokenUngueltig);
        }

        Ok(benutzer)
    }

    /// Widerruft alle bis jetzt ausgestellten Tokens eines Benutzers
    pub fn widerrufen(&self, uid: UserId) {
        self.widerrufe.markieren(uid);
        tracing::info!(user_id = %uid, "Sitzung widerrufen");
    }
}
