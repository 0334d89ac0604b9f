//! Fehlertypen fuer den Autorisierungskern
//!
//! Die Varianten bilden die grobe, nach aussen sichtbare Taxonomie ab.
//! Feingranulare Ursachen (Signatur kaputt vs. abgelaufen vs. widerrufen)
//! werden bewusst NICHT unterschieden, damit ein Angreifer aus der Antwort
//! nichts ueber den fehlgeschlagenen Teilschritt lernt.

use thiserror::Error;

/// Alle moeglichen Fehler im Autorisierungskern
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Passwort ---
    #[error("Passwort-Hashing fehlgeschlagen: {0}")]
    PasswortHashing(String),

    // --- Authentifizierung ---
    #[error("Benutzername oder Passwort falsch")]
    UngueltigeAnmeldedaten,

    /// Harte und zeitlich begrenzte Sperre, nach aussen ein Ergebnis
    #[error("Anmeldung derzeit begrenzt")]
    AnmeldungBegrenzt,

    /// Signatur, Format, Ablauf, Widerruf, fehlender oder gesperrter
    /// Benutzer – alles kollabiert auf dieses eine Ergebnis
    #[error("Token ungueltig")]
    TokenUngueltig,

    // --- Berechtigungen ---
    #[error("Zugriff verweigert: {0}")]
    ZugriffVerweigert(String),

    // --- Datenzugriff ---
    #[error("Datenzugriff fehlgeschlagen: {0}")]
    Datenzugriff(#[from] gatekeeper_db::DbError),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl AuthError {
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

/// Result-Alias fuer den Autorisierungskern
pub type AuthResult<T> = Result<T, AuthError>;
