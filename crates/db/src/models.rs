//! Datensatz-Modelle fuer Gatekeeper
//!
//! Diese Typen repraesentieren Datensaetze aus dem fuehrenden System.
//! Sie sind reine Datenuebertragungsobjekte ohne eigene Logik.

use chrono::{DateTime, Utc};
use gatekeeper_core::{ApiId, RoleId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz aus dem fuehrenden System
///
/// Der Kern liest und schreibt nur `locked`, `login_failure_count` und
/// `last_failure_at`; alle uebrigen Felder verwaltet die Benutzerverwaltung.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    /// Administrativ gesperrt (harter Zustand, nur manuell aufhebbar)
    pub locked: bool,
    /// Anzahl aufeinanderfolgender Fehlversuche seit dem letzten Erfolg
    pub login_failure_count: u32,
    /// Zeitpunkt des juengsten Fehlversuchs
    pub last_failure_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Rollen und APIs
// ---------------------------------------------------------------------------

/// Rollen-Datensatz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolleRecord {
    pub id: RoleId,
    pub name: String,
    pub beschreibung: Option<String>,
}

/// API-Datensatz – eine registrierte (URL-Template, Methode)-Kombination
///
/// `url` darf `{param}`-Platzhalter enthalten; `method` ist in
/// Grossbuchstaben abgelegt. Das Paar (url, method) ist eindeutig.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRecord {
    pub id: ApiId,
    pub url: String,
    pub method: String,
    pub beschreibung: Option<String>,
}
