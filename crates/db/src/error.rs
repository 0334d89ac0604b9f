//! Fehlertypen fuer das Datenzugriffs-Crate

use thiserror::Error;

/// Datenzugriffs-Fehlertypen
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Datensatz nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Eindeutigkeitsverletzung: {0}")]
    Eindeutigkeit(String),

    #[error("Datenquelle nicht verfuegbar: {0}")]
    NichtVerfuegbar(String),

    #[error("Interner DB-Fehler: {0}")]
    Intern(String),
}

impl DbError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn nicht_verfuegbar(msg: impl Into<String>) -> Self {
        Self::NichtVerfuegbar(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

/// Result-Alias fuer Datenzugriffe
pub type DbResult<T> = Result<T, DbError>;
