//! Uhr-Abstraktion
//!
//! Saemtliche Zeitvergleiche im Kern (Token-Ablauf, Sperrfenster,
//! Cache-TTLs, Widerrufs-Marker) laufen ueber diesen Trait, damit Tests
//! die Zeit deterministisch vorstellen koennen.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Zeitquelle des Kerns
pub trait Uhr: Send + Sync + Debug {
    fn jetzt(&self) -> DateTime<Utc>;
}

/// Produktiv-Uhr: liest die Systemzeit
#[derive(Debug, Default)]
pub struct SystemUhr;

impl SystemUhr {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl Uhr for SystemUhr {
    fn jetzt(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Stellbare Uhr fuer Tests
#[derive(Debug)]
pub struct TestUhr {
    jetzt: Mutex<DateTime<Utc>>,
}

impl TestUhr {
    /// Startet die Uhr beim angegebenen Zeitpunkt
    pub fn neu(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            jetzt: Mutex::new(start),
        })
    }

    /// Startet die Uhr bei der aktuellen Systemzeit
    pub fn ab_jetzt() -> Arc<Self> {
        Self::neu(Utc::now())
    }

    /// Stellt die Uhr um die angegebene Dauer vor
    pub fn vorstellen(&self, dauer: Duration) {
        let mut jetzt = self.jetzt.lock();
        *jetzt += dauer;
    }
}

impl Uhr for TestUhr {
    fn jetzt(&self) -> DateTime<Utc> {
        *self.jetzt.lock()
    }
}
