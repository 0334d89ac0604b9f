//! Widerrufs-Marker fuer ausgegebene Tokens
//!
//! Pro Benutzer wird hoechstens ein Abmeldezeitpunkt gehalten: jedes Token,
//! dessen Ausstellungszeitpunkt vor oder auf dem Marker liegt, ist sofort
//! ungueltig. Damit kommt der Logout ohne Token-Blacklist mit O(1) Zustand
//! pro Benutzer aus. Ein Hintergrund-Task entfernt Marker, deren Tokens
//! ohnehin schon am regulaeren Ablauf scheitern wuerden.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use gatekeeper_core::UserId;

use crate::uhr::Uhr;

/// Nachlauf ueber die Token-Lebensdauer hinaus, bevor ein Marker entfernt wird
const MARKER_NACHLAUF_SEKUNDEN: i64 = 30;

/// Intervall fuer den automatischen Cleanup-Task: 15 Minuten
const CLEANUP_INTERVALL: StdDuration = StdDuration::from_secs(15 * 60);

/// Speicher fuer Abmelde-Marker
#[derive(Debug)]
pub struct RevocationStore {
    /// user_id -> Abmeldezeitpunkt
    marker: DashMap<UserId, DateTime<Utc>>,
    /// Aufbewahrungsdauer eines Markers (Token-Lebensdauer + Nachlauf)
    aufbewahrung: Duration,
    uhr: Arc<dyn Uhr>,
}

impl RevocationStore {
    /// Erstellt einen neuen Store
    ///
    /// `token_gueltigkeit` ist die maximale Token-Lebensdauer; Marker werden
    /// um den Nachlauf laenger aufbewahrt.
    pub fn neu(token_gueltigkeit: Duration, uhr: Arc<dyn Uhr>) -> Arc<Self> {
        Arc::new(Self {
            marker: DashMap::new(),
            aufbewahrung: token_gueltigkeit + Duration::seconds(MARKER_NACHLAUF_SEKUNDEN),
            uhr,
        })
    }

    /// Startet den automatischen Cleanup-Task fuer abgelaufene Marker
    pub fn cleanup_task_starten(store: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLEANUP_INTERVALL).await;
                let entfernt = store.abgelaufene_bereinigen();
                if entfernt > 0 {
                    tracing::debug!(anzahl = entfernt, "Abgelaufene Widerrufs-Marker bereinigt");
                }
            }
        });
    }

    /// Setzt den Abmelde-Marker eines Benutzers auf jetzt
    ///
    /// Alle vor diesem Moment ausgestellten Tokens des Benutzers werden
    /// sofort ungueltig, obwohl ihre Signatur weiterhin verifizierbar ist.
    pub fn markieren(&self, uid: UserId) {
        let jetzt = self.uhr.jetzt();
        self.marker.insert(uid, jetzt);
        tracing::debug!(user_id = %uid, "Widerrufs-Marker gesetzt");
    }

    /// Prueft ob ein Token mit dem gegebenen Ausstellungszeitpunkt widerrufen ist
    pub fn ist_widerrufen(&self, uid: UserId, ausgestellt_am: DateTime<Utc>) -> bool {
        self.marker
            .get(&uid)
            .is_some_and(|abgemeldet_am| *abgemeldet_am >= ausgestellt_am)
    }

    /// Entfernt Marker ausserhalb der Aufbewahrungsdauer
    ///
    /// Tokens aus dieser Zeit scheitern bereits am regulaeren Ablauf.
    pub fn abgelaufene_bereinigen(&self) -> usize {
        let grenze = self.uhr.jetzt() - self.aufbewahrung;
        let vorher = self.marker.len();
        self.marker.retain(|_, abgemeldet_am| *abgemeldet_am > grenze);
        vorher - self.marker.len()
    }

    /// Anzahl aktuell gehaltener Marker
    pub fn anzahl(&self) -> usize {
        self.marker.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uhr::TestUhr;

    #[test]
    fn marker_widerruft_aeltere_tokens() {
        let uhr = TestUhr::ab_jetzt();
        let store = RevocationStore::neu(Duration::hours(2), uhr.clone());
        let uid = UserId(1);

        let ausgestellt_am = uhr.jetzt();
        assert!(!store.ist_widerrufen(uid, ausgestellt_am));

        uhr.vorstellen(Duration::seconds(10));
        store.markieren(uid);
        assert!(store.ist_widerrufen(uid, ausgestellt_am));

        // Nach dem Marker ausgestellte Tokens bleiben gueltig
        uhr.vorstellen(Duration::seconds(10));
        assert!(!store.ist_widerrufen(uid, uhr.jetzt()));
    }

    #[test]
    fn marker_genau_auf_iat_widerruft() {
        let uhr = TestUhr::ab_jetzt();
        let store = RevocationStore::neu(Duration::hours(2), uhr.clone());
        let uid = UserId(2);

        // iat == Marker-Zeitpunkt: widerrufen
        let zeitpunkt = uhr.jetzt();
        store.markieren(uid);
        assert!(store.ist_widerrufen(uid, zeitpunkt));
    }

    #[test]
    fn bereinigung_entfernt_nur_alte_marker() {
        let uhr = TestUhr::ab_jetzt();
        let store = RevocationStore::neu(Duration::hours(2), uhr.clone());

        store.markieren(UserId(1));
        uhr.vorstellen(Duration::hours(1));
        store.markieren(UserId(2));

        // Erster Marker ist nach 2h + Nachlauf faellig, zweiter noch nicht
        uhr.vorstellen(Duration::hours(1) + Duration::seconds(31));
        let entfernt = store.abgelaufene_bereinigen();
        assert_eq!(entfernt, 1);
        assert_eq!(store.anzahl(), 1);
    }
}
