//! Brute-Force-Schutz fuer Anmeldungen
//!
//! Haelt pro Benutzer den Zaehler aufeinanderfolgender Fehlversuche und den
//! Zeitpunkt des juengsten Fehlversuchs (persistiert im fuehrenden System)
//! und entscheidet VOR dem Passwortvergleich, ob ein Anmeldeversuch
//! ueberhaupt zugelassen wird.
//!
//! Zwei Stufen:
//! - Dauerhafte Sperre: administratives `locked`-Flag oder Zaehler ueber
//!   der harten Schwelle; nur durch administratives Zuruecksetzen aufhebbar.
//! - Kurzzeitsperre: Zaehler ueber der weichen Schwelle UND juengster
//!   Fehlversuch innerhalb des Sperrfensters; laeuft rein durch Zeitablauf
//!   ab, ohne expliziten Entsperr-Schritt.

use std::sync::Arc;

use chrono::Duration;

use gatekeeper_db::{models::BenutzerRecord, repository::UserRepository};

use crate::uhr::Uhr;

/// Schwellwerte und Fenster der Anmeldesperren
#[derive(Debug, Clone)]
pub struct SperrRegeln {
    /// Harte Schwelle: ab dieser Fehlversuchszahl ist das Konto dauerhaft
    /// gesperrt (nur Passwort-Reset / administratives Eingreifen hilft)
    pub max_fehlversuche: u32,
    /// Weiche Schwelle fuer die zeitlich begrenzte Sperre
    pub kurzzeit_max_fehlversuche: u32,
    /// Fenster der Kurzzeitsperre ab dem juengsten Fehlversuch
    pub kurzzeit_sperrfenster: Duration,
}

impl Default for SperrRegeln {
    fn default() -> Self {
        Self {
            max_fehlversuche: 9,
            kurzzeit_max_fehlversuche: 3,
            kurzzeit_sperrfenster: Duration::hours(3),
        }
    }
}

/// Sperrzustand eines Kontos zum Zeitpunkt der Auswertung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SperrZustand {
    /// Anmeldung zugelassen
    Offen,
    /// Zeitlich begrenzte Sperre, laeuft von selbst ab
    KurzzeitGesperrt,
    /// Sperre bis zum administrativen Zuruecksetzen
    DauerhaftGesperrt,
}

/// Ergebnis eines verarbeiteten Anmeldeversuchs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SperrEntscheidung {
    /// Versuch durchgelassen; `passwort_korrekt` ist das Ergebnis des
    /// Passwortvergleichs
    Erlaubt { passwort_korrekt: bool },
    /// Versuch vor dem Passwortvergleich abgewiesen
    Verweigert,
}

/// Sperr-Dienst – Torwaechter vor jedem Passwortvergleich
pub struct LockoutService<U: UserRepository> {
    user_repo: Arc<U>,
    regeln: SperrRegeln,
    uhr: Arc<dyn Uhr>,
}

impl<U: UserRepository> LockoutService<U> {
    /// Erstellt einen neuen LockoutService
    pub fn neu(user_repo: Arc<U>, regeln: SperrRegeln, uhr: Arc<dyn Uhr>) -> Self {
        Self {
            user_repo,
            regeln,
            uhr,
        }
    }

    /// Wertet den Sperrzustand eines Kontos aus
    ///
    /// Reine Auswertung der Datensatzfelder gegen die Uhr; der Zustand wird
    /// nirgends gespeichert. Die Kurzzeitsperre betrachtet ausschliesslich
    /// das Alter des juengsten Fehlversuchs.
    pub fn zustand(&self, benutzer: &BenutzerRecord) -> SperrZustand {
        if benutzer.locked || benutzer.login_failure_count >= self.regeln.max_fehlversuche {
            return SperrZustand::DauerhaftGesperrt;
        }

        if benutzer.login_failure_count >= self.regeln.kurzzeit_max_fehlversuche {
            let im_fenster = benutzer.last_failure_at.is_some_and(|zeitpunkt| {
                self.uhr.jetzt() - zeitpunkt < self.regeln.kurzzeit_sperrfenster
            });
            if im_fenster {
                return SperrZustand::KurzzeitGesperrt;
            }
        }

        SperrZustand::Offen
    }

    /// Verarbeitet einen Anmeldeversuch
    ///
    /// Tor-Pruefung und Verbuchung sind getrennte Schritte: erst wenn das
    /// Tor offen ist, wird `passwort_pruefung` ueberhaupt aufgerufen; das
    /// Ergebnis wird anschliessend verbucht. Ein Schreibfehler bei der
    /// Verbuchung aendert die bereits getroffene Entscheidung nicht mehr.
    pub async fn anmeldeversuch_verarbeiten(
        &self,
        benutzer: &BenutzerRecord,
        passwort_pruefung: impl FnOnce() -> bool,
    ) -> SperrEntscheidung {
        let zustand = self.zustand(benutzer);
        if zustand != SperrZustand::Offen {
            tracing::info!(
                user_id = %benutzer.id,
                zustand = ?zustand,
                fehlversuche = benutzer.login_failure_count,
                "Anmeldeversuch vor Passwortvergleich abgewiesen"
            );
            return SperrEntscheidung::Verweigert;
        }

        let passwort_korrekt = passwort_pruefung();
        if passwort_korrekt {
            self.erfolg_verbuchen(benutzer).await;
        } else {
            self.fehlversuch_verbuchen(benutzer).await;
        }

        SperrEntscheidung::Erlaubt { passwort_korrekt }
    }

    /// Verbucht einen Fehlversuch: Zaehler hoch, Zeitstempel setzen
    ///
    /// Der Schreibfehler-Fall wird protokolliert und verschluckt; die
    /// Anmeldeentscheidung des laufenden Requests steht bereits fest.
    pub async fn fehlversuch_verbuchen(&self, benutzer: &BenutzerRecord) {
        let neuer_stand = benutzer.login_failure_count.saturating_add(1);
        if let Err(e) = self
            .user_repo
            .update_failure_counter(benutzer.id, neuer_stand, Some(self.uhr.jetzt()))
            .await
        {
            tracing::error!(
                user_id = %benutzer.id,
                fehler = %e,
                "Fehlversuchszaehler konnte nicht geschrieben werden"
            );
        }
    }

    /// Verbucht einen Erfolg: Zaehler auf 0
    ///
    /// Der Zeitstempel des letzten Fehlversuchs bleibt stehen; er ist ohne
    /// Zaehler ueber der weichen Schwelle wirkungslos.
    pub async fn erfolg_verbuchen(&self, benutzer: &BenutzerRecord) {
        if benutzer.login_failure_count == 0 {
            return;
        }
        if let Err(e) = self
            .user_repo
            .update_failure_counter(benutzer.id, 0, None)
            .await
        {
            tracing::warn!(
                user_id = %benutzer.id,
                fehler = %e,
                "Zuruecksetzen des Fehlversuchszaehlers fehlgeschlagen"
            );
        }
    }
}
