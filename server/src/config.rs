//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Auth-Einstellungen (Tokens, Anmeldesperren, Freilisten)
    pub auth: AuthEinstellungen,
    /// Cache-Einstellungen (Berechtigungs-Schnappschuss, Rollen-TTL)
    pub cache: CacheEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer die REST-API
    pub bind_adresse: String,
    /// Port fuer die REST-API
    pub api_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            api_port: 10080,
        }
    }
}

/// Auth-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEinstellungen {
    /// Token-Lebensdauer in Sekunden
    pub token_gueltigkeit_sekunden: i64,
    /// Geheimnis fuer die Token-Signierung; fehlt es, wird beim Start ein
    /// zufaelliges erzeugt (laufende Sitzungen ueberleben dann keinen Neustart)
    pub signatur_geheimnis: Option<String>,
    /// Harte Sperrschwelle: Fehlversuche bis zur dauerhaften Sperre
    pub max_fehlversuche: u32,
    /// Weiche Sperrschwelle fuer die Kurzzeitsperre
    pub kurzzeit_max_fehlversuche: u32,
    /// Fenster der Kurzzeitsperre in Sekunden
    pub kurzzeit_sperrfenster_sekunden: i64,
    /// Routen ohne Authentifizierung ("METHODE /pfad")
    pub auth_freiliste: Vec<String>,
    /// Authentifizierte Routen ohne Berechtigungspruefung ("METHODE /pfad")
    pub berechtigungs_freiliste: Vec<String>,
}

impl Default for AuthEinstellungen {
    fn default() -> Self {
        Self {
            token_gueltigkeit_sekunden: 2 * 60 * 60,
            signatur_geheimnis: None,
            max_fehlversuche: 9,
            kurzzeit_max_fehlversuche: 3,
            kurzzeit_sperrfenster_sekunden: 3 * 60 * 60,
            auth_freiliste: vec![
                "POST /api/auth/login".into(),
                "GET /api/auth/ping".into(),
            ],
            berechtigungs_freiliste: vec![
                "POST /api/auth/check".into(),
                "POST /api/auth/logout".into(),
            ],
        }
    }
}

/// Cache-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheEinstellungen {
    /// Intervall der Schnappschuss-Aktualisierung in Sekunden
    pub aktualisierungs_intervall_sekunden: u64,
    /// TTL der pro Benutzer gecachten Rollen in Sekunden
    pub rollen_ttl_sekunden: i64,
}

impl Default for CacheEinstellungen {
    fn default() -> Self {
        Self {
            aktualisierungs_intervall_sekunden: 10 * 60,
            rollen_ttl_sekunden: 5 * 60,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer die REST-API zurueck
    pub fn api_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.api_port)
    }
}
