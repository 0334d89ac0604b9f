//! gatekeeper-auth – Autorisierungskern
//!
//! Dieses Crate implementiert:
//! - Passwort-Hashing mit Argon2id
//! - Signierte, ablaufende Session-Tokens (HS256) mit Widerrufs-Markern
//! - Brute-Force-Schutz (harte und zeitlich begrenzte Anmeldesperren)
//! - URL-Template-Matching fuer API-Pfade
//! - Gecachte Rolle-zu-API-Berechtigungspruefung mit atomarem
//!   Schnappschuss-Tausch
//! - AuthService als zentrale Fassade fuer die Transportschicht

pub mod authorization;
pub mod error;
pub mod lockout;
pub mod password;
pub mod path_matcher;
pub mod permission_cache;
pub mod revocation;
pub mod service;
pub mod token;
pub mod uhr;

// Bequeme Re-Exporte
pub use authorization::{AuthorizationService, ADMIN_BENUTZERNAME};
pub use error::{AuthError, AuthResult};
pub use lockout::{LockoutService, SperrEntscheidung, SperrRegeln, SperrZustand};
pub use password::{passwort_hashen, passwort_verifizieren, zufallspasswort_generieren};
pub use path_matcher::PathMatcher;
pub use permission_cache::{PermissionCache, PermissionSnapshot};
pub use revocation::RevocationStore;
pub use service::AuthService;
pub use token::{TokenClaims, TokenDienst};
pub use uhr::{SystemUhr, TestUhr, Uhr};
