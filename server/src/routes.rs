//! REST-Schnittstelle und Middleware-Kette
//!
//! Die Querschnittsbelange laufen als explizite, geordnete Kette ueber jedem
//! Handler: authentifizieren (Traegertoken) → autorisieren (Methode + Pfad
//! gegen die Rollenbindungen) → Handler. Die Freilisten aus der
//! Konfiguration klinken einzelne Routen aus den ersten beiden Stufen aus.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use gatekeeper_auth::{AuthError, AuthService};
use gatekeeper_db::{models::BenutzerRecord, MemoryRoleApiRepository, MemoryUserRepository};

/// Geteilter Zustand der REST-Schicht
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService<MemoryUserRepository, MemoryRoleApiRepository>>,
    /// Routen ohne Authentifizierung ("METHODE /pfad")
    pub auth_freiliste: Arc<HashSet<String>>,
    /// Authentifizierte Routen ohne Berechtigungspruefung
    pub berechtigungs_freiliste: Arc<HashSet<String>>,
}

/// Wrapper-Typ fuer die authentifizierte Identitaet (als Extension gespeichert)
#[derive(Clone)]
pub struct AuthBenutzer(pub BenutzerRecord);

/// Baut den Router mit der vollstaendigen Middleware-Kette
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/check", post(check_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/ping", get(ping_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Authentifizierungs- und Autorisierungs-Middleware
///
/// Laeuft vor jedem Handler. OPTIONS-Requests und Routen auf der
/// Auth-Freiliste passieren ungeprueft; alle anderen brauchen ein gueltiges
/// Traegertoken und – ausserhalb der Berechtigungs-Freiliste – eine passende
/// Rollenbindung fuer (Methode, Pfad).
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let schluessel = format!(
        "{} {}",
        request.method().as_str().to_ascii_uppercase(),
        request.uri().path()
    );
    if state.auth_freiliste.contains(&schluessel) {
        return next.run(request).await;
    }

    let token = match traeger_token(request.headers()) {
        Some(token) => token,
        None => return fehler_zu_antwort(&AuthError::TokenUngueltig),
    };
    let benutzer = match state.auth.token_pruefen(token).await {
        Ok(benutzer) => benutzer,
        Err(e) => return fehler_zu_antwort(&e),
    };

    if !state.berechtigungs_freiliste.contains(&schluessel) {
        let pfad = request.uri().path().to_owned();
        let methode = request.method().as_str().to_owned();
        if !state
            .auth
            .berechtigung_pruefen(&benutzer, &pfad, &methode)
            .await
        {
            return fehler_zu_antwort(&AuthError::ZugriffVerweigert(schluessel));
        }
    }

    request.extensions_mut().insert(AuthBenutzer(benutzer));
    next.run(request).await
}

/// Extrahiert das Traegertoken aus dem Authorization-Header
///
/// Ein "Bearer "-Praefix ist optional; Alt-Clients schicken den nackten Token.
fn traeger_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s))
}

/// Uebersetzt die grobe Fehlertaxonomie in HTTP-Antworten
///
/// Nach aussen gehen nur generische Meldungen; gesperrte Konten erhalten
/// dieselbe Antwort wie falsche Anmeldedaten.
fn fehler_zu_antwort(fehler: &AuthError) -> Response {
    let (status, nachricht) = match fehler {
        AuthError::UngueltigeAnmeldedaten | AuthError::AnmeldungBegrenzt => {
            (StatusCode::UNAUTHORIZED, "Benutzername oder Passwort falsch")
        }
        AuthError::TokenUngueltig => (StatusCode::UNAUTHORIZED, "Token ungueltig"),
        AuthError::ZugriffVerweigert(_) => (StatusCode::FORBIDDEN, "Keine Berechtigung"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Interner Fehler"),
    };
    (
        status,
        Json(json!({
            "success": false,
            "message": nachricht
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct LoginEingabe {
    username: String,
    password: String,
}

/// Login: Anmeldedaten gegen die Sperr- und Passwortpruefung, Token zurueck
async fn login_handler(
    State(state): State<AppState>,
    Json(eingabe): Json<LoginEingabe>,
) -> Response {
    match state.auth.anmelden(&eingabe.username, &eingabe.password).await {
        Ok((_benutzer, token)) => Json(json!({
            "success": true,
            "token": token
        }))
        .into_response(),
        Err(e) => fehler_zu_antwort(&e),
    }
}

#[derive(Debug, Deserialize)]
struct CheckEingabe {
    url: String,
    method: String,
}

/// Explizite Berechtigungsabfrage fuer vorgelagerte Gateways
async fn check_handler(
    State(state): State<AppState>,
    Extension(AuthBenutzer(benutzer)): Extension<AuthBenutzer>,
    Json(eingabe): Json<CheckEingabe>,
) -> Response {
    let erlaubt = state
        .auth
        .berechtigung_pruefen(&benutzer, &eingabe.url, &eingabe.method)
        .await;
    tracing::info!(
        username = %benutzer.username,
        url = %eingabe.url,
        methode = %eingabe.method,
        erlaubt,
        "Berechtigungsabfrage"
    );
    if erlaubt {
        Json(json!({ "success": true })).into_response()
    } else {
        fehler_zu_antwort(&AuthError::ZugriffVerweigert(format!(
            "{} {}",
            eingabe.method, eingabe.url
        )))
    }
}

/// Logout: setzt den Widerrufs-Marker des Benutzers
async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthBenutzer(benutzer)): Extension<AuthBenutzer>,
) -> Response {
    state.auth.abmelden(benutzer.id);
    Json(json!({ "success": true })).into_response()
}

/// Liveness-Probe
async fn ping_handler() -> Response {
    Json(json!({ "success": true })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use chrono::Duration;
    use tower::util::ServiceExt;

    use gatekeeper_auth::{
        passwort_hashen, AuthorizationService, LockoutService, PermissionCache,
        RevocationStore, SperrRegeln, SystemUhr, TokenDienst,
    };

    const GEHEIMNIS: &str = "routen_test_geheimnis";
    const GUELTIGKEIT: i64 = 2 * 60 * 60;

    struct TestUmgebung {
        router: Router,
        user_repo: Arc<MemoryUserRepository>,
        rollen_repo: Arc<MemoryRoleApiRepository>,
        cache: Arc<PermissionCache<MemoryRoleApiRepository>>,
    }

    async fn umgebung() -> TestUmgebung {
        let uhr = SystemUhr::neu();
        let user_repo = MemoryUserRepository::neu();
        let rollen_repo = MemoryRoleApiRepository::neu();

        let widerrufe = RevocationStore::neu(Duration::seconds(GUELTIGKEIT), uhr.clone());
        let token_dienst = TokenDienst::neu(
            user_repo.clone(),
            widerrufe,
            GEHEIMNIS,
            GUELTIGKEIT,
            uhr.clone(),
        );
        let lockout = LockoutService::neu(user_repo.clone(), SperrRegeln::default(), uhr.clone());
        let cache = PermissionCache::neu(rollen_repo.clone(), 300, 600, uhr);
        cache.aktualisieren().await.unwrap();
        let authz = AuthorizationService::neu(cache.clone());
        let auth = Arc::new(AuthService::neu(
            user_repo.clone(),
            token_dienst,
            lockout,
            authz,
        ));

        let config = crate::config::AuthEinstellungen::default();
        let state = AppState {
            auth,
            auth_freiliste: Arc::new(config.auth_freiliste.into_iter().collect()),
            berechtigungs_freiliste: Arc::new(config.berechtigungs_freiliste.into_iter().collect()),
        };

        TestUmgebung {
            router: router(state),
            user_repo,
            rollen_repo,
            cache,
        }
    }

    fn json_request(methode: &str, pfad: &str, token: Option<&str>, body: serde_json::Value) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder()
            .method(methode)
            .uri(pfad)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn antwort_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn token_holen(umgebung: &TestUmgebung, username: &str, passwort: &str) -> String {
        let antwort = umgebung
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({ "username": username, "password": passwort }),
            ))
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
        let json = antwort_json(antwort).await;
        json["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn ping_ohne_token_erreichbar() {
        let u = umgebung().await;
        let antwort = u
            .router
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("GET")
                    .uri("/api/auth/ping")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_liefert_token_und_check_funktioniert() {
        let u = umgebung().await;
        let hash = passwort_hashen("geheim123").unwrap();
        let benutzer = u.user_repo.anlegen("u1", &hash).unwrap();

        let rolle = u.rollen_repo.rolle_anlegen("r1").unwrap();
        let api = u.rollen_repo.api_anlegen("/config/role/{id}", "GET").unwrap();
        u.rollen_repo.api_binden(rolle.id, api.id);
        u.rollen_repo.rolle_zuweisen(benutzer.id, rolle.id);
        u.cache.aktualisieren().await.unwrap();

        let token = token_holen(&u, "u1", "geheim123").await;

        let erlaubt = u
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/check",
                Some(&token),
                json!({ "url": "/config/role/7", "method": "GET" }),
            ))
            .await
            .unwrap();
        assert_eq!(erlaubt.status(), StatusCode::OK);

        let verweigert = u
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/check",
                Some(&token),
                json!({ "url": "/config/role/7", "method": "DELETE" }),
            ))
            .await
            .unwrap();
        assert_eq!(verweigert.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn falsches_passwort_gibt_401() {
        let u = umgebung().await;
        let hash = passwort_hashen("geheim123").unwrap();
        u.user_repo.anlegen("u1", &hash).unwrap();

        let antwort = u
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({ "username": "u1", "password": "falsch" }),
            ))
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::UNAUTHORIZED);
        let json = antwort_json(antwort).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn check_ohne_token_gibt_401() {
        let u = umgebung().await;
        let antwort = u
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/check",
                None,
                json!({ "url": "/x", "method": "GET" }),
            ))
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_widerruft_laufende_sitzung() {
        let u = umgebung().await;
        let hash = passwort_hashen("geheim123").unwrap();
        u.user_repo.anlegen("u1", &hash).unwrap();

        let token = token_holen(&u, "u1", "geheim123").await;

        // Token muss strikt VOR dem Widerrufs-Marker ausgestellt sein
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let abmeldung = u
            .router
            .clone()
            .oneshot(json_request("POST", "/api/auth/logout", Some(&token), json!({})))
            .await
            .unwrap();
        assert_eq!(abmeldung.status(), StatusCode::OK);

        let danach = u
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/check",
                Some(&token),
                json!({ "url": "/x", "method": "GET" }),
            ))
            .await
            .unwrap();
        assert_eq!(danach.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn nackter_token_ohne_bearer_praefix_akzeptiert() {
        let u = umgebung().await;
        let hash = passwort_hashen("geheim123").unwrap();
        u.user_repo.anlegen("admin", &hash).unwrap();

        let token = token_holen(&u, "admin", "geheim123").await;

        let antwort = u
            .router
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/api/auth/check")
                    .header("content-type", "application/json")
                    .header("authorization", &token)
                    .body(Body::from(
                        json!({ "url": "/beliebig", "method": "GET" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
    }
}
