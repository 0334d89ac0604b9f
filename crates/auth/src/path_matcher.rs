//! URL-Template-Matching
//!
//! Kompiliert API-Templates wie `/role/{role_id}/api` in verankerte
//! Matcher. Jeder `{name}`-Platzhalter steht fuer genau ein Pfadsegment
//! (oder einen Teil davon) und matcht niemals ueber `/`-Grenzen hinweg.

use regex::Regex;

use crate::error::{AuthError, AuthResult};

/// Zeichenklasse fuer einen Platzhalter: alphanumerisch, CJK-Zeichen
/// sowie `_ - . ~`. Der Pfadtrenner `/` ist ausgeschlossen.
const PLATZHALTER_KLASSE: &str = r"[a-zA-Z0-9\x{4e00}-\x{9fff}_\-.~]+";

/// Ein kompiliertes URL-Template
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Regex,
}

impl PathMatcher {
    /// Kompiliert ein Template in einen verankerten Matcher
    ///
    /// Literale Abschnitte werden escaped; eine oeffnende Klammer ohne
    /// schliessendes Gegenstueck gilt als Literal.
    pub fn kompilieren(template: &str) -> AuthResult<Self> {
        let mut muster = String::with_capacity(template.len() + 16);
        muster.push('^');

        let mut rest = template;
        while let Some(start) = rest.find('{') {
            let (literal, ab_klammer) = rest.split_at(start);
            match ab_klammer.find('}') {
                Some(ende) => {
                    muster.push_str(&regex::escape(literal));
                    muster.push_str(PLATZHALTER_KLASSE);
                    rest = &ab_klammer[ende + 1..];
                }
                None => break,
            }
        }
        muster.push_str(&regex::escape(rest));
        muster.push('$');

        let regex = Regex::new(&muster)
            .map_err(|e| AuthError::intern(format!("Template nicht kompilierbar '{template}': {e}")))?;
        Ok(Self { regex })
    }

    /// Prueft eine konkrete Anfrage-URL gegen das Template
    ///
    /// Verglichen wird ausschliesslich die Pfadkomponente; Query-String
    /// und Fragment werden vorher abgeschnitten.
    pub fn passt(&self, url: &str) -> bool {
        self.regex.is_match(pfad_extrahieren(url))
    }
}

/// Reduziert eine Anfrage-URL auf ihre Pfadkomponente
fn pfad_extrahieren(url: &str) -> &str {
    // Absolute URLs: alles bis einschliesslich Host ueberspringen
    let pfad = match url.find("://") {
        Some(pos) => {
            let nach_schema = &url[pos + 3..];
            match nach_schema.find('/') {
                Some(p) => &nach_schema[p..],
                None => "",
            }
        }
        None => url,
    };
    let pfad = pfad.split('#').next().unwrap_or(pfad);
    pfad.split('?').next().unwrap_or(pfad)
}
