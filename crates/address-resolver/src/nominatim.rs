//! Nominatim (OpenStreetMap) geocoding client
//!
//! Blocking: called from rayon workers, one request at a time across the
//! whole process (see [`RateLimiter`]). Answers are cached per query string
//! so repeated addresses never hit the network twice.
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = NominatimClient::new(&ExternalLookupConfig::default())?;
//! let hit = client.lookup("12 Rue de Rome, Tunis, Tunisia")?;
//! ```

use crate::config::ExternalLookupConfig;
use crate::geocoder::{ExternalGeocoder, LookupError, RateLimiter, RetryPolicy};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tn_gazetteer::Coordinate;
use tracing::debug;

/// One search hit. Nominatim sends coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

pub struct NominatimClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    limiter: RateLimiter,
    retry: RetryPolicy,
    cache: Mutex<HashMap<String, Option<Coordinate>>>,
}

impl std::fmt::Debug for NominatimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NominatimClient")
            .field("endpoint", &self.endpoint)
            .field("min_interval", &self.limiter.min_interval())
            .field("retry", &self.retry)
            .finish()
    }
}

impl NominatimClient {
    pub fn new(config: &ExternalLookupConfig) -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LookupError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            limiter: RateLimiter::new(config.min_interval()),
            retry: config.retry_policy(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn cached(&self, query: &str) -> Option<Option<Coordinate>> {
        let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.get(query).copied()
    }

    fn remember(&self, query: &str, answer: Option<Coordinate>) {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.insert(query.to_string(), answer);
    }

    /// One HTTP round trip
    fn fetch(&self, query: &str) -> Result<Option<Coordinate>, LookupError> {
        self.limiter.acquire();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", "tn"),
            ])
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let places: Vec<NominatimPlace> = response.json().map_err(map_transport_error)?;
        first_place(places)
    }
}

impl ExternalGeocoder for NominatimClient {
    fn lookup(&self, query: &str) -> Result<Option<Coordinate>, LookupError> {
        if let Some(answer) = self.cached(query) {
            debug!("Nominatim cache hit for '{}'", query);
            return Ok(answer);
        }

        let answer = self.retry.run(|attempt| {
            debug!("Nominatim query '{}' (attempt {})", query, attempt + 1);
            self.fetch(query)
        })?;
        self.remember(query, answer);
        Ok(answer)
    }
}

fn map_transport_error(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout
    } else if e.is_decode() {
        LookupError::Malformed(e.to_string())
    } else {
        LookupError::RequestFailed(e.to_string())
    }
}

/// First hit of a Nominatim answer; an empty list is "no match"
fn first_place(places: Vec<NominatimPlace>) -> Result<Option<Coordinate>, LookupError> {
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let lat = place.lat.trim().parse::<f64>();
    let lon = place.lon.trim().parse::<f64>();
    match (lat, lon) {
        (Ok(lat), Ok(lon)) => {
            debug!(
                "Nominatim hit ({}, {}) {}",
                lat,
                lon,
                place.display_name.as_deref().unwrap_or("")
            );
            Ok(Some(Coordinate::new(lat, lon)))
        }
        _ => Err(LookupError::Malformed(format!(
            "non-numeric coordinates '{}', '{}'",
            place.lat, place.lon
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answer a single HTTP request with `status` and `body`; returns the endpoint URL
    fn serve_once(status: &'static str, body: &'static str) -> String {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/search", addr)
    }

    fn local_client(endpoint: String) -> NominatimClient {
        let config = ExternalLookupConfig {
            endpoint,
            ..ExternalLookupConfig::default()
        };
        NominatimClient::new(&config).unwrap()
    }

    fn parse_places(body: &str) -> Result<Option<Coordinate>, LookupError> {
        let places: Vec<NominatimPlace> =
            serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;
        first_place(places)
    }

    #[test]
    fn test_parse_first_place() {
        let body = r#"[
            {"lat": "36.8003", "lon": "10.1860", "display_name": "Rue de Rome, Tunis"},
            {"lat": "35.0", "lon": "9.0"}
        ]"#;
        assert_eq!(parse_places(body).unwrap(), Some(Coordinate::new(36.8003, 10.1860)));
    }

    #[test]
    fn test_parse_empty_is_no_match() {
        assert_eq!(parse_places("[]").unwrap(), None);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_places("<html>"), Err(LookupError::Malformed(_))));
        assert!(matches!(
            parse_places(r#"[{"lat": "north", "lon": "10.1"}]"#),
            Err(LookupError::Malformed(_))
        ));
    }

    #[test]
    fn test_client_builds_from_defaults() {
        let client = NominatimClient::new(&ExternalLookupConfig::default()).unwrap();
        assert_eq!(client.endpoint, crate::config::NOMINATIM_ENDPOINT);
        assert!(client.cached("anything").is_none());
    }

    #[test]
    fn test_cache_short_circuits() {
        let client = NominatimClient::new(&ExternalLookupConfig::default()).unwrap();
        let hit = Coordinate::new(36.8003, 10.1860);
        client.remember("12 Rue de Rome, Tunisia", Some(hit));
        client.remember("nowhere, Tunisia", None);
        assert_eq!(client.lookup("12 Rue de Rome, Tunisia"), Ok(Some(hit)));
        assert_eq!(client.lookup("nowhere, Tunisia"), Ok(None));
    }

    #[test]
    fn test_fetch_decodes_json_body() {
        let endpoint = serve_once("200 OK", r#"[{"lat": "36.8003", "lon": "10.1860"}]"#);
        let client = local_client(endpoint);
        assert_eq!(client.fetch("12 Rue de Rome, Tunisia"), Ok(Some(Coordinate::new(36.8003, 10.1860))));
    }

    #[test]
    fn test_fetch_undecodable_body_is_malformed() {
        let endpoint = serve_once("200 OK", "<html>busy</html>");
        let client = local_client(endpoint);
        assert!(matches!(client.fetch("12 Rue de Rome, Tunisia"), Err(LookupError::Malformed(_))));
    }

    #[test]
    fn test_fetch_maps_status_codes() {
        let client = local_client(serve_once("429 Too Many Requests", "[]"));
        assert_eq!(client.fetch("x"), Err(LookupError::RateLimited));

        let client = local_client(serve_once("503 Service Unavailable", "[]"));
        assert_eq!(client.fetch("x"), Err(LookupError::Status(503)));
    }
}
