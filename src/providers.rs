//! Optional network lookups behind capability traits.
//!
//! Nothing in the pipeline depends on these: a failed lookup only drops the
//! regional map or the photo from the output. [`Memoized`] remembers every
//! outcome per key, including failures, so a repeated request never goes
//! back to the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const GADM_BASE_URL: &str = "https://geodata.ucdavis.edu/gadm/gadm4.1/shp";
pub const WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org";

/// Administrative boundary archives keyed by ISO alpha-3 country code.
pub trait GeometryProvider {
    /// Raw zipped shapefile, `None` when no archive exists for the code.
    fn boundary_archive(&self, alpha3: &str) -> Result<Option<Arc<[u8]>>>;
}

/// Portrait or logo lookup for a person or team name.
pub trait PhotoLookupProvider {
    fn photo_url(&self, name: &str) -> Result<Option<String>>;
}

/// Caching decorator for a provider.
#[derive(Debug)]
pub struct Memoized<P, V> {
    inner: P,
    cache: Mutex<HashMap<String, Result<V, String>>>,
}

pub type CachedGeometry<P> = Memoized<P, Option<Arc<[u8]>>>;
pub type CachedPhotos<P> = Memoized<P, Option<String>>;

impl<P, V: Clone> Memoized<P, V> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cached_keys(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn get_or_fetch(
        &self,
        service: &'static str,
        key: &str,
        fetch: impl FnOnce(&P) -> Result<V>,
    ) -> Result<V> {
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            debug!(service, key, "provider cache hit");
            return hit
                .clone()
                .map_err(|reason| Error::ExternalServiceUnavailable { service, reason });
        }

        let outcome = fetch(&self.inner);
        let stored = match &outcome {
            Ok(value) => Ok(value.clone()),
            Err(e) => Err(e.to_string()),
        };
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), stored);
        outcome
    }
}

impl<P: GeometryProvider> GeometryProvider for Memoized<P, Option<Arc<[u8]>>> {
    fn boundary_archive(&self, alpha3: &str) -> Result<Option<Arc<[u8]>>> {
        self.get_or_fetch("geometry", alpha3, |p| p.boundary_archive(alpha3))
    }
}

impl<P: PhotoLookupProvider> PhotoLookupProvider for Memoized<P, Option<String>> {
    fn photo_url(&self, name: &str) -> Result<Option<String>> {
        self.get_or_fetch("photo lookup", name, |p| p.photo_url(name))
    }
}

fn unavailable(service: &'static str, e: impl ToString) -> Error {
    Error::ExternalServiceUnavailable {
        service,
        reason: e.to_string(),
    }
}

/// HTTP client with the request timeout every provider shares.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("f1-stats/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| unavailable("http client", e))
}

/// Downloads GADM 4.1 shapefile archives.
#[derive(Debug, Clone)]
pub struct HttpGeometryProvider {
    client: Client,
    base_url: String,
}

impl HttpGeometryProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, GADM_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn archive_url(&self, alpha3: &str) -> String {
        format!("{}/gadm41_{}_shp.zip", self.base_url, alpha3.to_ascii_uppercase())
    }
}

impl GeometryProvider for HttpGeometryProvider {
    fn boundary_archive(&self, alpha3: &str) -> Result<Option<Arc<[u8]>>> {
        let url = self.archive_url(alpha3);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| unavailable("geometry", e))?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!(alpha3, "no boundary archive for country");
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| unavailable("geometry", e))?;
        let bytes = response.bytes().map_err(|e| unavailable("geometry", e))?;
        debug!(alpha3, size = bytes.len(), "downloaded boundary archive");
        Ok(Some(Arc::from(bytes.as_ref())))
    }
}

/// Finds the infobox image of the best encyclopedia match for a name.
#[derive(Debug, Clone)]
pub struct WikipediaPhotoLookup {
    client: Client,
    base_url: String,
}

impl WikipediaPhotoLookup {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, WIKIPEDIA_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn fetch(&self, url: Url) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| unavailable("photo lookup", e))?;
        if !response.status().is_success() {
            return Ok(None);
        }
        response
            .text()
            .map(Some)
            .map_err(|e| unavailable("photo lookup", e))
    }
}

impl PhotoLookupProvider for WikipediaPhotoLookup {
    fn photo_url(&self, name: &str) -> Result<Option<String>> {
        let search = Url::parse_with_params(
            &format!("{}/w/index.php", self.base_url),
            &[("search", name)],
        )
        .map_err(|e| unavailable("photo lookup", e))?;
        let Some(results) = self.fetch(search)? else {
            return Ok(None);
        };

        let article = match first_search_result(&results) {
            Some(href) => format!("{}{}", self.base_url, href),
            None => format!("{}/wiki/{}", self.base_url, name.replace(' ', "_")),
        };
        let article = Url::parse(&article).map_err(|e| unavailable("photo lookup", e))?;
        Ok(self.fetch(article)?.as_deref().and_then(infobox_image))
    }
}

/// `href` of the first search hit on a results page.
pub fn first_search_result(html: &str) -> Option<&str> {
    let heading = html.find("mw-search-result-heading")?;
    attribute_after(&html[heading..], "href")
}

/// `src` of the first image inside the infobox table, made absolute.
pub fn infobox_image(html: &str) -> Option<String> {
    let infobox = html.find("class=\"infobox")?;
    let rest = &html[infobox..];
    let img = rest.find("<img")?;
    let src = attribute_after(&rest[img..], "src")?;
    Some(match src.strip_prefix("//") {
        Some(stripped) => format!("https://{stripped}"),
        None => src.to_string(),
    })
}

/// Value of the first quoted `attribute=` in `html`. The name must follow
/// whitespace, so `data-src` or `srcset` never match `src`.
fn attribute_after<'a>(html: &'a str, attribute: &str) -> Option<&'a str> {
    let mut from = 0;
    while let Some(found) = html[from..].find(attribute) {
        let at = from + found;
        from = at + attribute.len();
        let bounded = html[..at].chars().next_back().is_some_and(char::is_whitespace);
        let Some(rest) = html[from..].trim_start().strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) if bounded => q,
            _ => continue,
        };
        let value = &rest[1..];
        let end = value.find(quote)?;
        return Some(&value[..end]);
    }
    None
}
