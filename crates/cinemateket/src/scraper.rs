use crate::parser::{ParseError, parse_film_page, parse_listing_page};
use crate::types::{Film, FilmLink, Programme, ScreeningRecord};
use crate::utils::{DateRange, assemble_programme, normalize_screenings};

use chrono::NaiveDate;
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Invalid date range: start date ({start}) is after end date ({end})")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("HTTP request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Upper bound on listing pages followed through "Næste" links.
    pub max_pages: usize,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: crate::BASE_URL.to_string(),
            timeout: Duration::from_secs(20),
            max_pages: 30,
            user_agent: format!(
                "Mozilla/5.0 (compatible; {}/{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

/// Scrapes the Cinemateket programme. Holds no state between fetches
/// besides the HTTP client handle.
#[derive(Debug, Clone)]
pub struct ProgramFetcher {
    client: Client,
    config: FetcherConfig,
}

impl ProgramFetcher {
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_config(FetcherConfig::default())
    }

    pub fn with_config(config: FetcherConfig) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("da-DK,da;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: FetcherConfig) -> Self {
        Self {
            client,
            config: FetcherConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Returns every screening between `start` and `end` (inclusive),
    /// de-duplicated by `(date, time, title)` and ordered by date and time.
    pub async fn fetch(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ScreeningRecord>, ScraperError> {
        let range = DateRange::new(start, end)?;
        let films = self.fetch_films(range).await?;
        let screenings = normalize_screenings(films.into_iter().flat_map(|f| f.screenings));

        log::info!(
            "Found {} screening(s) between {} and {}",
            screenings.len(),
            start,
            end
        );
        Ok(screenings)
    }

    pub async fn fetch_programme(&self, range: DateRange) -> Result<Programme, ScraperError> {
        let films = self.fetch_films(range).await?;
        Ok(assemble_programme(range, films))
    }

    /// Films with at least one screening inside `range`, in listing order.
    pub async fn fetch_films(&self, range: DateRange) -> Result<Vec<Film>, ScraperError> {
        let links = self.fetch_film_links().await?;
        log::info!("Checking {} film page(s)...", links.len());

        let films: Vec<Option<Film>> = stream::iter(links)
            .then(|link| async move { self.fetch_film(&link, range).await })
            .try_collect()
            .await?;

        Ok(films.into_iter().flatten().collect())
    }

    /// Crawls the "Alle film" listing through its pagination.
    pub async fn fetch_film_links(&self) -> Result<Vec<FilmLink>, ScraperError> {
        let mut links: Vec<FilmLink> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut seen_pages = HashSet::new();
        let mut next_url = Some(format!("{}{}", self.config.base_url, crate::ALL_FILMS_PATH));

        for page in 0..self.config.max_pages {
            let Some(url) = next_url.take() else {
                break;
            };
            if !seen_pages.insert(url.clone()) {
                log::debug!("Listing page {} already visited", url);
                break;
            }

            log::info!("Fetching listing page {}: {}", page, url);
            let html = self.get_html(&url).await?;
            let listing = parse_listing_page(&html, &self.config.base_url)?;
            log::info!("  -> {} film link(s) on page {}", listing.films.len(), page);

            for film in listing.films {
                match positions.get(&film.url) {
                    Some(&i) => {
                        if links[i].title.is_empty() && !film.title.is_empty() {
                            links[i].title = film.title;
                        }
                    }
                    None => {
                        positions.insert(film.url.clone(), links.len());
                        links.push(film);
                    }
                }
            }

            next_url = listing.next_page;
        }

        if next_url.is_some() {
            log::warn!(
                "Stopped after {} listing page(s); more pages were linked",
                self.config.max_pages
            );
        }

        Ok(links)
    }

    /// Fetches one film page. `None` when no screening falls inside `range`.
    pub async fn fetch_film(
        &self,
        link: &FilmLink,
        range: DateRange,
    ) -> Result<Option<Film>, ScraperError> {
        log::debug!("Fetching film page: {}", link.url);
        let html = self.get_html(&link.url).await?;
        let mut film = parse_film_page(&html, link, &self.config.base_url, range)?;

        let screenings = film.screenings.into_iter().filter(|s| range.contains(s.date));
        film.screenings = normalize_screenings(screenings);

        if film.screenings.is_empty() {
            return Ok(None);
        }
        log::debug!("{} screening(s) in range for {}", film.screenings.len(), film.title);
        Ok(Some(film))
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()
            .inspect_err(|e| log::error!("HTTP status error: {e}"))?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}
