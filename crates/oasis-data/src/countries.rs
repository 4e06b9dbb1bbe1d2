//! Public country list used by the guest profile form

use oasis_core::{Country, DEFAULT_COUNTRIES_URL};
use reqwest::Client;
use tracing::{debug, error, instrument};

use crate::{DataError, DataResult};

/// Unauthenticated client for the country list endpoint
#[derive(Debug, Clone)]
pub struct CountryClient {
    client: Client,
    url: String,
}

impl Default for CountryClient {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRIES_URL)
    }
}

impl CountryClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch `{name, flag}` for every country. Any failure reads the same.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_countries(&self) -> DataResult<Vec<Country>> {
        match self.request().await {
            Ok(countries) => {
                debug!("Fetched {} countries", countries.len());
                Ok(countries)
            }
            Err(e) => {
                error!(error = %e, "Country list request failed");
                Err(DataError::CountriesNotFetched)
            }
        }
    }

    async fn request(&self) -> reqwest::Result<Vec<Country>> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
