use serde::Serialize;

use crate::{
    cache::canonical_json, decode::decode_weather_rows, Query, RebaseClient, RebaseError, Result,
    WeatherRow,
};

const HISTORICAL_PATH: &str = "weather/v1/get_nwp";
const OPERATIONAL_PATH: &str = "weather/v1/get_nwp/latest";

/// Numerical weather prediction endpoints.
#[derive(Clone, Copy, Debug)]
pub struct Weather<'a> {
    client: &'a RebaseClient,
}

impl<'a> Weather<'a> {
    pub(crate) fn new(client: &'a RebaseClient) -> Self {
        Self { client }
    }

    /// Fetches historical weather for `query`, memoized in the client's cache.
    ///
    /// A cached result is returned without any network call. Fresh results
    /// are stored only after a successful response.
    pub async fn historical<Q: Serialize + ?Sized>(&self, query: &Q) -> Result<Vec<WeatherRow>> {
        let cache = self.client.cache();
        if let Some(rows) = cache.and_then(|cache| cache.lookup::<Q, Vec<WeatherRow>>(query)) {
            return Ok(rows);
        }

        let rows = self.request(HISTORICAL_PATH, query).await?;
        if let Some(cache) = cache {
            cache.store(query, &rows);
        }
        Ok(rows)
    }

    /// Fetches the latest operational weather for `query`.
    ///
    /// Operational data changes between calls, so this never touches the cache.
    pub async fn operational<Q: Serialize + ?Sized>(&self, query: &Q) -> Result<Vec<WeatherRow>> {
        self.request(OPERATIONAL_PATH, query).await
    }

    async fn request<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Vec<WeatherRow>> {
        let params = Query::new().with("query_params", canonical_json(query)?);
        let response = self.client.fetch(path, params).await?;
        if response.status != 200 {
            return Err(RebaseError::Api {
                status: response.status,
                body: response.text(),
            });
        }
        decode_weather_rows(response.json()?)
    }
}
