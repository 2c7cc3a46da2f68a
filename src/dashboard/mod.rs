// src/dashboard/mod.rs
pub mod page;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};
use thiserror::Error;
use tracing::{debug, warn};
use warp::{http::StatusCode, reject::Rejection, reply::Reply, reply::Response, Filter};

use crate::process::date_parser;
use crate::schema::UNITS;
use crate::table::{PriceFilter, PricePoint, PriceTable, ALL_ORIGINS};

/// Query string shared by the page and the series endpoint.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FilterQuery {
    pub origin: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("{field} {value:?} is not a date")]
    BadDate { field: &'static str, value: String },
}

impl FilterQuery {
    /// Fill missing values: the aggregate origin and the table's full
    /// date range.
    pub fn resolve(&self, table: &PriceTable) -> Result<PriceFilter, QueryError> {
        let (min, max) = table
            .date_bounds()
            .unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
        let origin = self
            .origin
            .clone()
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| ALL_ORIGINS.to_string());
        let start = parse_bound("start_date", self.start_date.as_deref())?.unwrap_or(min);
        let end = parse_bound("end_date", self.end_date.as_deref())?.unwrap_or(max);
        Ok(PriceFilter { origin, start, end })
    }
}

fn parse_bound(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, QueryError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => date_parser::parse_any_date(v)
            .map(Some)
            .ok_or_else(|| QueryError::BadDate {
                field,
                value: v.to_string(),
            }),
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OriginOption {
    pub label: String,
    pub value: String,
}

#[derive(Serialize)]
struct SeriesResponse {
    origin: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    units: &'static str,
    points: Vec<PricePoint>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    rows: usize,
}

fn bad_request(err: QueryError) -> Response {
    warn!(error = %err, "rejected filter query");
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: "invalid filter".to_string(),
            details: Some(err.to_string()),
        }),
        StatusCode::BAD_REQUEST,
    )
    .into_response()
}

async fn render_index(query: FilterQuery, table: Arc<PriceTable>) -> Result<Response, Rejection> {
    let filter = match query.resolve(&table) {
        Ok(f) => f,
        Err(e) => return Ok(bad_request(e)),
    };
    let points = table.series(&filter);
    debug!(origin = %filter.origin, points = points.len(), "render page");
    Ok(warp::reply::html(page::render(&table, &filter, &points)).into_response())
}

async fn list_origins(table: Arc<PriceTable>) -> Result<Response, Rejection> {
    let options: Vec<OriginOption> = table
        .origins()
        .into_iter()
        .map(|value| OriginOption {
            label: page::titleize(&value),
            value,
        })
        .collect();
    Ok(warp::reply::json(&options).into_response())
}

async fn price_series(query: FilterQuery, table: Arc<PriceTable>) -> Result<Response, Rejection> {
    let filter = match query.resolve(&table) {
        Ok(f) => f,
        Err(e) => return Ok(bad_request(e)),
    };
    let points = table.series(&filter);
    Ok(warp::reply::json(&SeriesResponse {
        origin: filter.origin,
        start_date: filter.start,
        end_date: filter.end,
        units: UNITS,
        points,
    })
    .into_response())
}

async fn health_check(table: Arc<PriceTable>) -> Result<Response, Rejection> {
    Ok(warp::reply::json(&HealthResponse {
        status: "healthy",
        rows: table.len(),
    })
    .into_response())
}

fn with_table(
    table: Arc<PriceTable>,
) -> impl Filter<Extract = (Arc<PriceTable>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&table))
}

/// All dashboard routes over a loaded table.
pub fn routes(
    table: Arc<PriceTable>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(warp::query::<FilterQuery>())
        .and(with_table(table.clone()))
        .and_then(render_index);

    let origins = warp::path!("api" / "origins")
        .and(warp::get())
        .and(with_table(table.clone()))
        .and_then(list_origins);

    let prices = warp::path!("api" / "prices")
        .and(warp::get())
        .and(warp::query::<FilterQuery>())
        .and(with_table(table.clone()))
        .and_then(price_series);

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_table(table))
        .and_then(health_check);

    index
        .or(origins)
        .unify()
        .or(prices)
        .unify()
        .or(health)
        .unify()
        .with(warp::trace::request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::PriceRecord;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn table() -> Arc<PriceTable> {
        let rows = [
            (ALL_ORIGINS, d(2021, 10, 18), 0.85),
            (ALL_ORIGINS, d(2021, 10, 25), 0.87),
            (ALL_ORIGINS, d(2021, 11, 1), 0.86),
            ("costa_rica", d(2021, 10, 25), 0.80),
            ("costa_rica", d(2021, 11, 1), 0.81),
        ];
        Arc::new(PriceTable::from_records(
            rows.iter()
                .map(|(origin, date, price)| PriceRecord {
                    origin: origin.to_string(),
                    date: *date,
                    price: *price,
                    units: UNITS.to_string(),
                })
                .collect(),
        ))
    }

    fn json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[test]
    fn test_resolve_defaults() {
        let filter = FilterQuery::default().resolve(&table()).unwrap();
        assert_eq!(
            filter,
            PriceFilter {
                origin: ALL_ORIGINS.to_string(),
                start: d(2021, 10, 18),
                end: d(2021, 11, 1),
            }
        );
    }

    #[test]
    fn test_resolve_bad_date() {
        let query = FilterQuery {
            start_date: Some("yesterday".into()),
            ..FilterQuery::default()
        };
        assert_eq!(
            query.resolve(&table()),
            Err(QueryError::BadDate {
                field: "start_date",
                value: "yesterday".into()
            })
        );
    }

    #[tokio::test]
    async fn test_health() {
        let res = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes(table()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json(res.body())["rows"], 5);
    }

    #[tokio::test]
    async fn test_origins_endpoint() {
        let res = warp::test::request()
            .path("/api/origins")
            .reply(&routes(table()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let options: Vec<OriginOption> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(
            options,
            vec![
                OriginOption {
                    label: "All Bananas".into(),
                    value: "all_bananas".into()
                },
                OriginOption {
                    label: "Costa Rica".into(),
                    value: "costa_rica".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_prices_endpoint_filters() {
        let res = warp::test::request()
            .path("/api/prices?origin=costa_rica&start_date=2021-10-26&end_date=2021-11-01")
            .reply(&routes(table()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json(res.body());
        assert_eq!(body["origin"], "costa_rica");
        assert_eq!(body["units"], "£/kg");
        let points = body["points"].as_array().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0]["date"], "2021-11-01");
        assert_eq!(points[0]["price"], 0.81);
    }

    #[tokio::test]
    async fn test_prices_endpoint_defaults_to_all_origins() {
        let res = warp::test::request()
            .path("/api/prices")
            .reply(&routes(table()))
            .await;
        let body = json(res.body());
        assert_eq!(body["origin"], ALL_ORIGINS);
        assert_eq!(body["points"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_bad_date_is_400() {
        let res = warp::test::request()
            .path("/api/prices?start_date=31-31-2021")
            .reply(&routes(table()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(res.body())["error"], "invalid filter");
    }

    #[tokio::test]
    async fn test_index_page() {
        let res = warp::test::request()
            .path("/?origin=costa_rica")
            .reply(&routes(table()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let html = String::from_utf8(res.body().to_vec()).unwrap();
        assert!(html.contains(page::TITLE));
        assert!(html.contains(r#"<option value="costa_rica" selected>Costa Rica</option>"#));
        assert_eq!(html.matches("<circle").count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let res = warp::test::request()
            .path("/api/bananas")
            .reply(&routes(table()))
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
