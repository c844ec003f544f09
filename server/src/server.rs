use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::db;
use crate::interpolate::{self, SamplePoint};
use crate::models::{GridBounds, ResourceType};
use crate::repos;

pub async fn run(address: std::net::SocketAddr, database_url: &str) {
    let pool = db::pool(database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to DB {}: {}", database_url, e));

    let health_route = warp::path!("health")
        .and(with_db(pool.clone()))
        .and_then(health);

    let points_route = warp::path!("grid" / ResourceType / "points")
        .and(with_db(pool.clone()))
        .and_then(scored_points);

    let raster_route = warp::path!("grid" / ResourceType / "raster")
        .and(warp::query::<RasterQuery>())
        .and(with_db(pool.clone()))
        .and_then(raster);

    let routes = health_route
        .or(points_route)
        .or(raster_route)
        .recover(rejection);

    warp::serve(routes).run(address).await
}

fn with_db(db_pool: db::Pool) -> impl Filter<Extract = (db::Pool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

pub async fn health(pool: db::Pool) -> Result<impl Reply, Rejection> {
    db::health(&pool)
        .await
        .map_err(|e| warp::reject::custom(Error(e)))
        .map(|_| StatusCode::OK)
}

/// Raw scored cache rows for one resource.
pub async fn scored_points(
    resource: ResourceType,
    pool: db::Pool,
) -> Result<impl Reply, Rejection> {
    let client = pool
        .get()
        .await
        .map_err(|e| warp::reject::custom(Error(e.into())))?;
    let records = repos::grid_analyses::scored_points(&client, resource)
        .await
        .map_err(|e| warp::reject::custom(Error(e)))?;
    Ok(warp::reply::json(&records))
}

#[derive(Debug, Deserialize)]
pub struct RasterQuery {
    pub resolution: Option<f64>,
    pub power: Option<f64>,
}

/// Dense IDW raster derived from whatever snapshot of scored rows the read
/// returns; nothing is persisted.
pub async fn raster(
    resource: ResourceType,
    query: RasterQuery,
    pool: db::Pool,
) -> Result<impl Reply, Rejection> {
    let client = pool
        .get()
        .await
        .map_err(|e| warp::reject::custom(Error(e.into())))?;
    let records = repos::grid_analyses::scored_points(&client, resource)
        .await
        .map_err(|e| warp::reject::custom(Error(e)))?;

    let samples: Vec<SamplePoint> = records
        .iter()
        .map(|r| SamplePoint {
            lat: r.latitude,
            lon: r.longitude,
            value: r.overall_score,
        })
        .collect();

    let (resolution, power) = raster_params(&query);
    let cells = interpolate::interpolate(&samples, &GridBounds::TURKEY_RASTER, resolution, power);
    Ok(warp::reply::json(&cells))
}

// Resolution is floored so a single query can't pin the worker on a huge
// lattice.
fn raster_params(query: &RasterQuery) -> (f64, f64) {
    (
        query
            .resolution
            .unwrap_or(interpolate::DEFAULT_RESOLUTION)
            .max(interpolate::MIN_RESOLUTION),
        query.power.unwrap_or(interpolate::DEFAULT_POWER),
    )
}

#[derive(Debug)]
struct Error(anyhow::Error);
impl warp::reject::Reject for Error {}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

pub async fn rejection(err: warp::Rejection) -> Result<impl Reply, Infallible> {
    let code = StatusCode::INTERNAL_SERVER_ERROR;
    let message = "Internal server error.";

    log::error!("Error: {:?}", err);

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message: message.into(),
    });

    Ok(warp::reply::with_status(json, code))
}
