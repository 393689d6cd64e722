//! API Handlers
//!
//! HTTP request handlers exposing one driver's operations.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::driver::{
    availability, build_driver, Clock, Driver, DriverKind, DriverStats, KeyPath, SystemClock,
    KEY_DELIMITER,
};
use crate::error::{Result, StashError};
use crate::models::{
    ClearResponse, DriverAvailability, DriversResponse, GetResponse, HealthResponse,
    PurgeResponse, StatsResponse, StoreRequest, StoreResponse,
};

/// Application state shared across all handlers.
///
/// Drivers synchronize internally, so the state only holds shared handles.
#[derive(Clone)]
pub struct AppState {
    /// Backend serving every request
    pub driver: Arc<dyn Driver>,
    /// Clock used to resolve relative lifetimes
    pub clock: Arc<dyn Clock>,
    /// Operation counters
    pub stats: Arc<Mutex<DriverStats>>,
    /// Lifetime applied when a request names none
    pub default_ttl: i64,
}

impl AppState {
    /// Creates a new AppState around an existing driver.
    pub fn new(driver: Arc<dyn Driver>, clock: Arc<dyn Clock>, default_ttl: i64) -> Self {
        Self {
            driver,
            clock,
            stats: Arc::new(Mutex::new(DriverStats::new())),
            default_ttl,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Constructs the configured driver on the system clock.
    pub fn from_config(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let driver = build_driver(config.driver, &config.options, clock.clone())?;
        Ok(Self::new(Arc::from(driver), clock, config.options.ttl))
    }
}

/// Runs a synchronous driver call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StashError::Internal(format!("driver task failed: {}", e)))
}

/// Handler for PUT /items
///
/// Stores a value under a key path.
pub async fn store_handler(
    State(state): State<AppState>,
    Json(req): Json<StoreRequest>,
) -> Result<Json<StoreResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(StashError::InvalidRequest(error_msg));
    }

    let path = req.key_path();
    let expiration = req.resolve_expiration(state.clock.now(), state.default_ttl);

    let stored = {
        let driver = state.driver.clone();
        let path = path.clone();
        blocking(move || driver.store_data(&path, req.value, expiration)).await?
    };
    state.stats.lock().record_store(stored);

    if !stored {
        return Err(StashError::Backend(format!(
            "{} driver rejected '{}'",
            state.driver.kind(),
            path
        )));
    }
    Ok(Json(StoreResponse::new(&path, expiration)))
}

/// Handler for GET /items/*path
///
/// Misses, expired entries and backend failures all answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<GetResponse>> {
    let path = route_path(&raw)?;

    let record = {
        let driver = state.driver.clone();
        let path = path.clone();
        blocking(move || driver.get_data(&path)).await?
    };
    state.stats.lock().record_read(record.is_some());

    match record {
        Some(record) => Ok(Json(GetResponse::new(&path, record, state.clock.now()))),
        None => {
            debug!("miss for {}", path);
            Err(StashError::NotFound(path.to_string()))
        }
    }
}

/// Handler for DELETE /items/*path
///
/// Clears the subtree rooted at the path.
pub async fn clear_path_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<ClearResponse>> {
    clear(state, route_path(&raw)?).await
}

/// Parses a route path, rejecting segments that hold the key delimiter.
fn route_path(raw: &str) -> Result<KeyPath> {
    let path = KeyPath::parse(raw);
    if path
        .segments()
        .iter()
        .any(|segment| segment.contains(KEY_DELIMITER))
    {
        return Err(StashError::InvalidRequest(format!(
            "Path segments cannot contain '{}'",
            KEY_DELIMITER
        )));
    }
    Ok(path)
}

/// Handler for DELETE /items
///
/// Clears the driver's whole namespace.
pub async fn clear_all_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    clear(state, KeyPath::root()).await
}

async fn clear(state: AppState, path: KeyPath) -> Result<Json<ClearResponse>> {
    {
        let driver = state.driver.clone();
        let path = path.clone();
        blocking(move || {
            let scope = (!path.is_root()).then_some(&path);
            driver.clear(scope)
        })
        .await?;
    }
    state.stats.lock().record_clear();

    Ok(Json(ClearResponse::new(&path)))
}

/// Handler for POST /purge
///
/// Sweeps expired entries immediately.
pub async fn purge_handler(State(state): State<AppState>) -> Result<Json<PurgeResponse>> {
    let driver = state.driver.clone();
    let purged = blocking(move || driver.purge()).await?;
    state.stats.lock().record_purge();

    if !purged {
        return Err(StashError::Backend(format!(
            "{} driver failed to purge",
            state.driver.kind()
        )));
    }
    Ok(Json(PurgeResponse::new(state.driver.kind())))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.stats.lock();
    Json(StatsResponse::from(&*stats))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.driver.kind()))
}

/// Handler for GET /drivers
///
/// Reports which backends could be constructed on this host.
pub async fn drivers_handler() -> Json<DriversResponse> {
    let drivers = DriverKind::ALL
        .iter()
        .map(|&kind| DriverAvailability {
            kind,
            available: availability(kind),
        })
        .collect();

    Json(DriversResponse { drivers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverOptions;
    use crate::driver::{ManualClock, MemoryDriver};
    use serde_json::json;

    const START: i64 = 1_700_000_000;

    fn test_state() -> (AppState, ManualClock) {
        let clock = ManualClock::new(START);
        let options = DriverOptions::default().with_namespace("handlers").with_ttl(50);
        let driver = MemoryDriver::new(&options, Arc::new(clock.clone())).unwrap();
        let state = AppState::new(Arc::new(driver), Arc::new(clock.clone()), 50);
        (state, clock)
    }

    fn store_request(path: &[&str], ttl: Option<i64>) -> StoreRequest {
        StoreRequest {
            path: path.iter().map(|s| s.to_string()).collect(),
            value: json!("test_value"),
            expiration: None,
            ttl,
        }
    }

    #[tokio::test]
    async fn test_store_and_get_handler() {
        let (state, _) = test_state();

        let result = store_handler(State(state.clone()), Json(store_request(&["a", "b"], None))).await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), Path("a/b".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!("test_value"));
        assert_eq!(response.expiration, START + 50);
    }

    #[tokio::test]
    async fn test_get_after_expiry_is_not_found() {
        let (state, clock) = test_state();

        store_handler(State(state.clone()), Json(store_request(&["x"], Some(1000))))
            .await
            .unwrap();
        clock.advance(60);

        let result = get_handler(State(state.clone()), Path("x".to_string())).await;
        assert!(matches!(result, Err(StashError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_clear_path_handler() {
        let (state, _) = test_state();

        let paths: [&[&str]; 3] = [&["a", "b"], &["a", "c"], &["z"]];
        for path in paths {
            store_handler(State(state.clone()), Json(store_request(path, None)))
                .await
                .unwrap();
        }

        clear_path_handler(State(state.clone()), Path("a".to_string()))
            .await
            .unwrap();

        assert!(get_handler(State(state.clone()), Path("a/b".to_string())).await.is_err());
        assert!(get_handler(State(state.clone()), Path("a/c".to_string())).await.is_err());
        assert!(get_handler(State(state.clone()), Path("z".to_string())).await.is_ok());
    }

    #[tokio::test]
    async fn test_stats_track_operations() {
        let (state, _) = test_state();

        store_handler(State(state.clone()), Json(store_request(&["a"], None)))
            .await
            .unwrap();
        let _ = get_handler(State(state.clone()), Path("a".to_string())).await;
        let _ = get_handler(State(state.clone()), Path("missing".to_string())).await;
        clear_all_handler(State(state.clone())).await.unwrap();
        purge_handler(State(state.clone())).await.unwrap();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 1);
        assert_eq!(response.misses, 1);
        assert_eq!(response.stores, 1);
        assert_eq!(response.clears, 1);
        assert_eq!(response.purges, 1);
    }

    #[tokio::test]
    async fn test_store_invalid_request() {
        let (state, _) = test_state();

        let result = store_handler(State(state), Json(store_request(&[], None))).await;
        assert!(matches!(result, Err(StashError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delimiter_in_route_path_rejected() {
        let (state, _) = test_state();

        store_handler(State(state.clone()), Json(store_request(&["a", "b"], None)))
            .await
            .unwrap();

        let get = get_handler(State(state.clone()), Path("a::b".to_string())).await;
        assert!(matches!(get, Err(StashError::InvalidRequest(_))));

        let clear = clear_path_handler(State(state.clone()), Path("a::b".to_string())).await;
        assert!(matches!(clear, Err(StashError::InvalidRequest(_))));
        assert!(get_handler(State(state), Path("a/b".to_string())).await.is_ok());
    }

    #[tokio::test]
    async fn test_health_and_drivers_handlers() {
        let (state, _) = test_state();

        let health = health_handler(State(state)).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.driver, DriverKind::Memory);

        let drivers = drivers_handler().await;
        assert_eq!(drivers.drivers.len(), DriverKind::ALL.len());
        assert!(drivers.drivers[0].available);
    }
}
