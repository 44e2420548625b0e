//! JSON dashboard API.
//!
//! | Route                | Response                                          |
//! |----------------------|---------------------------------------------------|
//! | `/api/predictions`   | per-category forecast for `days` (1 to 60) days   |
//! | `/api/historical`    | last 30 days of actual sales                      |
//! | `/api/stats`         | total, average, max and min per category          |
//! | `/api/model-info`    | model order, regressors and post-processing       |

pub mod handlers;
mod service;

pub use service::{CategoryStats, DashboardService, ModelInfo, Predictions, SeriesTable, HISTORY_DAYS};

use crate::config::AppConfig;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    service: Arc<DashboardService>,
}

impl ApiServer {
    pub fn new(config: AppConfig) -> Self {
        Self {
            service: Arc::new(DashboardService::new(config)),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/predictions", get(handlers::predictions))
            .route("/api/historical", get(handlers::historical))
            .route("/api/stats", get(handlers::stats))
            .route("/api/model-info", get(handlers::model_info))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.service.clone())
    }

    /// Binds `addr` and serves until the process is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("dashboard API listening on {}", addr);
        axum::serve(listener, app).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Datelike, Duration, NaiveDate};
    use serde_json::Value;
    use std::fmt::Write as _;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn write_sales(dir: &TempDir, file: &str, column: &str, days: usize, base: f64) {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut text = format!("date,{column}\n");
        for i in 0..days {
            let date = start + Duration::days(i as i64);
            let weekend = date.weekday().num_days_from_monday() >= 5;
            let q = base + if weekend { 5.0 } else { 0.0 } + (i % 3) as f64;
            writeln!(text, "{date},{q}").unwrap();
        }
        std::fs::write(dir.path().join(file), text).unwrap();
    }

    fn app(dir: &TempDir, days: usize) -> Router {
        write_sales(dir, "potong.csv", "Ayam_Potong", days, 20.0);
        write_sales(dir, "kampung.csv", "Ayam_Kampung", days, 8.0);

        let mut config = AppConfig::default();
        config.data.dir = dir.path().to_path_buf();
        config.categories = vec![
            CategoryConfig::new("ayam_potong", "potong.csv", "Ayam_Potong"),
            CategoryConfig::new("ayam_kampung", "kampung.csv", "Ayam_Kampung"),
        ];
        ApiServer::new(config).router()
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn predictions_cover_requested_days() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get_json(app(&dir, 70), "/api/predictions?days=5").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let dates = body["data"]["dates"].as_array().unwrap();
        assert_eq!(dates.len(), 5);
        assert_eq!(dates[0], "2025-03-12");
        for category in ["ayam_potong", "ayam_kampung"] {
            let values = body["data"][category].as_array().unwrap();
            assert_eq!(values.len(), 5);
            assert!(values.iter().all(|v| v.as_f64().unwrap() >= 0.0));
            assert!(body["methods"][category].is_string());
        }
        assert_eq!(body["period"], "2025-03-12 - 2025-03-16");
    }

    #[tokio::test]
    async fn short_category_is_served_from_baseline() {
        let dir = TempDir::new().unwrap();
        write_sales(&dir, "potong.csv", "Ayam_Potong", 70, 20.0);
        write_sales(&dir, "kampung.csv", "Ayam_Kampung", 14, 8.0);
        write_sales(&dir, "tua.csv", "Ayam_Tua", 5, 4.0);

        let mut config = AppConfig::default();
        config.data.dir = dir.path().to_path_buf();
        config.categories = vec![
            CategoryConfig::new("ayam_potong", "potong.csv", "Ayam_Potong"),
            CategoryConfig::new("ayam_kampung", "kampung.csv", "Ayam_Kampung"),
            CategoryConfig::new("ayam_tua", "tua.csv", "Ayam_Tua"),
        ];
        let app = ApiServer::new(config).router();

        let (status, body) = get_json(app, "/api/predictions?days=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["dates"].as_array().unwrap().len(), 5);
        assert_eq!(body["data"]["ayam_potong"].as_array().unwrap().len(), 5);

        for category in ["ayam_kampung", "ayam_tua"] {
            assert_eq!(body["methods"][category], "baseline");
            let values = body["data"][category].as_array().unwrap();
            assert_eq!(values.len(), 5);
            assert!(values.iter().all(|v| v.as_f64().unwrap() >= 0.0));
            assert!(body["fallback_reasons"][category].is_string());
            assert!(body["message"].as_str().unwrap().contains(category));
        }
        assert!(body["fallback_reasons"]["ayam_tua"]
            .as_str()
            .unwrap()
            .contains("insufficient history"));
    }

    #[tokio::test]
    async fn out_of_range_days_is_rejected() {
        let dir = TempDir::new().unwrap();
        for uri in ["/api/predictions?days=0", "/api/predictions?days=61"] {
            let (status, body) = get_json(app(&dir, 30), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert!(body["message"].as_str().unwrap().contains("between 1 and 60"));
        }
    }

    #[tokio::test]
    async fn historical_returns_last_thirty_days() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get_json(app(&dir, 45), "/api/historical").await;

        assert_eq!(status, StatusCode::OK);
        let dates = body["data"]["dates"].as_array().unwrap();
        assert_eq!(dates.len(), HISTORY_DAYS);
        assert_eq!(dates[HISTORY_DAYS - 1], "2025-02-14");
        assert_eq!(body["data"]["ayam_potong"].as_array().unwrap().len(), 30);
    }

    #[tokio::test]
    async fn stats_summarise_each_category() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get_json(app(&dir, 14), "/api/stats").await;

        assert_eq!(status, StatusCode::OK);
        let kampung = &body["data"]["ayam_kampung"];
        assert_eq!(kampung["min"], 8.0);
        assert!(kampung["max"].as_f64().unwrap() >= 13.0);
        assert!(kampung["total"].as_f64().unwrap() > kampung["average"].as_f64().unwrap());
    }

    #[tokio::test]
    async fn missing_data_is_a_server_error() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.data.dir = dir.path().to_path_buf();
        let app = ApiServer::new(config).router();

        let (status, body) = get_json(app, "/api/stats").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("ts_ayam_potong_clean.csv"));
    }

    #[tokio::test]
    async fn model_info_describes_configuration() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get_json(app(&dir, 10), "/api/model-info").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["model"], "SARIMAX(1,1,1)(1,1,1,7)");
        assert_eq!(body["data"]["exogenous"][0], "is_closed");
        assert_eq!(body["data"]["clip_quantile"], 0.98);
    }
}
