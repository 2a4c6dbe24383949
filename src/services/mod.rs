pub mod dashboard_service;
pub mod forecast_client;
pub mod model_loader;
pub mod prediction_pipeline;
pub mod presentation;
