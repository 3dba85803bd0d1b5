mod inference;
mod routes;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use std::env;

use inference::classifier::Classifier;
use inference::config::InferenceConfig;
use routes::configure_routes;

/// Grad-CAM's backward pass is only reproducible (and safe to share
/// across requests) with a single-threaded, CPU-only numeric runtime.
/// Must run before any tensor work; the inter-op pool in particular can
/// only be sized before libtorch launches parallel work.
fn configure_numeric_runtime() {
    unsafe {
        env::set_var("OMP_NUM_THREADS", "1");
        env::set_var("MKL_NUM_THREADS", "1");
        env::set_var("CUDA_VISIBLE_DEVICES", "-1");
    }
    tch::set_num_threads(1);
    tch::set_num_interop_threads(1);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    configure_numeric_runtime();

    let config = InferenceConfig::load().map_err(|e| {
        std::io::Error::other(format!("failed to load inference config: {e}"))
    })?;

    let primary = env::var("MODEL_PATH").unwrap_or_else(|_| config.model.primary_path.clone());
    let legacy = env::var("LEGACY_MODEL_PATH").unwrap_or_else(|_| config.model.legacy_path.clone());

    let classifier = match Classifier::load(&primary, &legacy) {
        Ok(classifier) => classifier,
        Err(e) => {
            log::error!("model loading failed, refusing to serve: {e}");
            return Err(std::io::Error::other(format!("model loading failed: {e}")));
        }
    };
    log::info!("classifier ready, artifact: {}", classifier.artifact());

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);
    log::info!("Starting server on {}", bind_address);

    let classifier = web::Data::new(classifier);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(classifier.clone())
            .app_data(config.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Both libtorch pools must end up pinned to one thread, otherwise
    /// concurrent forward/backward pairs can interleave across the
    /// inter-op pool and break run-to-run reproducibility.
    #[test]
    fn numeric_runtime_is_single_threaded() {
        configure_numeric_runtime();
        assert_eq!(tch::get_num_threads(), 1);
        assert_eq!(tch::get_num_interop_threads(), 1);
        assert_eq!(env::var("OMP_NUM_THREADS").as_deref(), Ok("1"));
        assert_eq!(env::var("CUDA_VISIBLE_DEVICES").as_deref(), Ok("-1"));
    }
}
