#[macro_use]
extern crate rocket;

mod api;
mod env;
mod error;
mod models;
mod progress;
mod store;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::str::FromStr;
use std::sync::Arc;

use api::{
    api_add_bookmark, api_add_note, api_add_skill_points, api_add_xp, api_check_achievements,
    api_complete_item, api_delete_note, api_export_progress, api_get_achievements,
    api_get_activity, api_get_bookmark, api_get_bookmarks, api_get_code, api_get_completion,
    api_get_completions, api_get_learning_paths, api_get_notes, api_get_skills, api_get_stats,
    api_import_progress, api_log_activity, api_record_learning_path_step,
    api_record_quiz_attempt, api_record_visit, api_remove_bookmark, api_reset_progress,
    api_save_code, api_unlock_achievement, health,
};
use env::{AppConfig, load_environment};
use error::AppError;
use progress::{ProgressEngine, SystemClock};
use rocket::{Build, Rocket};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use store::{Store, apply_schema};
use telemetry::{TelemetryFairing, init_tracing, shutdown_telemetry};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(anyhow::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Config(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    // Env files may carry the telemetry settings, so load them first.
    let environment = load_environment();
    init_tracing();
    environment?;

    let config = AppConfig::from_env()?;
    info!(
        database = %config.database_url,
        namespace = %config.namespace,
        "Starting progress tracker"
    );

    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;

    let engine = ProgressEngine::new(Store::new(pool, config.namespace), Arc::new(SystemClock));

    let result = init_rocket(engine).launch().await;

    if let Ok(rocket) = &result {
        if let Some(engine) = rocket.state::<ProgressEngine>() {
            info!(namespace = engine.store().namespace(), "Closing progress storage");
            engine.store().pool().close().await;
        }
    }
    shutdown_telemetry();
    result?;

    Ok(())
}

pub fn init_rocket(engine: ProgressEngine) -> Rocket<Build> {
    rocket::build()
        .manage(engine)
        .mount(
            "/api",
            routes![
                health,
                api_get_stats,
                api_add_xp,
                api_record_visit,
                api_get_achievements,
                api_check_achievements,
                api_unlock_achievement,
                api_get_completions,
                api_get_completion,
                api_complete_item,
                api_record_quiz_attempt,
                api_get_bookmarks,
                api_add_bookmark,
                api_get_bookmark,
                api_remove_bookmark,
                api_get_code,
                api_save_code,
                api_get_notes,
                api_add_note,
                api_delete_note,
                api_get_skills,
                api_add_skill_points,
                api_get_learning_paths,
                api_record_learning_path_step,
                api_log_activity,
                api_get_activity,
                api_export_progress,
                api_import_progress,
                api_reset_progress,
            ],
        )
        .attach(TelemetryFairing)
}
