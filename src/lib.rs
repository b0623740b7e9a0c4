pub mod api;
pub mod app_state;
pub mod configuration;
pub mod data_models;
pub mod errors;
pub mod render;
pub mod session;
pub mod store;

use crate::app_state::AppState;
use crate::configuration::Settings;
use crate::errors::Error;

pub fn create_app(settings: Settings) -> Result<AppState, Error> {
    AppState::init(settings)
}
