pub mod db;
pub mod logic;
pub mod packages;

pub use logic::{app_data::AppData, competition::{Stage, StageFormat, tournament::Tournament}, config::{Config, TournamentSetup}, error::{Error, Result}};
