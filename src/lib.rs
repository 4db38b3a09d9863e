#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;

pub use clock::Clock;
pub use config::Config;

/// Assemble the server: routes, config, database, notification queue.
pub async fn build() -> Rocket<Build> {
    let (broadcaster, broadcast_fairing) = notify::broadcast_channel();
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(config::AwsFairing)
        .attach(broadcast_fairing)
        .attach(logging::LoggerFairing)
        .manage(Clock::system())
        .manage(broadcaster)
}
