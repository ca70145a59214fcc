use std::sync::Arc;

use log::*;

use serenity::{
    async_trait,
    framework::StandardFramework,
    http::Http,
    model::prelude::Ready,
    prelude::{Client, Context, EventHandler, GatewayIntents},
};

mod commands;
mod config;
mod error;
mod services;
mod trip;

pub use error::{FareBotError, FareError, GenericError, GeocodeError};

use commands::{Controller, Sessions, GENERAL_GROUP, HELP};
use config::Settings;
use services::{
    fare::HttpFareClient,
    geocoding::{self, GeocodeClient},
    sessions::SessionStore,
};
use trip::TripController;

struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}

fn build_controller(settings: &Settings) -> Result<TripController, GenericError> {
    let geocoder = GeocodeClient::new(
        geocoding::service_from_settings(settings)?,
        settings.request_timeout,
    );
    let fare = HttpFareClient::new(settings)?;
    if settings.service_url.is_none() {
        warn!("SERVICE_URL is not set; fare estimates will be refused until it is configured.");
    }
    Ok(TripController::new(geocoder, Box::new(fare)))
}

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    env_logger::builder()
        .filter_module("taxi_fare_bot", LevelFilter::Info)
        .parse_default_env()
        .init();
    trace!("Logger initialised.");

    let settings = Settings::from_env()?;
    info!(
        "Using {:?} geocoding and {:?} fare requests.",
        settings.geocoder, settings.fare_request_mode
    );
    let controller = build_controller(&settings)?;

    let token = dotenv::var("DISCORD_TOKEN").map_err(|_| FareBotError::MissingSetting("DISCORD_TOKEN"))?;
    let http = Http::new(&token);
    let bot_id = http.get_current_user().await?.id;

    let framework = StandardFramework::new()
        .configure(|c| {
            c.with_whitespace(true)
                .on_mention(Some(bot_id))
                .prefix(settings.command_prefix.as_str())
        })
        .after(commands::report_errors)
        .help(&HELP)
        .group(&GENERAL_GROUP);

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler)
        .framework(framework)
        .type_map_insert::<Sessions>(Arc::new(SessionStore::new()))
        .type_map_insert::<Controller>(Arc::new(controller))
        .await?;

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
