use std::{collections::HashSet, sync::Arc};

use crate::{
    services::{sessions::SessionStore, Coordinate},
    trip::{
        render::{format_fare, render_trip, shorten},
        LocateOutcome, PassengerCount, TripController, TripEnd,
    },
    FareBotError, GenericError,
};

use chrono::NaiveDateTime;
use log::*;
use serenity::{
    framework::standard::{
        help_commands::with_embeds,
        macros::{command, group, help, hook},
        Args, CommandGroup, CommandResult, HelpOptions,
    },
    model::{channel::Message, id::UserId},
    prelude::*,
};

pub struct Sessions;

impl TypeMapKey for Sessions {
    type Value = Arc<SessionStore>;
}

pub struct Controller;

impl TypeMapKey for Controller {
    type Value = Arc<TripController>;
}

#[help]
async fn help(
    context: &Context,
    msg: &Message,
    args: Args,
    help_options: &'static HelpOptions,
    groups: &[&'static CommandGroup],
    owners: HashSet<UserId>,
) -> CommandResult {
    if with_embeds(context, msg, args, help_options, groups, owners)
        .await
        .is_err()
    {
        warn!("Error sending help to {}.", msg.author.name);
    }
    Ok(())
}

#[group]
#[commands(pickup, dropoff, click, locate, passengers, when, estimate, clear, show, reset)]
struct General;

/// Sends any command error back to the user; the session carries on.
#[hook]
pub async fn report_errors(ctx: &Context, msg: &Message, command_name: &str, result: CommandResult) {
    if let Err(why) = result {
        warn!("Command {} failed: {}", command_name, why);
        say(ctx, msg, format!("⚠️ {}", why)).await;
    }
}

/// Discord rejects messages longer than this many characters.
const MESSAGE_LIMIT: usize = 2000;

async fn say(ctx: &Context, msg: &Message, text: String) {
    if let Err(why) = msg.channel_id.say(&ctx.http, shorten(&text, MESSAGE_LIMIT)).await {
        warn!("Error sending message: {:?}", why);
    }
}

async fn shared(ctx: &Context) -> Result<(Arc<SessionStore>, Arc<TripController>), GenericError> {
    let data = ctx.data.read().await;
    let sessions = data
        .get::<Sessions>()
        .cloned()
        .ok_or(FareBotError::MissingData("sessions"))?;
    let controller = data
        .get::<Controller>()
        .cloned()
        .ok_or(FareBotError::MissingData("controller"))?;
    Ok((sessions, controller))
}

async fn set_address(ctx: &Context, msg: &Message, end: TripEnd, address: &str) -> CommandResult {
    let (sessions, _) = shared(ctx).await?;
    let session = sessions.session(msg.author.id.0).await;
    let mut trip = session.lock().await;
    trip.set_address(end, address.trim());
    say(ctx, msg, render_trip(&trip)).await;
    Ok(())
}

#[command]
#[description("Set the pickup address. Use `locate` to put it on the map.")]
#[usage("[address]")]
#[example("350 5th Ave, New York, NY")]
async fn pickup(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    set_address(ctx, msg, TripEnd::Pickup, args.rest()).await
}

#[command]
#[description("Set the dropoff address. Use `locate` to put it on the map.")]
#[usage("[address]")]
#[example("1 Liberty Island, New York, NY")]
async fn dropoff(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    set_address(ctx, msg, TripEnd::Dropoff, args.rest()).await
}

#[command]
#[description("Click the map. The first click sets pickup, the second dropoff, the third starts over.")]
#[usage("[latitude] [longitude]")]
#[example("40.7484 -73.9857")]
async fn click(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let at = parse_coordinate(args.rest())?;
    let (sessions, controller) = shared(ctx).await?;
    let session = sessions.session(msg.author.id.0).await;
    let mut trip = session.lock().await;

    let outcome = controller.click(&mut trip, at).await;
    let note = match outcome.address {
        Some(_) => format!("Map click saved to {}.", outcome.target),
        None => format!(
            "Map click saved to {}, but no address was found for it.",
            outcome.target
        ),
    };
    say(ctx, msg, format!("{}\n{}", note, render_trip(&trip))).await;
    Ok(())
}

#[command]
#[description("Geocode both addresses and put them on the map.")]
async fn locate(ctx: &Context, msg: &Message) -> CommandResult {
    let (sessions, controller) = shared(ctx).await?;
    let session = sessions.session(msg.author.id.0).await;
    let mut trip = session.lock().await;

    let outcome = controller.locate(&mut trip).await;
    let mut lines = locate_warnings(outcome);
    lines.push(render_trip(&trip));
    say(ctx, msg, lines.join("\n")).await;
    Ok(())
}

#[command]
#[description("Set the number of passengers (1 to 8).")]
#[usage("[count]")]
#[example("2")]
async fn passengers(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let count = args
        .single::<i64>()
        .map_err(|_| FareBotError::Usage("passengers [1-8]"))?;
    let count = PassengerCount::try_from(count)?;

    let (sessions, _) = shared(ctx).await?;
    let session = sessions.session(msg.author.id.0).await;
    let mut trip = session.lock().await;
    trip.passenger_count = count;
    say(ctx, msg, render_trip(&trip)).await;
    Ok(())
}

#[command]
#[description("Set the pickup date and time.")]
#[usage("[YYYY-MM-DD] [HH:MM]")]
#[example("2024-05-17 08:30")]
async fn when(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let pickup_datetime = parse_pickup_time(args.rest())?;

    let (sessions, _) = shared(ctx).await?;
    let session = sessions.session(msg.author.id.0).await;
    let mut trip = session.lock().await;
    trip.pickup_datetime = pickup_datetime;
    say(ctx, msg, render_trip(&trip)).await;
    Ok(())
}

#[command]
#[description("Ask the fare service for a price. Missing points are geocoded from the addresses first.")]
async fn estimate(ctx: &Context, msg: &Message) -> CommandResult {
    let (sessions, controller) = shared(ctx).await?;
    let session = sessions.session(msg.author.id.0).await;
    let mut trip = session.lock().await;

    let headline = match controller.estimate_fare(&mut trip).await {
        Ok(fare) => format!("💲 {}", format_fare(fare)),
        Err(why) => format!("⚠️ {}", why),
    };
    say(ctx, msg, format!("{}\n{}", headline, render_trip(&trip))).await;
    Ok(())
}

#[command]
#[description("Clear both points and both addresses.")]
async fn clear(ctx: &Context, msg: &Message) -> CommandResult {
    let (sessions, controller) = shared(ctx).await?;
    let session = sessions.session(msg.author.id.0).await;
    let mut trip = session.lock().await;
    controller.clear(&mut trip);
    say(ctx, msg, render_trip(&trip)).await;
    Ok(())
}

#[command]
#[aliases("trip")]
#[description("Show the current trip and map link.")]
async fn show(ctx: &Context, msg: &Message) -> CommandResult {
    let (sessions, _) = shared(ctx).await?;
    let session = sessions.session(msg.author.id.0).await;
    let trip = session.lock().await;
    say(ctx, msg, render_trip(&trip)).await;
    Ok(())
}

#[command]
#[description("Forget your trip entirely, passengers and time included.")]
async fn reset(ctx: &Context, msg: &Message) -> CommandResult {
    let (sessions, _) = shared(ctx).await?;
    sessions.discard(msg.author.id.0).await;
    debug!("{} trip session(s) still active.", sessions.len().await);
    say(ctx, msg, "Trip discarded.".to_string()).await;
    Ok(())
}

fn parse_coordinate(text: &str) -> Result<Coordinate, FareBotError> {
    let usage = FareBotError::Usage("click [latitude] [longitude]");
    let mut parts = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let (lat, lng) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lng), None) => (lat, lng),
        _ => return Err(usage),
    };
    match (lat.parse::<f64>(), lng.parse::<f64>()) {
        (Ok(lat), Ok(lng)) => Coordinate::new(lat, lng),
        _ => Err(usage),
    }
}

fn parse_pickup_time(text: &str) -> Result<NaiveDateTime, FareBotError> {
    let text = text.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| FareBotError::InvalidDateTime(text.to_string()))
}

fn locate_warnings(outcome: LocateOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if !outcome.pickup_found {
        lines.push("Couldn't geocode pickup address. Try a more specific address.".to_string());
    }
    if !outcome.dropoff_found {
        lines.push("Couldn't geocode dropoff address. Try a more specific address.".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn replies_fit_in_one_discord_message() {
        let reply = format!("⚠️ {}", "e".repeat(5000));
        let sent = shorten(&reply, MESSAGE_LIMIT);
        assert_eq!(sent.chars().count(), MESSAGE_LIMIT);
        assert!(sent.starts_with("⚠️ eee"));
    }

    #[test]
    fn parses_click_coordinates() {
        let at = parse_coordinate("40.7484 -73.9857").unwrap();
        assert_eq!(at, Coordinate::new(40.7484, -73.9857).unwrap());
        assert_eq!(parse_coordinate(" 40.7484, -73.9857 ").unwrap(), at);
    }

    #[test]
    fn rejects_bad_click_text() {
        assert!(matches!(parse_coordinate("40.7"), Err(FareBotError::Usage(_))));
        assert!(matches!(parse_coordinate("a b"), Err(FareBotError::Usage(_))));
        assert!(matches!(parse_coordinate("1 2 3"), Err(FareBotError::Usage(_))));
        assert!(matches!(
            parse_coordinate("95 10"),
            Err(FareBotError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn parses_pickup_time_with_or_without_seconds() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_pickup_time("2024-05-17 08:30").unwrap(), expected);
        let with_seconds = parse_pickup_time("2024-05-17 08:30:15").unwrap();
        assert_eq!(with_seconds.second(), 15);
        assert!(matches!(
            parse_pickup_time("tomorrow"),
            Err(FareBotError::InvalidDateTime(_))
        ));
    }

    #[test]
    fn locate_names_each_failed_side() {
        let both = locate_warnings(LocateOutcome {
            pickup_found: true,
            dropoff_found: true,
        });
        assert!(both.is_empty());

        let dropoff_only = locate_warnings(LocateOutcome {
            pickup_found: true,
            dropoff_found: false,
        });
        assert_eq!(dropoff_only.len(), 1);
        assert!(dropoff_only[0].contains("dropoff"));
    }
}
