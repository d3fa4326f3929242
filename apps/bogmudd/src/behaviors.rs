//! The stock behavior set world files can bind reactions to.
//!
//! Each behavior is a plain function over the event it receives; the world
//! file decides which entity reacts with which behavior to which verb. None
//! of these know anything about sessions or sockets, only the event surface.

use std::sync::Arc;
use std::time::Duration;

use bogworld::world::OCCUPANTS_GROUP;
use bogworld::{BehaviorRegistry, Event, EventRole};
use serde_json::Value;
use tracing::warn;

/// How long the bell keeps ringing after someone strikes it.
const BELL_ECHO: Duration = Duration::from_secs(2);

pub fn standard() -> BehaviorRegistry {
    BehaviorRegistry::new()
        .with("say", say)
        .with("emote", emote)
        .with("clang", clang)
        .with("barrel_tap", barrel_tap)
        .with("travel", travel)
        .with("arrive", arrive)
        .with("bell", bell)
}

/// Speech: the speaker hears themselves phrased differently, the room hears
/// the quoted line. Bound to the player template as a source reaction.
fn say(event: &Event) {
    let message = event.param("message").unwrap_or_default();
    let Some(speaker) = event.role(EventRole::Source) else {
        return;
    };
    event.publish_excluding(
        &format!("{} says, \"{message}\"", speaker.name()),
        &[speaker],
    );
    event.print(&format!("You say, \"{message}\""));
}

/// Free-form acting. Everyone, the actor included, sees the same line.
fn emote(event: &Event) {
    let message = event.param("message").unwrap_or_default();
    if let Some(actor) = event.role(EventRole::Source) {
        event.publish(&format!("{} {message}", actor.name()));
    }
}

/// A weapon being struck or struck with.
fn clang(event: &Event) {
    if event.role(EventRole::Instrument).is_some() {
        event.publish(&event.format("{source} swings {instrument} at {target}. CLANG!"));
    } else {
        event.publish(&event.format("{source} strikes {target}. CLANG!"));
    }
}

/// The barrel counts its own pours in a persistent field.
fn barrel_tap(event: &Event) {
    let Some(barrel) = event.role(EventRole::Target) else {
        return;
    };
    let poured = barrel.field_u64("taps").unwrap_or(0) + 1;
    if let Err(err) = barrel.set_field("taps", Value::from(poured)) {
        warn!(error = %err, "barrel tap not recorded");
        return;
    }
    event.publish(&event.format(&format!(
        "{{source}} taps {{target}} and drinks deep. That makes {poured} today."
    )));
}

/// Exits react to `go` as the target. The exit's own `to` field names the
/// destination room; `depart` and `arrive` override the stock narration.
fn travel(event: &Event) {
    let Some(exit) = event.role(EventRole::Target) else {
        return;
    };
    let Some(traveler) = event.role(EventRole::Source).cloned() else {
        return;
    };
    let Some(dest) = exit.field_str("to") else {
        warn!(exit = exit.name(), "exit has no 'to' field");
        return;
    };

    let depart = exit
        .field_str("depart")
        .unwrap_or_else(|| "{source} leaves.".to_string());
    event.publish_excluding(&event.format(&depart), &[&traveler]);

    match event.move_to_room(&traveler, &dest, OCCUPANTS_GROUP) {
        Ok(room) => {
            let announce = exit
                .field_str("arrive")
                .unwrap_or_else(|| "{source} arrives.".to_string());
            event.bus().publish(&room, &event.format(&announce), &[&traveler]);
            event.print(&room.describe_as_room(Some(traveler.id())));
        }
        Err(err) => warn!(exit = exit.name(), error = %err, "travel failed"),
    }
}

/// Init behavior for the player template: show the room you wake up in.
fn arrive(event: &Event) {
    let Some(player) = event.role(EventRole::Source) else {
        return;
    };
    let Some(room) = event.role(EventRole::Room) else {
        return;
    };
    event.print(&room.describe_as_room(Some(player.id())));
}

/// Ring now, echo later. The delayed half goes through the scheduler so the
/// room hears it even after the ringer has walked away.
fn bell(event: &Event) {
    event.publish(&event.format("{source} rings {target}. It peals brightly."));
    let Some(room) = event.role(EventRole::Room).cloned() else {
        return;
    };
    let bus = Arc::clone(event.bus());
    event.after(BELL_ECHO, move || {
        bus.publish(&room, "The bell's echo finally fades.", &[]);
        Ok(())
    });
}
