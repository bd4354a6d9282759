//! Timed item producer feeding the shared queue.

use crate::queue::ItemSender;
use core::time::Duration;
use rand::seq::IndexedRandom;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Produces the next item to hand to the pool.
pub trait ItemSource: Send + 'static {
    fn next_item(&mut self) -> String;
}

impl<F> ItemSource for F
where
    F: FnMut() -> String + Send + 'static,
{
    fn next_item(&mut self) -> String {
        self()
    }
}

const ANIMALS: &[&str] = &[
    "Allay", "Axolotl", "Bat", "Bee", "Camel", "Cat", "Chicken", "Cod", "Cow", "Dolphin",
    "Donkey", "Fox", "Frog", "Goat", "Horse", "Llama", "Mooshroom", "Mule", "Ocelot", "Panda",
    "Parrot", "Pig", "Polar Bear", "Rabbit", "Salmon", "Sheep", "Sniffer", "Squid", "Strider",
    "Tadpole", "Turtle", "Wolf",
];

/// Picks a random animal name for every item.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnimalSource;

impl ItemSource for AnimalSource {
    fn next_item(&mut self) -> String {
        ANIMALS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or("Pig")
            .to_owned()
    }
}

/// Spawns a task that sends one item from `source` every `interval` until
/// `cancel` fires or the queue closes.
///
/// The first item is sent immediately. A send that is blocked on a full queue
/// is abandoned as soon as `cancel` fires, so the producer never keeps
/// shutdown waiting on a pool with no workers.
///
/// # Panics
///
/// Panics if `interval` is zero.
pub fn spawn_producer<S: ItemSource>(
    mut source: S,
    sender: ItemSender,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::spawn(async move {
        #[cfg(feature = "tracing")]
        tracing::debug!("Producer started ({interval:?} interval)");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let item = source.next_item();
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                sent = sender.send(item) => {
                    if sent.is_err() {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Item queue closed, producer exiting");
                        break;
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Producer stopped");
    })
}
