//! Greetings demo binary.
//!
//! Walks through the controller: create a few entries, list them per
//! user, update one, then read everything back.

use greetings::{Controller, Entry, EntryResult};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> EntryResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("greetings-demo"));

    let controller = Controller::open(&path)?;

    let first = controller.create(Entry::new("u1", "hello world", "morning"))?;
    controller.create(Entry::new("u1", "howdy", "evening"))?;
    controller.create(Entry::new("u2", "hiya", "noon"))?;

    println!("entries for u1:");
    for entry in controller.entries_for_user("u1")? {
        println!("  {} greets with {:?}", entry.user_id, entry.greeting);
    }

    controller.update(first.meta.id, |entry| {
        entry.greeting = "good day".to_string();
    })?;

    println!("all entries after update:");
    controller.for_each_user_entry("u1", |entry| {
        println!("  {} greets with {:?}", entry.user_id, entry.greeting);
        Ok(true)
    })?;

    controller.close()?;
    Ok(())
}
