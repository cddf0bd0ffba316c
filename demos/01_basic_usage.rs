//! Demo 01: Basic Usage
//!
//! Adds, edits, completes and deletes tasks against a file-backed store,
//! then reopens the store to show the lists were written through.
//!
//! Run with: cargo run --example 01_basic_usage

use eyre::Result;
use todolist::{Change, FileKv, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this demo
    let temp_dir = tempfile::tempdir()?;
    let store_path = temp_dir.path().to_path_buf();

    println!("todolist Basic Usage Demo");
    println!("=========================\n");
    println!("Store path: {}\n", store_path.display());

    let mut store = TaskStore::open(FileKv::open(&store_path)?)?;

    println!("1. ADD - three tasks, one duplicate...");
    store.add("Pay rent", "due Friday")?;
    store.add("Buy milk", "")?;
    store.add("Call mom", "Sunday")?;
    let change = store.add("buy MILK", "2% please")?;
    println!("   duplicate add -> {:?}", change);
    println!("   active: {}\n", store.active().len());

    println!("2. EDIT - rename task #2...");
    store.begin_edit(1)?;
    println!("   draft: {:?}", store.draft());
    store.commit_edit("Buy oat milk", "the barista one")?;
    println!("   task #2 is now {:?}\n", store.active()[1].title);

    println!("3. COMPLETE - task #1...");
    if let Change::Completed { id } = store.complete(0)? {
        println!("   completed id {}", id);
    }
    println!("   completed on: {:?}\n", store.completed()[0].completed_on);

    println!("4. DELETE - task #2 (Call mom)...");
    store.delete(1)?;

    println!("\n5. REOPEN - hydrate from disk...");
    drop(store);
    let store = TaskStore::open(FileKv::open(&store_path)?)?;
    for task in store.active() {
        println!("   active:    {} ({})", task.title, task.description);
    }
    for task in store.completed() {
        println!(
            "   completed: {} at {}",
            task.title,
            task.completed_on.as_deref().unwrap_or("")
        );
    }

    println!("\n6. CLEAR - remove everything...");
    let mut store = store;
    store.clear_all()?;
    println!("   tasks.json exists: {}", store_path.join("tasks.json").exists());

    println!("\nDemo complete!");
    Ok(())
}
