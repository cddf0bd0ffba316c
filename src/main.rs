use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use std::sync::mpsc;
use todolist::config::{self, Backend, ConfigOverrides};
use todolist::{Change, Clock, ClockGuard, Draft, KvStore, Rejection, Task, TaskStore};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todolist")]
#[command(about = "Todo list with active and completed tasks")]
#[command(version)]
struct Cli {
    /// Path to the config file (default: <config dir>/todolist/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend to use instead of the configured one
    #[arg(short, long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Directory for the file and sqlite backends
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an active task
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Edit an active task (omitted fields keep their current value)
    Edit {
        /// Position in the active list, starting at 1
        number: usize,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Mark an active task as completed
    Complete { number: usize },

    /// Delete an active task
    Delete { number: usize },

    /// Delete a completed task
    DeleteCompleted { number: usize },

    /// Show tasks
    List {
        /// Show completed tasks instead of active ones
        #[arg(long, conflicts_with = "all")]
        completed: bool,
        /// Show both lists
        #[arg(long)]
        all: bool,
    },

    /// Delete every task and remove the stored lists
    Clear,

    /// Print the live clock
    Clock {
        /// Stop after this many ticks (default: run until Enter is pressed)
        #[arg(long)]
        ticks: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let loaded = config::load_config_with_fallback(cli.config.as_deref());
    if let Some(err) = &loaded.error {
        warn!(error = %format!("{:#}", err), "Using default configuration");
    }
    let config = config::merge_overrides(
        &loaded.config,
        &ConfigOverrides {
            backend: cli.backend,
            data_dir: cli.data_dir,
        },
    );

    match cli.command {
        Commands::Clock { ticks } => run_clock(config.clock()?, ticks),
        command => {
            let mut store = TaskStore::open(config.open_backend()?)?;
            run_task_command(&mut store, command)
        }
    }
}

fn run_task_command<K: KvStore>(store: &mut TaskStore<K>, command: Commands) -> Result<()> {
    match command {
        Commands::Add { title, description } => {
            let change = store.add(&title, &description)?;
            report(&change, &title);
        }
        Commands::Edit {
            number,
            title,
            description,
        } => {
            let index = to_index(number)?;
            if store.begin_edit(index)? == Change::Ignored {
                return Err(eyre!("No active task #{}", number));
            }
            let (title, description) = edit_fields(store.draft(), title, description);
            let change = store.commit_edit(&title, &description)?;
            report(&change, &title);
        }
        Commands::Complete { number } => {
            let change = store.complete(to_index(number)?)?;
            report_index(&change, number, "active")?;
        }
        Commands::Delete { number } => {
            let change = store.delete(to_index(number)?)?;
            report_index(&change, number, "active")?;
        }
        Commands::DeleteCompleted { number } => {
            let change = store.delete_completed(to_index(number)?)?;
            report_index(&change, number, "completed")?;
        }
        Commands::List { completed, all } => {
            if all || !completed {
                print_list("Active tasks", store.active());
            }
            if all || completed {
                print_list("Completed tasks", store.completed());
            }
        }
        Commands::Clear => {
            store.clear_all()?;
            println!("{}", "All tasks cleared".green());
        }
        Commands::Clock { .. } => {}
    }

    Ok(())
}

fn run_clock(clock: Clock, ticks: Option<usize>) -> Result<()> {
    if let Some(count) = ticks {
        for now in clock.ticks().take(count) {
            println!("{}", now.cyan());
        }
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<()>();
    // Enter or end of input stops the ticker
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = tx.send(());
    });

    let guard = ClockGuard::start(clock, |now| println!("{}", now.cyan()));
    let _ = rx.recv();
    guard.stop();
    Ok(())
}

fn to_index(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| eyre!("Task numbers start at 1"))
}

/// Fields for an edit; omitted ones keep the values `begin_edit` pre-filled
fn edit_fields(draft: &Draft, title: Option<String>, description: Option<String>) -> (String, String) {
    (
        title.unwrap_or_else(|| draft.title.clone()),
        description.unwrap_or_else(|| draft.description.clone()),
    )
}

fn report(change: &Change, title: &str) {
    match change {
        Change::Added { .. } => println!("{} {}", "Added".green(), title.trim().bold()),
        Change::Updated { .. } => println!("{} {}", "Updated".green(), title.trim().bold()),
        Change::Rejected(Rejection::DuplicateTitle) => {
            println!("{} an active task named {:?} already exists", "Skipped:".yellow(), title.trim())
        }
        Change::Ignored => println!("{} title cannot be empty", "Skipped:".yellow()),
        other => println!("{:?}", other),
    }
}

fn report_index(change: &Change, number: usize, list: &str) -> Result<()> {
    match change {
        Change::Completed { .. } => println!("{} #{}", "Completed".green(), number),
        Change::Deleted { .. } | Change::DeletedCompleted { .. } => {
            println!("{} {} task #{}", "Deleted".green(), list, number)
        }
        Change::Ignored => return Err(eyre!("No {} task #{}", list, number)),
        other => println!("{:?}", other),
    }
    Ok(())
}

fn print_list(heading: &str, tasks: &[Task]) {
    println!("{}", heading.bold().underline());
    if tasks.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }
    for (i, task) in tasks.iter().enumerate() {
        println!("  {}. {}", i + 1, task.title.cyan().bold());
        if !task.description.is_empty() {
            println!("     {}", task.description);
        }
        if let Some(on) = &task.completed_on {
            println!("     {}", format!("Completed: {}", on).dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todolist::MemoryKv;

    fn store_with(titles: &[(&str, &str)]) -> TaskStore<MemoryKv> {
        let mut store = TaskStore::open(MemoryKv::new()).unwrap();
        for (title, description) in titles {
            store.add(title, description).unwrap();
        }
        store
    }

    fn edit(number: usize, title: Option<&str>, description: Option<&str>) -> Commands {
        Commands::Edit {
            number,
            title: title.map(String::from),
            description: description.map(String::from),
        }
    }

    #[test]
    fn test_to_index_is_one_based() {
        assert!(to_index(0).is_err());
        assert_eq!(to_index(1).unwrap(), 0);
        assert_eq!(to_index(3).unwrap(), 2);
    }

    #[test]
    fn test_edit_fields_fall_back_to_draft() {
        let draft = Draft {
            title: "Buy milk".to_string(),
            description: "2%".to_string(),
        };

        let (title, description) = edit_fields(&draft, None, Some("oat".to_string()));
        assert_eq!(title, "Buy milk");
        assert_eq!(description, "oat");

        let (title, description) = edit_fields(&draft, Some("Buy bread".to_string()), None);
        assert_eq!(title, "Buy bread");
        assert_eq!(description, "2%");
    }

    #[test]
    fn test_edit_missing_task_is_an_error() {
        let mut store = store_with(&[("a", ""), ("b", "")]);
        let err = run_task_command(&mut store, edit(3, Some("c"), None)).unwrap_err();
        assert!(err.to_string().contains("No active task #3"));
        assert_eq!(store.active()[1].title, "b");
    }

    #[test]
    fn test_edit_zero_is_an_error() {
        let mut store = store_with(&[("a", "")]);
        assert!(run_task_command(&mut store, edit(0, Some("c"), None)).is_err());
        assert_eq!(store.active()[0].title, "a");
    }

    #[test]
    fn test_edit_description_only_keeps_title() {
        let mut store = store_with(&[("Buy milk", "2%"), ("Walk dog", "")]);
        let id = store.active()[0].id;

        run_task_command(&mut store, edit(1, None, Some("oat"))).unwrap();

        let task = &store.active()[0];
        assert_eq!(task.id, id);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "oat");
        assert!(!store.is_editing());
    }

    #[test]
    fn test_edit_title_only_keeps_description() {
        let mut store = store_with(&[("Buy milk", "2%"), ("Walk dog", "")]);

        run_task_command(&mut store, edit(2, Some("Walk cat"), None)).unwrap();

        assert_eq!(store.active()[1].title, "Walk cat");
        assert_eq!(store.active()[1].description, "");
        assert_eq!(store.active()[0].description, "2%");
    }
}
