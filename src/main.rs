use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use secondbrain::cli::{Cli, Commands};
use secondbrain::engine;
use secondbrain::models::ItemKind;
use secondbrain::storage::FileStorage;
use secondbrain::store::DataStore;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        return print_completions(shell);
    }

    let storage = Arc::new(FileStorage::new(FileStorage::default_dir()));
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut store = DataStore::new(storage);
        run(cli, &mut store).await;
        // Pending debounced flushes must not be lost on exit.
        store.flush_now();
    });
    Ok(())
}

async fn run(cli: Cli, store: &mut DataStore) {
    match cli.command {
        Commands::Chat { input } => {
            let response = engine::analyze_with_gemini(&input).await;
            store.apply_response(&response);
            println!("{}", response.reply);
        }
        Commands::Tasks { query } => {
            for task in store.search_tasks(query.as_deref().unwrap_or("")) {
                let mark = if task.completed { "x" } else { " " };
                println!(
                    "[{}] {} | {} | {}",
                    mark,
                    task.title,
                    task.priority,
                    task.tags.join(", ")
                );
            }
        }
        Commands::Schedules { query } => {
            for schedule in store.search_schedules(query.as_deref().unwrap_or("")) {
                println!(
                    "{} | {} | {}",
                    schedule.date, schedule.title, schedule.priority
                );
            }
        }
        Commands::Logs { query } => {
            for log in store.search_logs(query.as_deref().unwrap_or("")) {
                println!("{} | {}", log.title, log.tags.join(", "));
            }
        }
        Commands::Done { title } => match store.find_task_by_title(&title).map(|t| t.id.clone()) {
            Some(id) => {
                store.toggle_task_completion(&id);
                println!("Toggled: {}", title);
            }
            None => println!("No task matching '{}'", title),
        },
        Commands::Remove { kind, title } => remove_item(store, kind, &title),
        Commands::Completions { .. } => unreachable!("handled before the runtime starts"),
    }
}

fn remove_item(store: &mut DataStore, kind: ItemKind, title: &str) {
    let id = match kind {
        ItemKind::Task => store.find_task_by_title(title).map(|t| t.id.clone()),
        ItemKind::Schedule => store.find_schedule_by_title(title).map(|s| s.id.clone()),
        ItemKind::Log => store.find_log_by_title(title).map(|l| l.id.clone()),
    };
    match id {
        Some(id) => {
            match kind {
                ItemKind::Task => store.delete_task(&id),
                ItemKind::Schedule => store.delete_schedule(&id),
                ItemKind::Log => store.delete_log(&id),
            }
            println!("Removed: {}", title);
        }
        None => println!("Nothing matching '{}'", title),
    }
}

fn print_completions(shell: &str) -> Result<()> {
    use clap_complete::{generate, Shell};
    let shell_enum = match shell.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        "powershell" => Shell::PowerShell,
        other => {
            println!("Unsupported shell: {}", other);
            return Ok(());
        }
    };
    let mut cmd = Cli::command();
    generate(shell_enum, &mut cmd, "secondbrain", &mut std::io::stdout());
    Ok(())
}
