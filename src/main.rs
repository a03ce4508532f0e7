//! Entry point for the **herbie** command.
//!
//! Loads the configuration, connects to herbstluftwm through
//! `herbstclient` and runs one subcommand.

use clap::{Parser, Subcommand};
use herbie::command::Command;
use herbie::config::Config;
use herbie::herbstluft::client::HerbstClient;
use herbie::icon;
use herbie::reconcile::Action;
use herbie::store::{LayoutStore, SavedLayout};
use herbie::task::TaskRunner;
use herbie::traits::WindowManager;
use herbie::tree::{render, render_layout, Tree};
use log::{error, info};
use std::path::PathBuf;

/// Layouts and tasks for herbstluftwm.
#[derive(Parser)]
#[command(name = "herbie")]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/herbie/config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Put a task on screen, spawning only the windows still missing.
    Toscreen {
        task: String,
        /// Tag to use (default: the task name).
        #[arg(long)]
        tag: Option<String>,
    },
    /// Show what `toscreen` would do, without doing it.
    Plan {
        task: String,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Close all windows on a tag and merge it away.
    Clear {
        tag: String,
        /// Tag to switch to afterwards.
        #[arg(long)]
        goto: Option<String>,
    },
    /// List configured tasks.
    Tasks,
    /// Print the parsed layout of a tag.
    Dump { tag: String },
    /// Manage saved layouts.
    Layout {
        #[command(subcommand)]
        action: LayoutCmd,
    },
    /// Write an SVG icon for a saved layout.
    Icon {
        tag: String,
        name: String,
        /// Output directory (default: ~/.icons).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LayoutCmd {
    /// Save the current layout of a tag under a name.
    Save { tag: String, name: String },
    /// Load a saved layout into a tag.
    Load { tag: String, name: String },
    /// List saved layouts of a tag.
    List { tag: String },
    /// Delete one saved layout.
    Drop { tag: String, name: String },
    /// Delete all saved layouts of a tag.
    Purge { tag: String },
}

fn home() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".into()))
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/herbie`).
fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".config"))
        .join("herbie")
}

/// Load the config from `explicit`, or from the default location falling
/// back to compiled-in defaults.
fn load_config(explicit: Option<&PathBuf>) -> Result<Config, String> {
    if let Some(path) = explicit {
        let cfg = Config::load(path).map_err(|e| e.to_string())?;
        info!("loaded config from {}", path.display());
        return Ok(cfg);
    }
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            Ok(cfg)
        }
        Err(e) if path.exists() => Err(e.to_string()),
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Ok(Config::default())
        }
    }
}

fn store(config: &Config) -> LayoutStore {
    LayoutStore::new(
        config
            .store
            .dir
            .clone()
            .unwrap_or_else(|| config_dir().join("layouts")),
    )
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Cmd, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let wm = HerbstClient::new(&config.client);

    match command {
        Cmd::Toscreen { task, tag } => {
            let runner = TaskRunner::new(wm, config);
            let outcome = runner.toscreen(&task, tag.as_deref())?;
            for e in &outcome.errors {
                eprintln!("herbie: {}", e);
            }
        }
        Cmd::Plan { task, tag } => {
            let tag = tag.unwrap_or_else(|| task.clone());
            let runner = TaskRunner::new(wm, config);
            let Some(plan) = runner.plan(&task, &tag)? else {
                return Err(format!("no task {:?}", task).into());
            };
            for action in &plan.actions {
                if let Action::PlaceWindow(p) = action {
                    println!("# {} at index {:?}", p.name, p.path_index());
                }
                match Command::from_action(action, &tag) {
                    Ok(commands) => commands.iter().for_each(|c| println!("{}", c)),
                    Err(e) => println!("# error: {}", e),
                }
            }
            for e in &plan.errors {
                println!("# error: {}", e);
            }
        }
        Cmd::Clear { tag, goto } => {
            let runner = TaskRunner::new(wm, config);
            runner.clear_tag(&tag, goto.as_deref())?;
        }
        Cmd::Tasks => {
            for name in config.tasks.keys() {
                println!("{}", name);
            }
        }
        Cmd::Dump { tag } => {
            let tree = Tree::parse(&wm.dump(&tag)?)?;
            println!("{}", render(&tree));
            for node in tree.iter() {
                let depth = node.path().depth();
                let windows: Vec<String> = node.realized().iter().map(ToString::to_string).collect();
                println!(
                    "{:indent$}[{}] {} child(ren) {}",
                    "",
                    node.path(),
                    node.children().len(),
                    windows.join(" "),
                    indent = depth * 2
                );
            }
        }
        Cmd::Layout { action } => layout(action, &wm, &store(&config))?,
        Cmd::Icon { tag, name, out } => {
            let saved = store(&config).get(&tag, &name)?;
            let tree = Tree::parse(&saved.sexp)?;
            let dir = out.unwrap_or_else(|| home().join(".icons"));
            let path = icon::write_icon(&dir, &format!("herbie{}{}", tag, name), &tree)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn layout(action: LayoutCmd, wm: &HerbstClient, store: &LayoutStore) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        LayoutCmd::Save { tag, name } => {
            let sexp = wm.dump(&tag)?;
            store.save(&tag, &SavedLayout { name, sexp })?;
        }
        LayoutCmd::Load { tag, name } => {
            let saved = store.get(&tag, &name)?;
            let tree = Tree::parse(&saved.sexp)?;
            match render_layout(&tree) {
                Some(layout) => {
                    wm.call(&Command::Load { tag, layout })?;
                }
                None => info!("layout {} has nothing to load", name),
            }
        }
        LayoutCmd::List { tag } => {
            for l in store.list(&tag)? {
                println!("{}\t{}", l.name, l.sexp);
            }
        }
        LayoutCmd::Drop { tag, name } => store.remove(&tag, &name)?,
        LayoutCmd::Purge { tag } => store.purge(&tag)?,
    }
    Ok(())
}
