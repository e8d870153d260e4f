use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use gamesave::SaveConfig;
use gamesave::domains::{PlantField, PlayerState, QuestLog, RiddleBook, WorldState};
use gamesave::save::{
    InstantSceneBridge, PlayState, SaveEvent, SaveManager, SaveScheduler, Shared, SlotStatus,
    shared,
};

#[derive(Parser)]
#[command(name = "gamesave", about = "Inspect and drive save slots")]
struct Cli {
    /// JSON config file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save directory; defaults to the per-user profile directory
    #[arg(long)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every slot with its summary.
    List,
    /// Save a demo world into a slot.
    Save {
        slot: usize,
        /// Display name for the save.
        name: Option<String>,
        /// Player level to store.
        #[arg(long, default_value_t = 1)]
        level: u32,
        /// Scene the world is in.
        #[arg(long, default_value = "village")]
        scene: String,
    },
    /// Load a slot into a fresh demo world and print it.
    Load { slot: usize },
    /// Delete a slot and its backup.
    Delete { slot: usize },
    /// Replace a slot with its backup.
    Restore { slot: usize },
    /// Simulate play time with auto-saves enabled.
    Play {
        /// Seconds of active play to simulate.
        #[arg(long, default_value_t = 600.0)]
        seconds: f64,
        /// Simulated frame length in seconds.
        #[arg(long, default_value_t = 1.0)]
        step: f64,
    },
}

/// Demo game state, one handle per domain
struct DemoWorld {
    player: Shared<PlayerState>,
    quests: Shared<QuestLog>,
    riddles: Shared<RiddleBook>,
    world: Shared<WorldState>,
    plants: Shared<PlantField>,
}

impl DemoWorld {
    fn new(scene: &str) -> Self {
        DemoWorld {
            player: shared(PlayerState::default()),
            quests: shared(QuestLog::default()),
            riddles: shared(RiddleBook::default()),
            world: shared(WorldState::new(scene)),
            plants: shared(PlantField::default()),
        }
    }

    fn register(&self, manager: &mut SaveManager) {
        manager.register(Rc::clone(&self.player));
        manager.register(Rc::clone(&self.quests));
        manager.register(Rc::clone(&self.riddles));
        manager.register(Rc::clone(&self.world));
        manager.register(Rc::clone(&self.plants));
    }

    fn populate(&self, level: u32) {
        {
            let mut player = self.player.borrow_mut();
            player.move_to([12.0, 0.0, -4.5]);
            player.level = level.max(1);
            player.unlock_ability("dash");
            player.discover_entry("glowcap");
        }
        self.quests.borrow_mut().start("lost_lantern");
        self.riddles.borrow_mut().attempt("well_echo", true);
        self.world.borrow_mut().advance(5400.0);
        let mut plants = self.plants.borrow_mut();
        plants.plant("moonflower", [3.0, 0.0, 1.0]);
        plants.grow();
    }

    fn print_summary(&self) {
        let player = self.player.borrow();
        let world = self.world.borrow();
        println!(
            "Player: level {} at ({:.1}, {:.1}, {:.1}), health {}/{}",
            player.level,
            player.position[0],
            player.position[1],
            player.position[2],
            player.health,
            player.max_health
        );
        println!(
            "World: scene '{}', day {}, {:.1}h, weather {}",
            world.current_scene_id, world.days_elapsed, world.time_of_day_hours, world.weather_id
        );
        println!(
            "Abilities: {:?}, plants: {}",
            player.unlocked_ability_ids,
            self.plants.borrow().plants().len()
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SaveConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SaveConfig::default(),
    };

    let default_filter = if config.debug_logging { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let dir = cli
        .dir
        .clone()
        .unwrap_or_else(|| config.profile_dir(SaveConfig::default_base_dir()));
    let mut manager =
        SaveManager::new(config.clone(), &dir).context("Failed to create save manager")?;

    manager.subscribe(|event| match event {
        SaveEvent::Saved { slot, .. } => println!("✓ Saved slot {}", slot),
        SaveEvent::Loaded { slot, .. } => println!("✓ Loaded slot {}", slot),
        SaveEvent::Deleted { slot } => println!("✓ Deleted slot {}", slot),
        SaveEvent::Error { kind, message, .. } => eprintln!("✗ {:?}: {}", kind, message),
    });

    match cli.command {
        Command::List => {
            println!("Saves in {}", manager.directory().display());
            for entry in manager.get_all_save_metadata() {
                match &entry.status {
                    SlotStatus::Empty => println!("  [{}] <empty>", entry.slot),
                    SlotStatus::Unreadable { reason } => {
                        println!("  [{}] <corrupted> {}", entry.slot, reason)
                    }
                    SlotStatus::Occupied(meta) => println!(
                        "  [{}] {} - {} - {:.0}s played - level {}",
                        entry.slot,
                        meta.name,
                        meta.created_at.format("%Y-%m-%d %H:%M:%S"),
                        meta.total_play_time_seconds,
                        meta.player_level
                            .map(|l| l.to_string())
                            .unwrap_or_else(|| "?".to_string())
                    ),
                }
            }
        }
        Command::Save {
            slot,
            name,
            level,
            scene,
        } => {
            let demo = DemoWorld::new(&scene);
            demo.populate(level);
            demo.register(&mut manager);
            manager.save_game(slot, name.as_deref())?;
        }
        Command::Load { slot } => {
            let demo = DemoWorld::new("title");
            demo.register(&mut manager);
            manager.set_scene_bridge(InstantSceneBridge::new(Some("title")));
            manager.load_game(slot)?;
            while manager.is_busy() {
                manager.poll();
            }
            demo.print_summary();
        }
        Command::Delete { slot } => manager.delete_save(slot)?,
        Command::Restore { slot } => manager.restore_backup(slot)?,
        Command::Play { seconds, step } => {
            if step <= 0.0 {
                bail!("--step must be positive");
            }
            let demo = DemoWorld::new("village");
            demo.populate(1);
            demo.register(&mut manager);

            let mut scheduler = SaveScheduler::new(&config);
            let mut elapsed = 0.0;
            while elapsed < seconds {
                demo.world.borrow_mut().advance(step * 60.0);
                scheduler.update(step, PlayState::Active, &mut manager);
                elapsed += step;
            }
            println!("Simulated {:.0}s of play", manager.play_time_seconds());
        }
    }

    manager.shutdown();
    Ok(())
}
