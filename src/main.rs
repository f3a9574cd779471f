//! Example program demonstrating the asset context

use std::sync::Arc;

use assetgate::core::logging;
use assetgate::prelude::*;

/// Demo sprite asset
#[derive(Debug)]
struct Sprite {
    name: &'static str,
    frames: u32,
}

/// Demo sound asset
#[derive(Debug)]
struct Sound {
    name: &'static str,
}

fn build_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert("enemy_goblin", Sprite { name: "goblin", frames: 8 }, &["enemies"]);
    backend.insert("enemy_orc", Sprite { name: "orc", frames: 12 }, &["enemies"]);
    backend.insert("hero", Sprite { name: "hero", frames: 16 }, &["player"]);
    backend.insert("sfx_hit", Sound { name: "hit" }, &["sfx"]);
    backend.insert("sfx_step", Sound { name: "step" }, &["sfx"]);
    backend
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => AssetConfig::load_ron(path)?,
        None => AssetConfig::default(),
    };

    let backend = build_backend();
    let context = Arc::new(AssetContext::new(backend.clone(), config));

    let init = context.spawn_initialize([
        ("enemies", AssetType::of::<Sprite>()),
        ("player", AssetType::of::<Sprite>()),
        ("sfx", AssetType::of::<Sound>()),
    ]);
    context.wait_for_init().wait().await?;
    let report = init.await??;
    log::info!("Indexed {} locations", report.indexed);

    let hero = context.load_one("hero", Tracking::Current, |sprite: Arc<Sprite>| {
        log::info!("Loaded {} with {} frames", sprite.name, sprite.frames);
    })?;
    let enemies = context.load_many(
        &["goblin", "orc"],
        Tracking::Current,
        |sprites: Vec<Arc<Sprite>>| {
            log::info!("Loaded {} enemies", sprites.len());
        },
    )?;
    let sounds = context.load_by_label("sfx", Tracking::Untracked, |sounds: Vec<Arc<Sound>>| {
        let names: Vec<_> = sounds.iter().map(|sound| sound.name).collect();
        log::info!("Loaded sounds: {}", names.join(", "));
    })?;

    for ticket in [&hero, &enemies, &sounds] {
        if let LoadStatus::Failed(err) = ticket.wait().await {
            log::error!("Load failed: {err}");
        }
    }

    // Scene transition: release the scene's loads, keep the untracked sounds
    let mut queue = LifecycleQueue::new();
    queue.push(ScopeEvent::Unloaded {
        scope: context.current_scope(),
    });
    queue.push(ScopeEvent::Entered {
        scope: Scope::new("level_2"),
    });
    queue.swap();
    let released = context.process_events(&mut queue);
    log::info!("Scene change released {} handles", released.released);

    context.release(sounds.handle());
    log::info!("Stats: {:?}", context.stats());
    log::info!("Backend handles still live: {}", backend.live_handles());

    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        eprintln!("Asset demo error: {}", e);
    }
}
