use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "map-info")]
#[command(about = "Print a summary of a Teeworlds/DDNet map")]
struct Cli {
    /// Path to the .map file
    map: PathBuf,

    /// Also print every map setting
    #[arg(long)]
    settings: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let map = ddmap::load(&cli.map)?;

    println!("{} ({}x{} tiles)", cli.map.display(), map.width, map.height);
    if let Some(author) = &map.info.author {
        println!("author:   {author}");
    }
    if let Some(version) = &map.info.version {
        println!("version:  {version}");
    }
    if let Some(license) = &map.info.license {
        println!("license:  {license}");
    }

    for (name, present) in [
        ("game", map.has_game_layer()),
        ("front", !map.front.is_empty()),
        ("tele", !map.tele.is_empty()),
        ("speedup", !map.speedup.is_empty()),
        ("switch", !map.switches.is_empty()),
        ("tune", !map.tune.is_empty()),
    ] {
        if present {
            println!("layer:    {name}");
        }
    }

    println!(
        "spawns:   {}   tele-outs: {}   checkpoints: {}",
        map.spawn_points.len(),
        map.tele_outs.len(),
        map.tele_check_outs.len()
    );
    println!("settings: {}", map.settings.len());
    if cli.settings {
        for setting in &map.settings {
            println!("  {setting}");
        }
    }
    Ok(())
}
