//! Catalog command handlers: recommend, songs, info.

use cadence::config::CadenceConfig;
use cadence::services::{RecommendRequest, ServiceContainer};

use super::render_response;

/// Recommend command.
pub fn cmd_recommend(
    config: CadenceConfig,
    song: String,
    count: Option<i64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let services = ServiceContainer::from_config(config)?;
    let result = services
        .queries()
        .recommend(&RecommendRequest::new(song, count));

    if json {
        println!("{}", serde_json::to_string_pretty(&render_response(&result))?);
        return result.map(|_| ()).map_err(Into::into);
    }

    let recommendation = result?;
    if recommendation.is_empty() {
        println!("No songs found like '{}'", recommendation.original_song);
        return Ok(());
    }

    println!("Songs like '{}':", recommendation.original_song);
    println!();
    for (rank, scored) in recommendation.recommendations.iter().enumerate() {
        let singer = scored.song.singer.as_deref().unwrap_or("unknown singer");
        let released = scored.song.released_date.as_deref().unwrap_or("unknown date");
        println!(
            "  {:>2}. [{:.4}] {} ({singer}, {released})",
            rank + 1,
            scored.similarity,
            scored.song.song_name
        );
    }

    Ok(())
}

/// Songs command.
pub fn cmd_songs(config: CadenceConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let services = ServiceContainer::from_config(config)?;
    let songs = services.recommendations().list_items();

    if json {
        println!("{}", serde_json::to_string_pretty(&songs)?);
        return Ok(());
    }

    for song in &songs {
        match song.singer.as_deref() {
            Some(singer) => println!("{} - {singer}", song.song_name),
            None => println!("{}", song.song_name),
        }
    }
    println!();
    println!("{} songs", songs.len());

    Ok(())
}

/// Info command.
pub fn cmd_info(config: CadenceConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let services = ServiceContainer::from_config(config)?;
    let info = services.recommendations().dataset_info();

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Dataset Info");
    println!("============");
    println!();
    println!("Total Songs: {}", info.total_songs);
    println!("Clusters: {}", info.clusters);
    println!("Features: {}", info.features);
    println!("Unlabeled Songs: {}", info.unlabeled_songs);
    println!();
    println!("Cluster Distribution:");
    for (cluster, size) in &info.cluster_distribution {
        println!("  {cluster}: {size}");
    }

    Ok(())
}
