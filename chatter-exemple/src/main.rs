use chatter_core::source::JsonlSource;
use chatter_core::{ChatError, Config, DeadEnd, Engine, MarkovModel, Metric, Standing};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // One JSON message per line, raw chat export field names are accepted:
    // {"id":"1","user_id":"42","name":"Ann","text":"hi","favorited_by":["7"],"created_at":1700000000}
    let corpus = std::env::args().nth(1).unwrap_or_else(|| "./data/chat.jsonl".to_owned());

    // Defaults: order 6, reseed on dead ends, parallel rebuild
    let mut config = Config::default();

    // Short chats need a small chain order to produce anything
    config.order = 3;

    // Order 0 is refused
    match Config::from_toml_str("order = 0") {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Refused: {e}"),
    }

    // Full rebuild from the corpus
    let mut engine = Engine::new(config.clone())?;
    let report = engine.rebuild(&JsonlSource::new(&corpus))?;
    println!(
        "{} messages ingested ({} duplicates, {} skipped)",
        report.accepted, report.duplicates, report.skipped
    );

    // The model alone can also be opened from the corpus.
    // The first call writes '<corpus>.k3.bin', later calls load it.
    let model = MarkovModel::open(&corpus, &config)?;
    println!("{} speakers in the cached model", model.speakers().len());

    // Make everyone talk, once ending where the speaker would stop ('Stop'),
    // once filling the full length with fresh seeds ('Reseed')
    for speaker in model.speakers() {
        let name = engine.directory().name_of(speaker).unwrap_or(speaker);
        println!("{name} (cut): {}", model.generate(speaker, 30, DeadEnd::Stop)?);
        println!("{name} (full): {}", model.generate(speaker, 30, DeadEnd::Reseed)?);
    }

    // Asking for a speaker nobody has heard of
    match engine.generate("nobody", 10, None) {
        Err(ChatError::NoDataForSpeaker { speaker_id }) => println!("No data for '{speaker_id}'"),
        other => println!("Should not happen: {other:?}"),
    }

    let analytics = engine.analytics();

    println!("Most used words:");
    for (word, count) in analytics.top_words(10) {
        println!("  {word}: {count}");
    }

    // Every ranking, best first
    for metric in Metric::ALL {
        println!("{metric:?}:");
        for (user, value) in analytics.leaderboard(metric).into_iter().take(5) {
            let name = engine.directory().name_of(user).unwrap_or(user);
            println!("  {name}: {value:.2}");
        }
    }

    // Per-user details for the most liked user
    if let Some((user, _)) = analytics.leaderboard(Metric::LikesReceived).first() {
        let received = analytics.likes_received(user)?;
        println!("{user} received {} likes, mostly from {:?}", received.total, received.by_user.first());
        match analytics.rank(Metric::Ratio, user)? {
            Standing::Ranked { value, rank } => println!("{user} ratio {value:.2}, rank {rank}"),
            Standing::Unranked => println!("{user} has no ratio"),
        }
    }

    Ok(())
}
