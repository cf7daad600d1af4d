use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;
use tradebook::core_types::Direction;
use tradebook::database::{JsonFileStore, SaveMode};
use tradebook::market_data::StaticQuoteSource;
use tradebook::{build_engine, configuration, Engine};

fn config_for(dir: &TempDir) -> configuration::Config {
    let toml = format!(
        r#"
        [ledger]
        default_starting_cash = 1000

        [market_data]
        provider = "static"

        [storage]
        backend = "json"
        snapshot_dir = "{}"
        "#,
        dir.path().display()
    );
    configuration::parse_config(&toml).unwrap()
}

#[tokio::test]
async fn configured_engine_saves_and_reloads_an_account() {
    let dir = TempDir::new().unwrap();
    let engine = build_engine(&config_for(&dir)).await.unwrap();

    engine.open_trader("alice", None).await.unwrap();
    engine.buy("alice", "acme", dec!(10), dec!(50)).await.unwrap();
    engine.save("alice", SaveMode::CreateNew).await.unwrap();
    assert!(dir.path().join("alice.json").exists());

    let restarted = build_engine(&config_for(&dir)).await.unwrap();
    assert_eq!(restarted.saved_names().await.unwrap(), vec!["alice"]);
    restarted.load("alice").await.unwrap();
    assert_eq!(restarted.cash("alice").await.unwrap(), dec!(500));

    let snapshot = restarted.snapshot("alice").await.unwrap();
    assert_eq!(snapshot.positions.len(), 1);
    assert_eq!(snapshot.positions[0].symbol, "ACME");
}

#[tokio::test]
async fn long_then_short_on_the_same_symbol() {
    let dir = TempDir::new().unwrap();
    let quotes = StaticQuoteSource::new().with_quote("ACME", (dec!(55), dec!(500)), (dec!(55.10), dec!(500)));
    let engine = Engine::new(
        Arc::new(quotes),
        Arc::new(JsonFileStore::new(dir.path())),
        dec!(1000),
    );
    engine.open_trader("alice", None).await.unwrap();

    let fill = engine.buy("alice", "ACME", dec!(10), dec!(50)).await.unwrap();
    assert_eq!(fill.cash_after, dec!(500));

    let fill = engine.sell("alice", "ACME", dec!(4), dec!(60)).await.unwrap();
    assert_eq!(fill.cash_after, dec!(740));
    assert_eq!(fill.remaining, dec!(6));

    let fill = engine.short_sell("alice", "ACME", dec!(5)).await.unwrap();
    assert_eq!(fill.cash_after, dec!(1015));

    let snapshot = engine.snapshot("alice").await.unwrap();
    let held = |direction| {
        snapshot
            .positions
            .iter()
            .find(|p| p.symbol == "ACME" && p.direction == direction)
            .map(|p| p.quantity)
    };
    assert_eq!(held(Direction::Long), Some(dec!(6)));
    assert_eq!(held(Direction::Short), Some(dec!(5)));

    // Covering delivers out of the long position; no cash moves.
    let cover = engine.short_cover("alice", "ACME", dec!(5)).await.unwrap();
    assert_eq!(cover.short_remaining, dec!(0));
    assert_eq!(cover.long_delivered, Some(dec!(5)));
    assert_eq!(engine.cash("alice").await.unwrap(), dec!(1015));

    let snapshot = engine.snapshot("alice").await.unwrap();
    assert_eq!(snapshot.positions.len(), 1);
    assert_eq!(snapshot.positions[0].quantity, dec!(1));
}
