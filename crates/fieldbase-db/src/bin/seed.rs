//! # Seed Data Generator
//!
//! Populates the database with advisory content for development, so the
//! search screens and the sync engine can be exercised without a server.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults
//! cargo run -p fieldbase-db --bin seed
//!
//! # Specify database path
//! cargo run -p fieldbase-db --bin seed -- --db ./data/fieldbase.db
//! ```

use chrono::Utc;
use std::env;

use fieldbase_core::{ContentRecord, MenuRecord};
use fieldbase_db::{Database, DbConfig};

/// Menus and their keyword-chained content.
const CONTENT: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "animals",
        "Animals",
        &[
            ("Animals Cattle Feeding", "Feed cattle on napier grass and maize stover; provide salt licks."),
            ("Animals Cattle Diseases FootAndMouth", "Isolate affected animals and report to the veterinary officer."),
            ("Animals Goats Breeding", "Service does at 18 months; separate bucks outside breeding season."),
            ("Animals Poultry Housing", "Keep deep litter dry; allow one square foot per bird."),
        ],
    ),
    (
        "crops",
        "Crops",
        &[
            ("Crops Maize Planting", "Plant at the onset of rains, spacing 75cm by 30cm, two seeds per hill."),
            ("Crops Maize Pests StalkBorer", "Apply ash into the funnel or use recommended granules."),
            ("Crops Beans Varieties", "K132 and NABE4 mature in 80-90 days and tolerate root rot."),
            ("Crops Cassava Harvesting", "Harvest 10-12 months after planting; do not store roots beyond 2 days."),
        ],
    ),
    (
        "market",
        "Market Prices",
        &[
            ("Market Maize Kampala", "Wholesale maize grain, Kampala: consult weekly bulletin."),
            ("Market Beans Mbale", "Wholesale beans, Mbale: consult weekly bulletin."),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./fieldbase_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("FieldBase Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./fieldbase_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("FieldBase Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.content().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} content records", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding content...");

    let mut generated = 0;
    for (menu_id, label, entries) in CONTENT {
        db.content()
            .upsert_menu(&MenuRecord {
                id: (*menu_id).to_string(),
                label: (*label).to_string(),
            })
            .await?;

        for (order, (chain, body)) in entries.iter().enumerate() {
            let record = ContentRecord {
                id: format!("{}-{}", menu_id, order),
                menu_id: (*menu_id).to_string(),
                order: order as i64,
                category: (*label).to_string(),
                attribution: "FieldBase development seed".to_string(),
                last_updated: Utc::now().to_rfc3339(),
                keywords: ContentRecord::split_chain(chain),
                body: (*body).to_string(),
            };

            db.content().upsert_record(&record).await?;
            generated += 1;
        }
    }

    db.properties()
        .set_feed_version(fieldbase_core::FeedKind::Keywords, "seed")
        .await?;

    db.id_pool()
        .insert_ids(&(100..120).map(|n| format!("SUBJ-{}", n)).collect::<Vec<_>>())
        .await?;

    println!("✓ Seeded {} content records across {} menus", generated, CONTENT.len());

    let hits = db.content().find_by_keywords("Crops Maize", 10).await?;
    println!("  Lookup 'Crops Maize': {} results", hits.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
