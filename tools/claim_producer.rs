//! Claim Producer
//!
//! Generates random insurance claims and publishes them to NATS for
//! end-to-end testing of the claim worker. A share of the messages is
//! deliberately malformed to exercise the failure path.

use claim_fraud_worker::producer::ClaimPublisher;
use claim_fraud_worker::types::ClaimSubmission;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Random claim generator
struct ClaimGenerator {
    rng: rand::rngs::ThreadRng,
    claim_counter: u64,
}

impl ClaimGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            claim_counter: 0,
        }
    }

    fn next_policy_number(&mut self) -> String {
        self.claim_counter += 1;
        format!("{}{:05}", self.rng.gen_range(100..999), self.claim_counter)
    }

    /// Generate a claim with plausible attribute values
    fn generate(&mut self) -> ClaimSubmission {
        let mut claim = ClaimSubmission::new(self.next_policy_number())
            .with_category(
                "incident_type",
                self.random_choice(&[
                    "Single Vehicle Collision",
                    "Multi-vehicle Collision",
                    "Vehicle Theft",
                    "Parked Car",
                ]),
            )
            .with_category(
                "collision_type",
                self.random_choice(&["Front Collision", "Rear Collision", "Side Collision", "?"]),
            )
            .with_category(
                "incident_severity",
                self.random_choice(&["Minor Damage", "Major Damage", "Total Loss", "Trivial Damage"]),
            )
            .with_category("policy_csl", self.random_choice(&["100/300", "250/500", "500/1000"]))
            .with_category("insured_sex", self.random_choice(&["MALE", "FEMALE"]));

        claim.months_as_customer = self.rng.gen_range(0..480);
        claim.policy_deductable = *self.random_item(&[500, 1000, 2000]);
        claim.umbrella_limit = *self.random_item(&[0, 0, 0, 5_000_000, 6_000_000]);
        claim.capital_gains = self.rng.gen_range(0..100_000);
        claim.capital_loss = -self.rng.gen_range(0..100_000);
        claim.incident_hour_of_the_day = self.rng.gen_range(0..24);
        claim.number_of_vehicles_involved = self.rng.gen_range(1..5);
        claim.bodily_injuries = self.rng.gen_range(0..3);
        claim.witnesses = self.rng.gen_range(0..4);
        claim.injury_claim = self.rng.gen_range(0.0..20_000.0_f64).round();
        claim.property_claim = self.rng.gen_range(0.0..20_000.0_f64).round();
        claim.vehicle_claim = self.rng.gen_range(0.0..80_000.0_f64).round();
        claim
    }

    /// Generate a payload the worker must reject
    fn generate_malformed(&mut self) -> Vec<u8> {
        match self.rng.gen_range(0..3) {
            0 => b"{\"policy_number\": ".to_vec(),
            1 => br#"{"months_as_customer": 12, "witnesses": 1}"#.to_vec(),
            _ => format!(
                r#"{{"policy_number": "{}", "witnesses": [1, 2]}}"#,
                self.next_policy_number()
            )
            .into_bytes(),
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }

    fn random_item<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.gen_range(0..items.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("claim_producer=info".parse()?),
        )
        .init();

    info!("Starting Claim Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("claims.submitted");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let malformed_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.05);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        malformed_rate = malformed_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    };

    let publisher = ClaimPublisher::new(client, subject);
    let mut generator = ClaimGenerator::new();
    let mut rng = rand::thread_rng();
    let malformed_rate = malformed_rate.clamp(0.0, 1.0);

    let mut valid_count = 0;
    let mut malformed_count = 0;

    for i in 0..count {
        if rng.gen_bool(malformed_rate) {
            malformed_count += 1;
            publisher.publish_raw(generator.generate_malformed()).await?;
        } else {
            valid_count += 1;
            publisher.publish(&generator.generate()).await?;
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} claims ({} valid, {} malformed)",
                i + 1,
                count,
                valid_count,
                malformed_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Published {} claims ({} valid, {} malformed)",
        count, valid_count, malformed_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = ClaimGenerator::new();

    for i in 0..count {
        let json = serde_json::to_string_pretty(&generator.generate())?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample claim {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
