//! `pricelens ask`: Answer one query from the terminal.

use anyhow::Context;
use pricelens_config::AppConfig;
use pricelens_pipeline::{QueryOutcome, QueryPipeline, QueryStatus};

pub async fn run(query: String, json: bool) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let pipeline = QueryPipeline::from_config(&config).context("Failed to build pipeline")?;

    let outcome = tokio::select! {
        outcome = pipeline.run(&query) => outcome,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("Interrupted");
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", render(&outcome));
    }

    if outcome.is_unavailable() {
        anyhow::bail!("Query could not be answered: a backing service is unavailable");
    }
    Ok(())
}

/// Human-readable rendering: the answer, then one line per record.
pub fn render(outcome: &QueryOutcome) -> String {
    let mut out = format!("{}\n", outcome.result.response());

    if outcome.status == QueryStatus::Answered {
        let records = outcome.result.pricing_data();
        out.push('\n');
        for record in records.iter().take(20) {
            out.push_str(&format!(
                "  {:<16} {:<28} {:<16} {} {}\n",
                record.instance_type,
                record.operating_system,
                record.region,
                record.on_demand_price,
                record.unit
            ));
        }
        if records.len() > 20 {
            out.push_str(&format!("  … {} more (use --json)\n", records.len() - 20));
        }
    }

    out
}
