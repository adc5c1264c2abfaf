//! The `proctor init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create proctor.toml
    if std::path::Path::new("proctor.toml").exists() {
        println!("proctor.toml already exists, skipping.");
    } else {
        std::fs::write("proctor.toml", SAMPLE_CONFIG)?;
        println!("Created proctor.toml");
    }

    // Create example assessment
    std::fs::create_dir_all("assessments")?;
    let example_path = std::path::Path::new("assessments/example.toml");
    if example_path.exists() {
        println!("assessments/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_ASSESSMENT)?;
        println!("Created assessments/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit proctor.toml to point at your interpreters");
    println!("  2. Run: proctor validate --assessment assessments/example.toml");
    println!("  3. Run: proctor take --assessment assessments/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# proctor configuration

# Where attempt reports are written.
output_dir = "./proctor-results"

[session]
# Used when an assessment has no time_limit_secs.
default_time_limit_secs = 3600
# Prohibited key combinations tolerated before the attempt is terminated.
violation_threshold = 3
tick_interval_ms = 1000

[runner]
# Per test case.
timeout_secs = 5
max_output_bytes = 65536
parallelism = 4
python = "python3"
node = "node"
rustc = "rustc"
"#;

const EXAMPLE_ASSESSMENT: &str = include_str!("../../../../assessments/rust-basics.toml");
