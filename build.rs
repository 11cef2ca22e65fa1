// Necessary because of this issue: https://github.com/rust-lang/cargo/issues/9641
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // host builds (tests, tooling) have no ESP-IDF to link against.
    if std::env::var_os("CARGO_FEATURE_ESP").is_none() {
        return Ok(());
    }
    embuild::build::CfgArgs::output_propagated("ESP_IDF")?;
    embuild::build::LinkArgs::output_propagated("ESP_IDF")?;
    Ok(())
}
