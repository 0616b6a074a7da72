use maw_common::config::AppConfig;

pub(crate) fn print_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
