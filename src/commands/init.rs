use crate::config::Config;
use crate::error::Result;
use crate::model::ScopePolicy;
use crate::output::Format;
use crate::store::Home;

pub fn run(
    home: &Home,
    url: String,
    anon_key: String,
    table: Option<String>,
    scope: Option<ScopePolicy>,
    format: Format,
) -> Result<()> {
    let mut config = home.read_config()?;
    config.url = Some(url.trim_end_matches('/').to_string());
    config.anon_key = Some(anon_key);
    if let Some(table) = table {
        config.table = table;
    }
    if let Some(scope) = scope {
        config.scope = scope;
    }
    home.write_config(&config)?;
    print_config(home, &config, format)
}

fn print_config(home: &Home, config: &Config, format: Format) -> Result<()> {
    match format {
        Format::Json => println!(
            "{}",
            serde_json::json!({
                "home": home.root().display().to_string(),
                "url": config.url,
                "table": config.table,
                "scope": config.scope,
            })
        ),
        _ => eprintln!(
            "Wrote {} (table: {}, scope: {})",
            home.root().join("config.json").display(),
            config.table,
            config.scope
        ),
    }
    Ok(())
}
