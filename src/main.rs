use simarena::{
    AppResult,
    api::{SimulationClient, SimulationSocket},
    cli::{Cli, Commands, ConfigAction},
    config::Config,
    init_logging,
    locale::{Locale, LocalePreference},
    session::SessionStore,
    ui::{Presenter, cli::display_error},
};

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    // Load configuration; logging falls back to defaults when it is invalid
    let (config, config_error) = match Config::load(&cli.config_file) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize logging
    let log_guard = init_logging(
        &cli.effective_log_level(&config.log_level),
        &config.log.file_path,
    )?;

    tracing::info!("SimArena client starting...");
    tracing::debug!("CLI arguments: {:?}", cli);

    // Resetting is the way out of a broken configuration
    if let Commands::Config {
        action: Some(ConfigAction::Reset),
    } = &cli.command
    {
        let default_config = Config::default();
        default_config.save_to_file(&cli.config_file)?;
        default_config.display()?;
        return Ok(());
    }

    if let Some(e) = config_error {
        tracing::error!("Failed to load config: {:#}", e);
        display_error(&format!("{:#}", e), Locale::default().messages());
        drop(log_guard);
        std::process::exit(1);
    }

    // Configuration commands never talk to the server
    if let Commands::Config { .. } = &cli.command {
        config.display()?;
        return Ok(());
    }

    let locale = LocalePreference::load(&config.locale.file_path);
    let messages = locale.messages();

    let service = SimulationClient::new(config.server.rest_url.clone(), config.server.timeout());
    let connector = SimulationSocket::new(config.server.ws_url.clone());
    let store = SessionStore::new(service, connector);

    let mut presenter = Presenter::new(store, locale);
    if let Err(e) = presenter.execute(cli.command).await {
        tracing::error!("Command failed: {:#}", e);
        display_error(&format!("{:#}", e), messages);
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}
