//! User interface module
//!
//! Turns CLI commands into session store operations and renders the store's
//! published snapshots. The store stays the only owner of simulation state.

pub mod cli;

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use crate::api::{SimulationService, StreamConnector};
use crate::cli::{Commands, StartArgs};
use crate::locale::{Locale, LocalePreference, Messages};
use crate::session::{SessionStore, StoreSnapshot};

/// Tracks what of the active simulation has already been printed
#[derive(Debug, Default)]
pub struct LiveView {
    session_id: Option<String>,
    rendered_steps: usize,
    outcome_rendered: bool,
}

impl LiveView {
    /// Print whatever the snapshot adds to what was printed before
    pub fn render(&mut self, snapshot: &StoreSnapshot, messages: &Messages) -> Result<()> {
        let Some(current) = &snapshot.current else {
            return Ok(());
        };

        if self.session_id.as_deref() != Some(current.id.as_str()) {
            self.session_id = Some(current.id.clone());
            self.rendered_steps = 0;
            self.outcome_rendered = false;
            cli::display_simulation_header(current, messages).map_err(|e| anyhow!(e))?;
        }

        // A reconciled snapshot may hold fewer steps than were streamed
        self.rendered_steps = self.rendered_steps.min(current.steps.len());
        for step in &current.steps[self.rendered_steps..] {
            cli::display_step(step, messages).map_err(|e| anyhow!(e))?;
        }
        self.rendered_steps = current.steps.len();

        if current.status.is_terminal() && !self.outcome_rendered {
            self.outcome_rendered = true;
            cli::display_outcome(current, messages).map_err(|e| anyhow!(e))?;
        }

        Ok(())
    }
}

/// Executes user commands against the session store
pub struct Presenter<S, C> {
    store: SessionStore<S, C>,
    locale: LocalePreference,
}

impl<S, C> Presenter<S, C>
where
    S: SimulationService,
    C: StreamConnector,
{
    pub fn new(store: SessionStore<S, C>, locale: LocalePreference) -> Self {
        Self { store, locale }
    }

    fn messages(&self) -> &'static Messages {
        self.locale.messages()
    }

    /// Run one command to completion
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::List => self.handle_list().await,
            Commands::Show { id } => self.handle_show(&id).await,
            Commands::Start(args) => self.handle_start(&args).await,
            Commands::Watch { id } => self.handle_watch(&id).await,
            Commands::Delete { id } => self.handle_delete(&id).await,
            Commands::Locale { code } => self.handle_locale(code.as_deref()),
            Commands::Config { .. } => Err(anyhow!("config commands are handled before connecting")),
        }
    }

    async fn handle_list(&mut self) -> Result<()> {
        self.store.refresh_list().await?;
        cli::display_simulation_list(self.store.simulations(), self.messages())
            .map_err(|e| anyhow!(e))
    }

    async fn handle_show(&mut self, id: &str) -> Result<()> {
        let simulation = self.store.fetch(id).await?;
        cli::display_simulation(&simulation, self.messages()).map_err(|e| anyhow!(e))
    }

    async fn handle_start(&mut self, args: &StartArgs) -> Result<()> {
        let request = args.to_request(self.locale.locale().into());
        request.validate()?;

        let simulation = self.store.start(&request).await?;
        cli::display_info(&format!("{}: {}", self.messages().started, simulation.id));

        self.follow().await
    }

    async fn handle_watch(&mut self, id: &str) -> Result<()> {
        self.store.select(id).await?;
        self.follow().await
    }

    async fn handle_delete(&mut self, id: &str) -> Result<()> {
        self.store.remove(id).await?;
        cli::display_info(&format!("{}: {}", self.messages().deleted, id));
        Ok(())
    }

    fn handle_locale(&mut self, code: Option<&str>) -> Result<()> {
        if let Some(code) = code {
            let locale =
                Locale::parse(code).ok_or_else(|| anyhow!("unsupported locale: {}", code))?;
            self.locale.set(locale)?;
            cli::display_info(&format!("{}: {}", self.messages().locale_saved, locale));
        } else {
            println!("{}: {}", self.messages().current_locale, self.locale.locale());
        }
        Ok(())
    }

    /// Render the active simulation while its channel delivers events
    async fn follow(&mut self) -> Result<()> {
        let messages = self.messages();
        let mut snapshots = self.store.subscribe();
        let mut view = LiveView::default();

        let snapshot = snapshots.borrow_and_update().clone();
        view.render(&snapshot, messages)?;

        if self.store.has_open_channel() {
            cli::display_info(messages.following);
        }

        let mut failure = None;
        while let Some(event) = self.store.next_event().await {
            if let Err(e) = self.store.handle_event(event).await {
                warn!("Failed to apply stream event: {}", e);
                failure = Some(e);
            }

            if snapshots.has_changed().unwrap_or(false) {
                let snapshot = snapshots.borrow_and_update().clone();
                view.render(&snapshot, messages)?;
            }
        }

        if let Some(current) = self.store.current() {
            info!("Stopped following simulation {} ({})", current.id, current.status);
            if !current.status.is_terminal() {
                cli::display_info(messages.stream_ended);
            }
        }

        match failure {
            Some(e) => Err(anyhow!(e).context("final state could not be confirmed")),
            None => Ok(()),
        }
    }
}
