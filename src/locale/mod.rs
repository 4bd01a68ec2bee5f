//! Interface language preference and message catalogs

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::{Language, SimulationStatus};

/// Supported interface languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }

    /// Recognize a stored locale code
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "en" => Some(Locale::En),
            "ru" => Some(Locale::Ru),
            _ => None,
        }
    }

    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::En => &EN,
            Locale::Ru => &RU,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<Locale> for Language {
    fn from(locale: Locale) -> Self {
        match locale {
            Locale::En => Language::En,
            Locale::Ru => Language::Ru,
        }
    }
}

/// Locale code persisted in a single file.
///
/// The file is read once when loading and rewritten on every change.
#[derive(Debug, Clone)]
pub struct LocalePreference {
    path: PathBuf,
    locale: Locale,
}

impl LocalePreference {
    /// Read the stored locale, falling back to English when the file is
    /// missing or holds an unknown code.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let locale = match std::fs::read_to_string(&path) {
            Ok(content) => Locale::parse(&content).unwrap_or_else(|| {
                debug!("Unrecognized locale {:?} in {}", content.trim(), path.display());
                Locale::default()
            }),
            Err(e) => {
                debug!("No stored locale at {}: {}", path.display(), e);
                Locale::default()
            }
        };

        Self { path, locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn messages(&self) -> &'static Messages {
        self.locale.messages()
    }

    /// Switch locale and persist it
    pub fn set(&mut self, locale: Locale) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(&self.path, locale.code())
            .with_context(|| format!("Failed to write locale file: {}", self.path.display()))?;

        self.locale = locale;
        info!("Locale set to {}", locale);
        Ok(())
    }
}

/// User-facing strings for one locale
#[derive(Debug)]
pub struct Messages {
    pub sessions_title: &'static str,
    pub no_sessions: &'static str,
    pub status_running: &'static str,
    pub status_completed: &'static str,
    pub status_failed: &'static str,
    pub description: &'static str,
    pub preconditions: &'static str,
    pub agents: &'static str,
    pub rounds: &'static str,
    pub round: &'static str,
    pub created: &'static str,
    pub final_result: &'static str,
    pub no_steps: &'static str,
    pub started: &'static str,
    pub following: &'static str,
    pub stream_ended: &'static str,
    pub deleted: &'static str,
    pub current_locale: &'static str,
    pub locale_saved: &'static str,
    pub error: &'static str,
}

impl Messages {
    pub fn status(&self, status: SimulationStatus) -> &'static str {
        match status {
            SimulationStatus::Running => self.status_running,
            SimulationStatus::Completed => self.status_completed,
            SimulationStatus::Failed => self.status_failed,
        }
    }
}

pub static EN: Messages = Messages {
    sessions_title: "Simulations",
    no_sessions: "No simulations yet",
    status_running: "running",
    status_completed: "completed",
    status_failed: "failed",
    description: "Description",
    preconditions: "Preconditions",
    agents: "Agents",
    rounds: "Rounds",
    round: "Round",
    created: "Created",
    final_result: "Final result",
    no_steps: "No steps yet",
    started: "Simulation started",
    following: "Following live updates",
    stream_ended: "Live updates ended",
    deleted: "Simulation deleted",
    current_locale: "Current language",
    locale_saved: "Language saved",
    error: "Error",
};

pub static RU: Messages = Messages {
    sessions_title: "Симуляции",
    no_sessions: "Симуляций пока нет",
    status_running: "выполняется",
    status_completed: "завершена",
    status_failed: "ошибка",
    description: "Описание",
    preconditions: "Предусловия",
    agents: "Агенты",
    rounds: "Раунды",
    round: "Раунд",
    created: "Создана",
    final_result: "Итоговый результат",
    no_steps: "Шагов пока нет",
    started: "Симуляция запущена",
    following: "Отслеживание обновлений",
    stream_ended: "Обновления завершены",
    deleted: "Симуляция удалена",
    current_locale: "Текущий язык",
    locale_saved: "Язык сохранён",
    error: "Ошибка",
};
