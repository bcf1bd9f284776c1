use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use pjextract_core::{
    ConfigError, Credentials, ExtractionMode, InstanceId, InstanceSelection, RunRequest, Settings,
};

/// Collects the processes of a lawyer's panel across the regional labor
/// courts and writes them to a spreadsheet.
#[derive(Parser)]
#[command(name = "pjextract", version, about)]
pub struct Args {
    /// Portal login (CPF or OAB).
    #[arg(long, env = "PJE_USERNAME", hide_env_values = true)]
    pub username: String,

    #[arg(long, env = "PJE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Which process categories to collect.
    #[arg(long, value_enum, default_value_t = Mode::Both)]
    pub mode: Mode,

    /// Instances to skip, e.g. `--exclude 3,7`.
    #[arg(long, value_delimiter = ',', value_parser = parse_instance)]
    pub exclude: Vec<InstanceId>,

    /// Directory the workbook is written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Show the browser window during logins.
    #[arg(long)]
    pub headful: bool,

    /// Pause after each page, in milliseconds.
    #[arg(long)]
    pub page_delay_ms: Option<u64>,

    /// Pause between instances, in milliseconds.
    #[arg(long)]
    pub instance_delay_ms: Option<u64>,

    /// Page cap per instance and category.
    #[arg(long)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    General,
    Archived,
    Both,
}

impl From<Mode> for ExtractionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::General => ExtractionMode::GeneralOnly,
            Mode::Archived => ExtractionMode::ArchivedOnly,
            Mode::Both => ExtractionMode::Both,
        }
    }
}

fn parse_instance(raw: &str) -> Result<InstanceId, String> {
    let n: u8 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not an instance number"))?;
    InstanceId::new(n).map_err(|e| e.to_string())
}

impl Args {
    /// Defaults overlaid with whatever tunables were given.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        if let Some(ms) = self.page_delay_ms {
            settings.page_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.instance_delay_ms {
            settings.instance_delay = Duration::from_millis(ms);
        }
        if let Some(pages) = self.max_pages {
            settings.max_pages = pages;
        }
        settings
    }

    pub fn run_request(&self) -> Result<RunRequest, ConfigError> {
        let credentials = Credentials::new(self.username.as_str(), self.password.as_str())?;
        let instances = InstanceSelection::excluding(&self.exclude);
        if instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }
        Ok(RunRequest {
            credentials,
            instances,
            mode: self.mode.into(),
        })
    }
}
