//! Domain types shared across the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Key under which each record is tagged with its originating instance.
pub const INSTANCE_TAG: &str = "TRT";

/// One regional deployment of the PJe portal (TRT1..TRT24).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(u8);

impl InstanceId {
    pub const FIRST: u8 = 1;
    pub const LAST: u8 = 24;

    pub fn new(n: u8) -> Result<Self, ConfigError> {
        if (Self::FIRST..=Self::LAST).contains(&n) {
            Ok(Self(n))
        } else {
            Err(ConfigError::InvalidInstance(n))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every instance of the deployment, ascending.
    pub fn all() -> impl Iterator<Item = InstanceId> {
        (Self::FIRST..=Self::LAST).map(InstanceId)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TRT{}", self.0)
    }
}

/// Ordered list of instances to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSelection(Vec<InstanceId>);

impl InstanceSelection {
    /// All instances in ascending order, minus `excluded`.
    pub fn excluding(excluded: &[InstanceId]) -> Self {
        Self(
            InstanceId::all()
                .filter(|id| !excluded.contains(id))
                .collect(),
        )
    }

    /// Caller-specified order, duplicates removed (first occurrence wins).
    pub fn from_ids(ids: impl IntoIterator<Item = InstanceId>) -> Self {
        let mut out: Vec<InstanceId> = Vec::new();
        for id in ids {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self(out)
    }

    pub fn as_slice(&self) -> &[InstanceId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Docket a record is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Active cases ("acervo geral").
    General,
    /// Archived cases.
    Archived,
}

impl Category {
    /// Value of the `tipoPainelAdvogado` query parameter.
    pub fn remote_code(self) -> u8 {
        match self {
            Self::General => 1,
            Self::Archived => 5,
        }
    }

    /// Human-readable name, also used as the sheet name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::General => "Acervo Geral",
            Self::Archived => "Processos Arquivados",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which categories a run collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    GeneralOnly,
    ArchivedOnly,
    #[default]
    Both,
}

impl ExtractionMode {
    pub fn categories(self) -> &'static [Category] {
        match self {
            Self::GeneralOnly => &[Category::General],
            Self::ArchivedOnly => &[Category::Archived],
            Self::Both => &[Category::General, Category::Archived],
        }
    }

    /// Name of the workbook produced for this mode.
    pub fn filename(self) -> &'static str {
        match self {
            Self::GeneralOnly => "processos_acervo_geral.xlsx",
            Self::ArchivedOnly => "processos_arquivados.xlsx",
            Self::Both => "processos_geral_e_arquivados.xlsx",
        }
    }
}

/// Portal login. Never persisted, never logged.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Both fields must be non-empty after trimming.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let username = username.into().trim().to_string();
        let password = password.into();
        if username.is_empty() {
            return Err(ConfigError::MissingCredential("username"));
        }
        if password.trim().is_empty() {
            return Err(ConfigError::MissingCredential("password"));
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated material for one instance.
///
/// Built by [`AuthSession::from_cookies`] after a successful
/// login and consumed by the collector for the same instance.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub cookie_header: String,
    pub csrf_token: String,
    pub panel_id: String,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("cookie_header", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .field("panel_id", &self.panel_id)
            .finish()
    }
}

/// One case as returned by the panel API. Fields are owned by the remote
/// service and kept as-is, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessRecord(Map<String, Value>);

impl ProcessRecord {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Tag the record with the instance it was fetched from.
    pub fn tag_instance(&mut self, instance: InstanceId) {
        self.insert(INSTANCE_TAG, Value::from(instance.get()));
    }

    pub fn instance(&self) -> Option<u64> {
        self.get(INSTANCE_TAG).and_then(Value::as_u64)
    }
}

impl From<Map<String, Value>> for ProcessRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Accumulated records of a run, one sequence per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub general: Vec<ProcessRecord>,
    pub archived: Vec<ProcessRecord>,
}

impl ResultSet {
    pub fn records(&self, category: Category) -> &[ProcessRecord] {
        match category {
            Category::General => &self.general,
            Category::Archived => &self.archived,
        }
    }

    pub fn extend(&mut self, category: Category, records: impl IntoIterator<Item = ProcessRecord>) {
        match category {
            Category::General => self.general.extend(records),
            Category::Archived => self.archived.extend(records),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.archived.is_empty()
    }

    pub fn len(&self) -> usize {
        self.general.len() + self.archived.len()
    }
}
