use std::time::Duration;

use crate::model::InstanceId;

/// Tunables of a run. Defaults match the behaviour the portal tolerates.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Host of an instance; `{n}` is replaced with the instance number.
    pub host_template: String,
    /// Records requested per page.
    pub page_size: u32,
    /// Upper bound on pages fetched per (instance, category).
    pub max_pages: u32,
    /// Pause after each non-empty page.
    pub page_delay: Duration,
    /// Pause between two instances.
    pub instance_delay: Duration,
    /// Timeout of a single page request.
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host_template: "pje.trt{n}.jus.br".into(),
            page_size: 100,
            max_pages: 10_000,
            page_delay: Duration::from_millis(1500),
            instance_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    pub fn host(&self, instance: InstanceId) -> String {
        self.host_template.replace("{n}", &instance.get().to_string())
    }

    /// `https://<host>` of an instance, without trailing slash.
    pub fn origin(&self, instance: InstanceId) -> String {
        format!("https://{}", self.host(instance))
    }

    /// Login page of the first-degree instance.
    pub fn login_url(&self, instance: InstanceId) -> String {
        format!("{}/primeirograu/login.seam", self.origin(instance))
    }

    /// Prefix of the landing URL reached after a successful login.
    pub fn landing_url_prefix(&self, instance: InstanceId) -> String {
        format!("{}/pjekz/painel/usuario-externo", self.origin(instance))
    }

    /// Panel page sent as `Referer` on API calls.
    pub fn referer(&self, instance: InstanceId) -> String {
        format!("{}/advogado", self.landing_url_prefix(instance))
    }

    /// Paginated process listing of a panel.
    pub fn processes_url(&self, instance: InstanceId, panel_id: &str) -> String {
        format!(
            "{}/pje-comum-api/api/paineladvogado/{panel_id}/processos",
            self.origin(instance)
        )
    }
}
