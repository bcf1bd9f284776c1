//! Login flows of the PJe first-degree portal.
//!
//! Instances run one of two flows, told apart by a single probe for the PDPJ
//! single-sign-on button on the login page. Both converge on the lawyer
//! panel, whose cookies hold everything the API needs.

use std::fmt;
use std::time::Duration;

use chromiumoxide::{Browser, Page};
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::error::CdpError;
use pjextract_core::{AuthError, AuthSession, Credentials, InstanceId, Progress, Settings};
use tracing::{debug, info};

use crate::wait::{POLL_INTERVAL, poll_until, within};

const SSO_BUTTON: &str = "#btnSsoPdpj";
const SSO_HOST: &str = "sso.cloud.pje.jus.br";
const SSO_SUBMIT: &str = "#kc-login";
const USERNAME_FIELD: &str = "#username";
const PASSWORD_FIELD: &str = "#password";
const CREDENTIAL_ENTRY_TEXT: &str = "Entrar com CPF ou OAB";
const TRADITIONAL_SUBMIT: &str = "input[name='login:btnEntrar']";

/// Which login flow an instance presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFlow {
    /// The portal's own CPF/OAB form.
    Traditional,
    /// Redirect to the PDPJ Keycloak single sign-on.
    PdpjSso,
}

impl LoginFlow {
    /// Flow selected by the presence of the SSO button.
    pub fn from_probe(sso_button_visible: bool) -> Self {
        if sso_button_visible {
            Self::PdpjSso
        } else {
            Self::Traditional
        }
    }

    pub fn status_line(self) -> &'static str {
        match self {
            Self::PdpjSso => "-> Detectado fluxo de login via PDPJ.",
            Self::Traditional => "-> Utilizando fluxo de login tradicional do PJe.",
        }
    }
}

impl fmt::Display for LoginFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Traditional => f.write_str("traditional"),
            Self::PdpjSso => f.write_str("pdpj-sso"),
        }
    }
}

/// Deadlines of each login step.
#[derive(Debug, Clone)]
pub struct LoginTimeouts {
    /// Opening the login page.
    pub navigation: Duration,
    /// Login page finishing its load.
    pub settle: Duration,
    /// Looking for the SSO button.
    pub probe: Duration,
    /// Redirect to the SSO host.
    pub sso_redirect: Duration,
    /// Credential entry point and fields of the traditional form.
    pub element: Duration,
    /// Arrival on the lawyer panel after submitting.
    pub landing: Duration,
}

impl Default for LoginTimeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            settle: Duration::from_secs(30),
            probe: Duration::from_secs(7),
            sso_redirect: Duration::from_secs(20),
            element: Duration::from_secs(15),
            landing: Duration::from_secs(30),
        }
    }
}

pub(crate) fn cdp(e: CdpError) -> AuthError {
    AuthError::Browser(e.to_string())
}

pub fn is_sso_url(url: &str) -> bool {
    url.split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .is_some_and(|host| host == SSO_HOST)
}

/// XPath of the innermost element under `<body>` whose whole text contains
/// `text`, compared case-insensitively.
pub fn innermost_text_xpath(text: &str) -> String {
    const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
    let contains = format!(
        "contains(translate(normalize-space(.), '{UPPER}', '{LOWER}'), '{}')",
        text.to_lowercase()
    );
    format!("//body//*[{contains}][not(*[{contains}])]")
}

/// Run the whole login on a fresh `page` of `browser` and harvest the
/// session from every cookie of the browser context.
pub async fn log_in(
    browser: &Browser,
    page: &Page,
    instance: InstanceId,
    credentials: &Credentials,
    settings: &Settings,
    timeouts: &LoginTimeouts,
    progress: &mut dyn Progress,
) -> Result<AuthSession, AuthError> {
    progress.message(&format!("Iniciando login via navegador no PJe {instance}..."));

    page.execute(ClearBrowserCookiesParams::default())
        .await
        .map_err(cdp)?;

    let login_url = settings.login_url(instance);
    info!(%instance, url = %login_url, "opening login page");
    within("opening the login page", timeouts.navigation, page.goto(login_url))
        .await?
        .map_err(cdp)?;
    wait_for_document(page, timeouts.settle).await?;

    let flow = detect_flow(page, timeouts.probe).await;
    info!(%instance, %flow, "login flow detected");
    progress.message(flow.status_line());

    match flow {
        LoginFlow::PdpjSso => sso_login(page, credentials, timeouts).await?,
        LoginFlow::Traditional => traditional_login(page, credentials, timeouts).await?,
    }

    let landing_prefix = settings.landing_url_prefix(instance);
    let landing = landing_prefix.as_str();
    poll_until("waiting for the lawyer panel", timeouts.landing, POLL_INTERVAL, move || async move {
        current_url(page).await.filter(|url| url.starts_with(landing))
    })
    .await?;
    progress.message("Login via navegador bem-sucedido. Coletando tokens...");

    // The page-scoped cookie call only sees cookies matching the landing URL.
    let cookies = browser.get_cookies().await.map_err(cdp)?;
    debug!(%instance, count = cookies.len(), "harvested cookies");
    let session = AuthSession::from_cookies(cookies.iter().map(|c| (c.name.as_str(), c.value.as_str())))?;

    progress.message(&format!("-> ID do painel para o {instance} detectado: {}", session.panel_id));
    Ok(session)
}

/// A visible SSO button means the PDPJ flow; absence until the probe
/// deadline means the traditional form.
async fn detect_flow(page: &Page, timeout: Duration) -> LoginFlow {
    let visible = poll_until("probing for the SSO button", timeout, POLL_INTERVAL, move || async move {
        is_visible(page, SSO_BUTTON).await.then_some(())
    })
    .await
    .is_ok();
    LoginFlow::from_probe(visible)
}

async fn sso_login(page: &Page, credentials: &Credentials, timeouts: &LoginTimeouts) -> Result<(), AuthError> {
    click(page, SSO_BUTTON).await?;
    poll_until("redirecting to the SSO", timeouts.sso_redirect, POLL_INTERVAL, move || async move {
        current_url(page).await.filter(|url| is_sso_url(url))
    })
    .await?;

    let username = wait_for_element(page, USERNAME_FIELD, timeouts.element).await?;
    fill(&username, credentials.username()).await?;
    let password = wait_for_element(page, PASSWORD_FIELD, timeouts.element).await?;
    fill(&password, credentials.password()).await?;
    click(page, SSO_SUBMIT).await
}

async fn traditional_login(page: &Page, credentials: &Credentials, timeouts: &LoginTimeouts) -> Result<(), AuthError> {
    let xpath = innermost_text_xpath(CREDENTIAL_ENTRY_TEXT);
    let xpath = xpath.as_str();
    let entry = poll_until("looking for the CPF/OAB entry", timeouts.element, POLL_INTERVAL, move || async move {
        page.find_xpath(xpath).await.ok()
    })
    .await?;
    entry.click().await.map_err(cdp)?;

    let username = wait_for_element(page, USERNAME_FIELD, timeouts.element).await?;
    fill(&username, credentials.username()).await?;
    let password = wait_for_element(page, PASSWORD_FIELD, timeouts.element).await?;
    fill(&password, credentials.password()).await?;
    click(page, TRADITIONAL_SUBMIT).await
}

async fn wait_for_document(page: &Page, timeout: Duration) -> Result<(), AuthError> {
    poll_until("waiting for the login page to load", timeout, POLL_INTERVAL, move || async move {
        page.evaluate("document.readyState === 'complete'")
            .await
            .ok()
            .and_then(|r| r.into_value::<bool>().ok())
            .filter(|ready| *ready)
    })
    .await
    .map(|_| ())
}

async fn wait_for_element(
    page: &Page,
    selector: &'static str,
    timeout: Duration,
) -> Result<chromiumoxide::Element, AuthError> {
    poll_until("waiting for a login field", timeout, POLL_INTERVAL, move || async move {
        page.find_element(selector).await.ok()
    })
    .await
}

async fn is_visible(page: &Page, selector: &str) -> bool {
    let script = format!(
        "(() => {{ const el = document.querySelector({selector:?}); \
         return !!el && el.offsetParent !== null; }})()"
    );
    page.evaluate(script)
        .await
        .ok()
        .and_then(|r| r.into_value::<bool>().ok())
        .unwrap_or(false)
}

async fn current_url(page: &Page) -> Option<String> {
    page.url().await.ok().flatten()
}

async fn click(page: &Page, selector: &str) -> Result<(), AuthError> {
    page.find_element(selector)
        .await
        .map_err(cdp)?
        .click()
        .await
        .map_err(cdp)?;
    Ok(())
}

async fn fill(element: &chromiumoxide::Element, text: &str) -> Result<(), AuthError> {
    element.click().await.map_err(cdp)?;
    element.type_str(text).await.map_err(cdp)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_selects_flow() {
        assert_eq!(LoginFlow::from_probe(true), LoginFlow::PdpjSso);
        assert_eq!(LoginFlow::from_probe(false), LoginFlow::Traditional);
    }

    #[test]
    fn sso_url_matches_host_only() {
        assert!(is_sso_url(
            "https://sso.cloud.pje.jus.br/auth/realms/pje/protocol/openid-connect/auth?client_id=pje"
        ));
        assert!(!is_sso_url("https://pje.trt2.jus.br/primeirograu/login.seam?sso.cloud.pje.jus.br"));
        assert!(!is_sso_url("about:blank"));
    }

    #[test]
    fn entry_xpath_matches_whole_text_case_insensitively() {
        let xpath = innermost_text_xpath("Entrar com CPF ou OAB");
        let contains = "contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', \
                        'abcdefghijklmnopqrstuvwxyz'), 'entrar com cpf ou oab')";
        assert_eq!(xpath, format!("//body//*[{contains}][not(*[{contains}])]"));
        assert!(!xpath.contains("text()"));
    }

    #[test]
    fn default_timeouts() {
        let t = LoginTimeouts::default();
        assert_eq!(t.navigation, Duration::from_secs(60));
        assert_eq!(t.probe, Duration::from_secs(7));
        assert_eq!(t.landing, Duration::from_secs(30));
    }

    #[test]
    fn status_lines_name_the_flow() {
        assert!(LoginFlow::PdpjSso.status_line().contains("PDPJ"));
        assert!(LoginFlow::Traditional.status_line().contains("tradicional"));
    }
}
