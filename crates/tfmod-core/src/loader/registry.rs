//! Terraform registry loader.
//!
//! Asks the registry's download endpoint for the module's real location
//! (`X-Terraform-Get`) using libcurl, then hands git locations to [`GitLoader`].
//! Version constraints are not solved; the version string is forwarded as is.

use anyhow::Context;
use std::path::Path;
use std::str;
use std::time::Duration;

use super::git::{split_source, GitLoader, GitSource};
use super::{LoadError, ModuleContent, ModuleLoader};
use crate::reference::LATEST;
use crate::retry::{run_with_retry, RetryPolicy};

/// `[host/]namespace/name/provider[//subdir]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAddress {
    pub host: Option<String>,
    pub namespace: String,
    pub name: String,
    pub provider: String,
    pub subdir: Option<String>,
}

fn valid_part(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl RegistryAddress {
    pub fn parse(link: &str) -> Option<Self> {
        if link.contains("::") || link.contains("://") || link.contains('?') {
            return None;
        }
        let (module, subdir, _) = split_source(link);
        let parts: Vec<&str> = module.split('/').collect();
        let (host, rest) = match parts.as_slice() {
            [ns, name, provider] => (None, [*ns, *name, *provider]),
            [host, ns, name, provider] if host.contains('.') || host.contains(':') => {
                (Some(host.to_string()), [*ns, *name, *provider])
            }
            _ => return None,
        };
        if !rest.iter().all(|p| valid_part(p)) {
            return None;
        }
        Some(Self {
            host,
            namespace: rest[0].to_string(),
            name: rest[1].to_string(),
            provider: rest[2].to_string(),
            subdir: subdir.map(str::to_string),
        })
    }

    /// Download endpoint. `latest` uses the version-less endpoint, which
    /// redirects to the newest release.
    pub fn download_url(&self, default_host: &str, version: &str) -> String {
        let host = self.host.as_deref().unwrap_or(default_host);
        // A configured host may carry its own scheme (e.g. a plain-http mirror).
        let origin = if host.contains("://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host)
        };
        let base = format!(
            "{}/v1/modules/{}/{}/{}",
            origin, self.namespace, self.name, self.provider
        );
        if version.is_empty() || version == LATEST {
            format!("{}/download", base)
        } else {
            format!("{}/{}/download", base, version)
        }
    }
}

/// True for links shaped like a registry address.
pub fn is_registry_address(link: &str) -> bool {
    RegistryAddress::parse(link).is_some()
}

/// Resolves registry addresses and clones the location the registry names.
#[derive(Debug, Clone)]
pub struct RegistryLoader {
    default_host: String,
    git: GitLoader,
    retry: RetryPolicy,
}

impl RegistryLoader {
    pub fn new(default_host: impl Into<String>, git: GitLoader, retry: RetryPolicy) -> Self {
        Self {
            default_host: default_host.into(),
            git,
            retry,
        }
    }
}

impl ModuleLoader for RegistryLoader {
    fn load(&self, _target_dir: &Path, link: &str, version: &str) -> Result<ModuleContent, LoadError> {
        let address =
            RegistryAddress::parse(link).ok_or_else(|| LoadError::Unsupported(link.to_string()))?;
        if !self.git.downloads_enabled() {
            return Ok(ModuleContent::download_disabled());
        }
        let url = address.download_url(&self.default_host, version);
        tracing::debug!(%url, "asking registry for download location");

        let location = run_with_retry(&self.retry, || fetch_download_location(&url))?;
        let mut source = GitSource::parse(&location).ok_or_else(|| {
            LoadError::Unsupported(format!("{} (registry location {})", link, location))
        })?;
        if source.subdir.is_none() {
            source.subdir = address.subdir.clone();
        }
        // The registry location already pins the release.
        self.git.load_source(&source, LATEST)
    }
}

/// GETs the registry download endpoint and returns `X-Terraform-Get`.
/// Follows redirects; the header of the final response wins.
fn fetch_download_location(url: &str) -> Result<String, LoadError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(60))?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(LoadError::Http(code));
    }

    parse_terraform_get(&headers)
        .with_context(|| format!("registry response from {}", url))
        .map_err(|e| LoadError::Registry(format!("{:#}", e)))
}

/// Parse collected header lines for the last `X-Terraform-Get` value.
fn parse_terraform_get(lines: &[String]) -> anyhow::Result<String> {
    lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("x-terraform-get"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty())
        .last()
        .ok_or_else(|| anyhow::anyhow!("no X-Terraform-Get header"))
}
