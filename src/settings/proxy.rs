//! Proxy list maintenance and the resulting network decision.

use crate::database::{CustomProxy, ProxySettings, ProxyType};
use crate::error::{Result, UploaderError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Proxy entered by the user, before it gets an id
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProxy {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for NewProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewProxy")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How the network layer should connect
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum EffectiveProxy {
    System,
    Direct,
    Custom { url: String },
}

impl std::fmt::Debug for EffectiveProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "System"),
            Self::Direct => write!(f, "Direct"),
            Self::Custom { .. } => write!(f, "Custom {{ url: <redacted> }}"),
        }
    }
}

impl ProxySettings {
    /// Append a proxy and return its generated id
    pub fn add_custom_proxy(&mut self, proxy: NewProxy) -> Result<String> {
        let host = proxy.host.trim();
        if host.is_empty() {
            return Err(UploaderError::Validation("Proxy host is required".to_string()));
        }
        if proxy.port == 0 {
            return Err(UploaderError::Validation("Proxy port must be non-zero".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        self.custom_proxies.push(CustomProxy {
            id: id.clone(),
            host: host.to_string(),
            port: proxy.port,
            username: proxy.username.filter(|u| !u.is_empty()),
            password: proxy.password.filter(|p| !p.is_empty()),
        });
        Ok(id)
    }

    /// Remove a proxy, dropping the selection if it pointed at it
    pub fn remove_custom_proxy(&mut self, id: &str) -> bool {
        let before = self.custom_proxies.len();
        self.custom_proxies.retain(|proxy| proxy.id != id);

        if self.selected_custom_proxy_id.as_deref() == Some(id) {
            self.selected_custom_proxy_id = None;
        }
        before != self.custom_proxies.len()
    }

    pub fn select_custom_proxy(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) if !self.custom_proxies.iter().any(|proxy| proxy.id == id) => {
                Err(UploaderError::NotFound(format!("custom proxy {}", id)))
            }
            _ => {
                self.selected_custom_proxy_id = id.map(str::to_string);
                Ok(())
            }
        }
    }

    pub fn set_proxy_type(&mut self, proxy_type: ProxyType) {
        self.proxy_type = proxy_type;
    }

    pub fn selected_proxy(&self) -> Option<&CustomProxy> {
        let id = self.selected_custom_proxy_id.as_deref()?;
        self.custom_proxies.iter().find(|proxy| proxy.id == id)
    }

    /// Custom mode without a usable selection connects directly
    pub fn effective_proxy(&self) -> EffectiveProxy {
        match self.proxy_type {
            ProxyType::System => EffectiveProxy::System,
            ProxyType::None => EffectiveProxy::Direct,
            ProxyType::Custom => self
                .selected_proxy()
                .map(|proxy| EffectiveProxy::Custom { url: proxy.url() })
                .unwrap_or(EffectiveProxy::Direct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_proxy(host: &str, port: u16) -> NewProxy {
        NewProxy {
            host: host.to_string(),
            port,
            username: None,
            password: None,
        }
    }

    #[test]
    fn test_remove_selected_proxy_clears_selection() {
        let mut settings = ProxySettings::default();
        let p1 = settings.add_custom_proxy(new_proxy("10.0.0.1", 8080)).unwrap();
        let p2 = settings.add_custom_proxy(new_proxy("10.0.0.2", 3128)).unwrap();
        settings.select_custom_proxy(Some(&p1)).unwrap();

        assert!(settings.remove_custom_proxy(&p1));
        assert_eq!(settings.selected_custom_proxy_id, None);
        assert_eq!(settings.custom_proxies.len(), 1);
        assert_eq!(settings.custom_proxies[0].id, p2);
    }

    #[test]
    fn test_remove_other_proxy_keeps_selection() {
        let mut settings = ProxySettings::default();
        let p1 = settings.add_custom_proxy(new_proxy("10.0.0.1", 8080)).unwrap();
        let p2 = settings.add_custom_proxy(new_proxy("10.0.0.2", 3128)).unwrap();
        settings.select_custom_proxy(Some(&p1)).unwrap();

        assert!(settings.remove_custom_proxy(&p2));
        assert!(!settings.remove_custom_proxy("missing"));
        assert_eq!(settings.selected_custom_proxy_id.as_deref(), Some(p1.as_str()));
    }

    #[test]
    fn test_select_requires_existing_proxy() {
        let mut settings = ProxySettings::default();
        assert!(settings.select_custom_proxy(Some("nope")).is_err());
        assert!(settings.select_custom_proxy(None).is_ok());
        assert!(settings.add_custom_proxy(new_proxy("  ", 80)).is_err());
        assert!(settings.add_custom_proxy(new_proxy("host", 0)).is_err());
    }

    #[test]
    fn test_effective_proxy() {
        let mut settings = ProxySettings::default();
        assert_eq!(settings.effective_proxy(), EffectiveProxy::System);

        settings.set_proxy_type(ProxyType::None);
        assert_eq!(settings.effective_proxy(), EffectiveProxy::Direct);

        settings.set_proxy_type(ProxyType::Custom);
        assert_eq!(settings.effective_proxy(), EffectiveProxy::Direct);

        let id = settings
            .add_custom_proxy(NewProxy {
                host: "proxy.local".to_string(),
                port: 8080,
                username: Some("bob".to_string()),
                password: Some("pw".to_string()),
            })
            .unwrap();
        settings.select_custom_proxy(Some(&id)).unwrap();
        assert_eq!(
            settings.effective_proxy(),
            EffectiveProxy::Custom {
                url: "http://bob:pw@proxy.local:8080".to_string()
            }
        );
        assert!(!format!("{:?}", settings.effective_proxy()).contains("pw"));
    }
}
