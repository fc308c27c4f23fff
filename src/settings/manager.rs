use super::proxy::{EffectiveProxy, NewProxy};
use crate::database::{AppSettings, ProxySettings, ProxyType, Store};
use crate::error::{Result, UploaderError};
use crate::logging::{log_info, log_warn};
use std::sync::{Arc, RwLock};

/// In-memory settings backed by the store. Setters change memory only;
/// `save_*` writes the full record.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    store: Store,
    app: Arc<RwLock<AppSettings>>,
    proxy: Arc<RwLock<ProxySettings>>,
}

impl SettingsManager {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            app: Arc::new(RwLock::new(AppSettings::default())),
            proxy: Arc::new(RwLock::new(ProxySettings::default())),
        }
    }

    /// Load the settings row. A first run keeps the defaults. A default
    /// bucket that no longer exists is dropped.
    pub fn init_app_settings(&self) -> Result<AppSettings> {
        let Some(mut loaded) = self.store.load_app_settings()? else {
            log_info("settings", "No saved app settings, using defaults").unwrap_or_default();
            return self.app_settings();
        };

        if let Some(bucket_id) = loaded.default_bucket_id {
            if self.store.get_bucket(bucket_id)?.is_none() {
                log_warn(
                    "settings",
                    &format!("Default bucket {} no longer exists, clearing it", bucket_id),
                )
                .unwrap_or_default();
                loaded.default_bucket_id = None;
            }
        }

        *self.app.write()? = loaded.clone();
        log_info(
            "settings",
            &format!("✓ Loaded app settings (locale {})", loaded.locale),
        )
        .unwrap_or_default();
        Ok(loaded)
    }

    pub fn save_app_settings(&self) -> Result<()> {
        let settings = self.app_settings()?;
        self.store.save_app_settings(&settings)
    }

    pub fn app_settings(&self) -> Result<AppSettings> {
        Ok(self.app.read()?.clone())
    }

    pub fn locale(&self) -> Result<String> {
        Ok(self.app.read()?.locale.clone())
    }

    pub fn set_locale(&self, locale: &str) -> Result<()> {
        let locale = locale.trim();
        if locale.is_empty() {
            return Err(UploaderError::Validation("Locale must not be empty".to_string()));
        }
        self.app.write()?.locale = locale.to_string();
        Ok(())
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) -> Result<()> {
        self.app.write()?.sidebar_collapsed = collapsed;
        Ok(())
    }

    /// Also moves the proxy mode: on selects `system`, off leaves `system`
    /// for a direct connection
    pub fn set_use_system_proxy(&self, enabled: bool) -> Result<()> {
        self.app.write()?.use_system_proxy = enabled;

        let mut proxy = self.proxy.write()?;
        if enabled {
            proxy.set_proxy_type(ProxyType::System);
        } else if proxy.proxy_type == ProxyType::System {
            proxy.set_proxy_type(ProxyType::None);
        }
        Ok(())
    }

    pub fn set_default_bucket(&self, bucket_id: Option<i64>) -> Result<()> {
        if let Some(id) = bucket_id {
            if self.store.get_bucket(id)?.is_none() {
                return Err(UploaderError::NotFound(format!("bucket {}", id)));
            }
        }
        self.app.write()?.default_bucket_id = bucket_id;
        Ok(())
    }

    pub fn default_bucket_id(&self) -> Result<Option<i64>> {
        Ok(self.app.read()?.default_bucket_id)
    }

    /// Drop in-memory references to a deleted bucket
    pub fn forget_bucket(&self, bucket_id: i64) -> Result<()> {
        let mut app = self.app.write()?;
        if app.default_bucket_id == Some(bucket_id) {
            app.default_bucket_id = None;
        }
        Ok(())
    }

    /// Load the proxy row. Without one (first run or a pre-proxy profile)
    /// the mode is seeded from `use_system_proxy`, so call this after
    /// `init_app_settings`.
    pub fn init_proxy_settings(&self) -> Result<ProxySettings> {
        let Some(mut loaded) = self.store.load_proxy_settings()? else {
            let use_system_proxy = self.app.read()?.use_system_proxy;
            let mut proxy = self.proxy.write()?;
            if !use_system_proxy && proxy.proxy_type == ProxyType::System {
                proxy.set_proxy_type(ProxyType::None);
            }
            return Ok(proxy.clone());
        };

        if loaded.selected_custom_proxy_id.is_some() && loaded.selected_proxy().is_none() {
            loaded.selected_custom_proxy_id = None;
        }

        *self.proxy.write()? = loaded.clone();
        Ok(loaded)
    }

    pub fn save_proxy_settings(&self) -> Result<()> {
        let settings = self.proxy_settings()?;
        self.store.save_proxy_settings(&settings)
    }

    pub fn proxy_settings(&self) -> Result<ProxySettings> {
        Ok(self.proxy.read()?.clone())
    }

    pub fn add_custom_proxy(&self, proxy: NewProxy) -> Result<String> {
        self.proxy.write()?.add_custom_proxy(proxy)
    }

    pub fn remove_custom_proxy(&self, id: &str) -> Result<bool> {
        Ok(self.proxy.write()?.remove_custom_proxy(id))
    }

    pub fn select_custom_proxy(&self, id: Option<&str>) -> Result<()> {
        self.proxy.write()?.select_custom_proxy(id)
    }

    pub fn set_proxy_type(&self, proxy_type: ProxyType) -> Result<()> {
        self.proxy.write()?.set_proxy_type(proxy_type);
        self.app.write()?.use_system_proxy = proxy_type == ProxyType::System;
        Ok(())
    }

    pub fn effective_proxy(&self) -> Result<EffectiveProxy> {
        Ok(self.proxy.read()?.effective_proxy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::BucketConfig;

    fn bucket(name: &str) -> BucketConfig {
        BucketConfig {
            bucket_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_run_keeps_defaults() {
        let manager = SettingsManager::new(Store::open_in_memory().unwrap());
        let settings = manager.init_app_settings().unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(manager.locale().unwrap(), "en");
    }

    #[test]
    fn test_setters_need_explicit_save() {
        let store = Store::open_in_memory().unwrap();
        let manager = SettingsManager::new(store.clone());
        manager.set_locale("zh").unwrap();
        assert!(store.load_app_settings().unwrap().is_none());

        manager.save_app_settings().unwrap();
        assert_eq!(store.load_app_settings().unwrap().unwrap().locale, "zh");
        assert!(manager.set_locale("  ").is_err());
    }

    #[test]
    fn test_default_bucket_must_exist() {
        let store = Store::open_in_memory().unwrap();
        let id = store.put_bucket(&bucket("photos")).unwrap();
        let manager = SettingsManager::new(store);

        assert!(manager.set_default_bucket(Some(id + 100)).is_err());
        manager.set_default_bucket(Some(id)).unwrap();
        assert_eq!(manager.default_bucket_id().unwrap(), Some(id));

        manager.forget_bucket(id).unwrap();
        assert_eq!(manager.default_bucket_id().unwrap(), None);
    }

    #[test]
    fn test_init_drops_dangling_default_bucket() {
        let store = Store::open_in_memory().unwrap();
        store
            .save_app_settings(&AppSettings {
                default_bucket_id: Some(42),
                ..Default::default()
            })
            .unwrap();

        let manager = SettingsManager::new(store);
        assert_eq!(manager.init_app_settings().unwrap().default_bucket_id, None);
    }

    #[test]
    fn test_system_proxy_flag_follows_proxy_type() {
        let manager = SettingsManager::new(Store::open_in_memory().unwrap());

        manager.set_proxy_type(ProxyType::Custom).unwrap();
        assert!(!manager.app_settings().unwrap().use_system_proxy);

        manager.set_use_system_proxy(true).unwrap();
        assert_eq!(manager.proxy_settings().unwrap().proxy_type, ProxyType::System);

        manager.set_use_system_proxy(false).unwrap();
        assert_eq!(manager.effective_proxy().unwrap(), EffectiveProxy::Direct);
    }

    #[test]
    fn test_missing_proxy_row_follows_system_proxy_flag() {
        let store = Store::open_in_memory().unwrap();
        store
            .save_app_settings(&AppSettings {
                use_system_proxy: false,
                ..Default::default()
            })
            .unwrap();

        let manager = SettingsManager::new(store.clone());
        manager.init_app_settings().unwrap();
        let proxy = manager.init_proxy_settings().unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::None);
        assert_eq!(manager.effective_proxy().unwrap(), EffectiveProxy::Direct);

        let fresh = SettingsManager::new(Store::open_in_memory().unwrap());
        fresh.init_app_settings().unwrap();
        assert_eq!(fresh.init_proxy_settings().unwrap().proxy_type, ProxyType::System);
    }

    #[test]
    fn test_proxy_settings_persist() {
        let store = Store::open_in_memory().unwrap();
        let manager = SettingsManager::new(store.clone());
        let id = manager
            .add_custom_proxy(NewProxy {
                host: "10.1.1.1".to_string(),
                port: 1080,
                username: None,
                password: None,
            })
            .unwrap();
        manager.select_custom_proxy(Some(&id)).unwrap();
        manager.set_proxy_type(ProxyType::Custom).unwrap();
        manager.save_proxy_settings().unwrap();

        let reloaded = SettingsManager::new(store);
        let proxy = reloaded.init_proxy_settings().unwrap();
        assert_eq!(proxy.selected_custom_proxy_id.as_deref(), Some(id.as_str()));
        assert_eq!(
            reloaded.effective_proxy().unwrap(),
            EffectiveProxy::Custom {
                url: "http://10.1.1.1:1080".to_string()
            }
        );
    }
}
