use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// Bot texts, compiled into the binary
const RU_MAIN: &str = include_str!("../locales/ru/main.ftl");

/// Localization manager for the bot
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    /// Create a new localization manager
    pub fn new() -> Result<Self> {
        let locale: LanguageIdentifier = "ru".parse()?;
        let bundle = Self::create_bundle(&locale, RU_MAIN)?;
        Ok(Self { bundle })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: &LanguageIdentifier, source: &str) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Messages are HTML; Unicode isolation marks would leak into Telegram texts.
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Failed to parse {locale} messages: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Failed to load {locale} messages: {errors:?}"))?;

        Ok(bundle)
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, &str>>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (k, v) in args {
                fluent_args.set(*k, FluentValue::from(*v));
            }
            fluent_args
        });

        let mut errors = Vec::new();
        let value = self
            .bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, ?errors, "Localization formatting errors");
        }

        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message(key, Some(&args_map))
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: LazyLock<Result<LocalizationManager, String>> =
    LazyLock::new(|| LocalizationManager::new().map_err(|e| e.to_string()));

/// Initialize the global localization manager, surfacing resource errors early
pub fn init_localization() -> Result<()> {
    match &*LOCALIZATION_MANAGER {
        Ok(_) => Ok(()),
        Err(e) => Err(anyhow!("Localization unavailable: {e}")),
    }
}

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    match &*LOCALIZATION_MANAGER {
        Ok(manager) => manager.get_message(key, None),
        Err(_) => format!("Missing translation: {}", key),
    }
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    match &*LOCALIZATION_MANAGER {
        Ok(manager) => manager.get_message_with_args(key, args),
        Err(_) => format!("Missing translation: {}", key),
    }
}
