use std::time::Duration;

use crate::FareBotError;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "taxi_fare_bot";
pub const DEFAULT_PREFIX: &str = "!fare";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocoderKind {
    Nominatim,
    Google,
}

/// How trip parameters travel to the fare endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FareRequestMode {
    /// JSON body posted to the service URL itself.
    Post,
    /// Query string sent to `<service URL>/predict`.
    Get,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub service_url: Option<String>,
    pub fare_request_mode: FareRequestMode,
    pub geocoder: GeocoderKind,
    pub google_maps_token: Option<String>,
    pub nominatim_url: String,
    pub nominatim_user_agent: String,
    pub request_timeout: Duration,
    pub command_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            service_url: None,
            fare_request_mode: FareRequestMode::Post,
            geocoder: GeocoderKind::Nominatim,
            google_maps_token: None,
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            nominatim_user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            command_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment and `.env`.
    pub fn from_env() -> Result<Self, FareBotError> {
        Settings::from_lookup(|name| dotenv::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FareBotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Settings::default();

        let fare_request_mode = match var("FARE_REQUEST_MODE") {
            None => defaults.fare_request_mode,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "post" => FareRequestMode::Post,
                "get" => FareRequestMode::Get,
                _ => {
                    return Err(FareBotError::InvalidSetting {
                        name: "FARE_REQUEST_MODE",
                        value,
                    })
                }
            },
        };

        let geocoder = match var("GEOCODER") {
            None => defaults.geocoder,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "nominatim" => GeocoderKind::Nominatim,
                "google" => GeocoderKind::Google,
                _ => {
                    return Err(FareBotError::InvalidSetting {
                        name: "GEOCODER",
                        value,
                    })
                }
            },
        };
        let google_maps_token = var("GOOGLE_MAPS_TOKEN");
        if geocoder == GeocoderKind::Google && google_maps_token.is_none() {
            return Err(FareBotError::MissingSetting("GOOGLE_MAPS_TOKEN"));
        }

        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            None => defaults.request_timeout,
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(FareBotError::InvalidSetting {
                        name: "REQUEST_TIMEOUT_SECS",
                        value,
                    })
                }
            },
        };

        Ok(Settings {
            service_url: var("SERVICE_URL"),
            fare_request_mode,
            geocoder,
            google_maps_token,
            nominatim_url: var("NOMINATIM_URL").unwrap_or(defaults.nominatim_url),
            nominatim_user_agent: var("NOMINATIM_USER_AGENT")
                .unwrap_or(defaults.nominatim_user_agent),
            request_timeout,
            command_prefix: var("COMMAND_PREFIX").unwrap_or(defaults.command_prefix),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, FareBotError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.service_url, None);
        assert_eq!(settings.fare_request_mode, FareRequestMode::Post);
        assert_eq!(settings.geocoder, GeocoderKind::Nominatim);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.command_prefix, "!fare");
    }

    #[test]
    fn blank_service_url_counts_as_missing() {
        let settings = settings(&[("SERVICE_URL", "   ")]).unwrap();
        assert_eq!(settings.service_url, None);
    }

    #[test]
    fn reads_overrides() {
        let settings = settings(&[
            ("SERVICE_URL", "https://fare.example.com"),
            ("FARE_REQUEST_MODE", "GET"),
            ("GEOCODER", "google"),
            ("GOOGLE_MAPS_TOKEN", "abc"),
            ("REQUEST_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(settings.service_url.as_deref(), Some("https://fare.example.com"));
        assert_eq!(settings.fare_request_mode, FareRequestMode::Get);
        assert_eq!(settings.geocoder, GeocoderKind::Google);
        assert_eq!(settings.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            settings(&[("FARE_REQUEST_MODE", "put")]),
            Err(FareBotError::InvalidSetting { name: "FARE_REQUEST_MODE", .. })
        ));
        assert!(matches!(
            settings(&[("REQUEST_TIMEOUT_SECS", "0")]),
            Err(FareBotError::InvalidSetting { .. })
        ));
        assert!(matches!(
            settings(&[("GEOCODER", "google")]),
            Err(FareBotError::MissingSetting("GOOGLE_MAPS_TOKEN"))
        ));
    }
}
