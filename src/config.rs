use anyhow::{Context, Result};
use figment::{Figment, providers::{Format, Toml}};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::element::Element;
use crate::vartype::VarType;

pub const BACKEND_ENV: &str = "SAFEARRAY_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// oleaut32.dll (Windows only)
    Native,
    Emulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub backend: BackendKind,
    pub array: ArrayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayConfig {
    pub kind: VarType,
    #[serde(default)]
    pub lower_bound: i32,
    #[serde(default)]
    pub values: Vec<String>,
}

impl ProbeConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file not found at: {}",
                path.display()
            ));
        }
        Self::from_figment(Figment::from(Toml::file(path)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        // Override with environment variables if present
        Self::from_figment_with_backend(figment, std::env::var(BACKEND_ENV).ok().as_deref())
    }

    fn from_figment_with_backend(figment: Figment, backend_override: Option<&str>) -> Result<Self> {
        let mut config: ProbeConfig = figment
            .extract()
            .context("Failed to parse configuration")?;

        if let Some(backend) = backend_override {
            config.backend = Self::parse_backend(backend)
                .with_context(|| format!("Invalid {} override", BACKEND_ENV))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn parse_backend(name: &str) -> Result<BackendKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(BackendKind::Native),
            "emulated" => Ok(BackendKind::Emulated),
            other => Err(anyhow::anyhow!("Unknown backend '{}' (expected native or emulated)", other)),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.array.kind.is_array_element() {
            return Err(anyhow::anyhow!("{} cannot be used as an array element type", self.array.kind));
        }
        if self.backend == BackendKind::Native && !cfg!(windows) {
            return Err(anyhow::anyhow!("The native backend requires Windows"));
        }
        self.elements().map(|_| ())
    }

    /// The configured values parsed as elements of `array.kind`.
    pub fn elements(&self) -> Result<Vec<Element>> {
        self.array
            .values
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Element::parse(self.array.kind, text).with_context(|| format!("array.values[{}]", i))
            })
            .collect()
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            backend: if cfg!(windows) { BackendKind::Native } else { BackendKind::Emulated },
            array: ArrayConfig {
                kind: VarType::Bstr,
                lower_bound: 0,
                values: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            },
        }
    }
}
