//! Service descriptor: the scenario's name, version, and category.

use scorecard_kernel::fsutil::{self, display_path};
use scorecard_kernel::LoadWarning;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::{SERVICE_DESCRIPTOR_PATH, scalar_to_string};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub category: String,
    /// True when no usable category was found and the default applies.
    pub category_defaulted: bool,
}

impl ServiceInfo {
    pub fn defaulted(default_category: &str) -> Self {
        Self {
            name: None,
            version: None,
            category: default_category.to_string(),
            category_defaulted: true,
        }
    }
}

/// Both descriptor generations. The nested form must be tried first: the
/// flat form accepts any object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptorFile {
    Nested {
        service: NestedService,
        #[serde(default)]
        category: Option<Value>,
    },
    Flat(FlatService),
}

#[derive(Debug, Deserialize)]
struct NestedService {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    category: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FlatService {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    category: Option<Value>,
}

struct DescriptorFields {
    name: Option<String>,
    version: Option<String>,
    category: Option<String>,
}

impl DescriptorFile {
    fn normalize(self) -> DescriptorFields {
        let text = |value: Option<Value>| value.as_ref().and_then(scalar_to_string);
        match self {
            Self::Nested { service, category } => DescriptorFields {
                name: text(service.name),
                version: text(service.version),
                category: text(service.category).or_else(|| text(category)),
            },
            Self::Flat(flat) => DescriptorFields {
                name: text(flat.name),
                version: text(flat.version),
                category: text(flat.category),
            },
        }
    }
}

/// Read the descriptor; any failure yields `default_category` plus a warning.
pub fn load_service(
    scenario_root: &Path,
    default_category: &str,
    warnings: &mut Vec<LoadWarning>,
) -> ServiceInfo {
    let path = scenario_root.join(SERVICE_DESCRIPTOR_PATH);
    let file: DescriptorFile = match fsutil::read_json(&path) {
        Ok(file) => file,
        Err(err) => {
            let message = if err.is_not_found() {
                format!("service descriptor missing; using category {default_category:?}")
            } else {
                format!("{err}; using category {default_category:?}")
            };
            warnings.push(LoadWarning::emit(display_path(&path), message));
            return ServiceInfo::defaulted(default_category);
        }
    };

    let fields = file.normalize();
    let category = fields
        .category
        .map(|raw| raw.trim().to_ascii_lowercase())
        .filter(|raw| !raw.is_empty());
    match category {
        Some(category) => ServiceInfo {
            name: fields.name,
            version: fields.version,
            category,
            category_defaulted: false,
        },
        None => {
            warnings.push(LoadWarning::emit(
                display_path(&path),
                format!("service descriptor has no category; using {default_category:?}"),
            ));
            ServiceInfo {
                name: fields.name,
                version: fields.version,
                category: default_category.to_string(),
                category_defaulted: true,
            }
        }
    }
}
