//! Cargo manifest embedded in the driver's `---` front matter.

use crate::error::RenderError;
use crate::template::{DriverProgramParameters, RuntimeDependency};
use toml_edit::{Array, DocumentMut, InlineTable, Item, Table, value};

pub const RUNTIME_CRATE: &str = "codemigrate-runtime";

/// Backend features `codemigrate-runtime` ships a database client for.
pub const RUNTIME_FEATURES: &[&str] = &["postgres", "sqlite"];

/// Render the manifest for a driver program.
///
/// The runtime dependency is compiled with default features off and exactly
/// the backend feature named by `params.import`, so only that database client
/// is linked into the driver.
pub fn render_manifest(params: &DriverProgramParameters) -> Result<String, RenderError> {
    check_feature_name(&params.import)?;

    let mut doc = DocumentMut::new();

    let mut package = Table::new();
    package["edition"] = value("2024");
    package["publish"] = value(false);
    doc["package"] = Item::Table(package);

    let mut runtime = InlineTable::new();
    match &params.runtime {
        RuntimeDependency::Path(path) => {
            runtime.insert("path", path.as_str().into());
        }
        RuntimeDependency::Version(req) => {
            if req.trim().is_empty() {
                return Err(RenderError::invalid("runtime", "version requirement is empty"));
            }
            runtime.insert("version", req.as_str().into());
        }
    }
    runtime.insert("default-features", false.into());
    let mut features = Array::new();
    features.push(params.import.as_str());
    runtime.insert("features", features.into());

    let mut deps = Table::new();
    deps[RUNTIME_CRATE] = value(runtime);
    for (name, req) in &params.extra_dependencies {
        check_crate_name(name)?;
        if name == RUNTIME_CRATE {
            return Err(RenderError::invalid(
                "extra_dependencies",
                format!("`{}` is managed by the generator", RUNTIME_CRATE),
            ));
        }
        deps[name.as_str()] = value(req.as_str());
    }
    doc["dependencies"] = Item::Table(deps);

    Ok(doc.to_string())
}

fn check_feature_name(import: &str) -> Result<(), RenderError> {
    let valid = !import.is_empty()
        && import
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if !valid {
        return Err(RenderError::invalid(
            "import",
            format!("'{}' is not a runtime feature name", import),
        ));
    }
    if !RUNTIME_FEATURES.contains(&import) {
        return Err(RenderError::invalid(
            "import",
            format!(
                "codemigrate-runtime has no `{}` backend (available: {})",
                import,
                RUNTIME_FEATURES.join(", ")
            ),
        ));
    }
    Ok(())
}

fn check_crate_name(name: &str) -> Result<(), RenderError> {
    let valid = name.bytes().next().is_some_and(|b| b.is_ascii_alphabetic())
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(RenderError::invalid(
            "extra_dependencies",
            format!("'{}' is not a valid crate name", name),
        ))
    }
}
