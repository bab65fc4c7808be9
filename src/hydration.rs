//! Hydration directive classification.
//!
//! Components opt into client-side activation with a `client:<method>`
//! attribute. A legacy `<Name:method />` colon form is normalized to the
//! directive form before resolution, with a deprecation warning.

use crate::attributes::ResolvedAttributes;
use crate::error::Position;
use crate::options::{CodegenOptions, LogEvent};

pub const HYDRATION_METHODS: [&str; 5] = ["load", "idle", "visible", "media", "only"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hydration {
    pub method: String,
    /// Directive payload as a code fragment; `None` when the raw value was
    /// the bare literal `true`.
    pub value: Option<String>,
}

/// Find the first `client:*` key in the resolved attribute map, remove it,
/// and classify it.
pub fn extract_hydration(attrs: &mut ResolvedAttributes) -> Option<Hydration> {
    let key = attrs.keys().find(|k| {
        k.strip_prefix("client:")
            .map(|method| HYDRATION_METHODS.contains(&method))
            .unwrap_or(false)
    })?;
    let key = key.to_string();
    let raw = attrs.remove(&key).unwrap_or_default();
    let method = key["client:".len()..].to_string();
    let value = match raw.as_str() {
        "true" | "\"true\"" => None,
        _ => Some(raw),
    };
    Some(Hydration { method, value })
}

/// Detect the legacy `Name:method` tag form. Returns the bare component
/// name and the equivalent hydration, warning through the sink.
pub fn split_legacy_hydration(
    tag: &str,
    opts: &CodegenOptions,
    start: Position,
) -> Option<(String, Hydration)> {
    let (name, method) = tag.split_once(':')?;
    if name.is_empty() || !HYDRATION_METHODS.contains(&method) {
        return None;
    }
    opts.sink().warn(
        LogEvent::new(format!(
            "<{tag} /> hydration is deprecated. Use <{name} client:{method} /> instead."
        ))
        .at(opts.filename.clone(), start),
    );
    Some((
        name.to_string(),
        Hydration {
            method: method.to_string(),
            value: None,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::ResolvedAttributes;

    #[test]
    fn extracts_first_matching_directive() {
        let mut attrs = ResolvedAttributes::default();
        attrs.push("id".to_string(), "\"x\"".to_string());
        attrs.push("client:load".to_string(), "true".to_string());
        attrs.push("client:idle".to_string(), "true".to_string());

        let hydration = extract_hydration(&mut attrs).unwrap();
        assert_eq!(hydration.method, "load");
        assert_eq!(hydration.value, None);
        // The winning key is removed, later ones are left alone.
        assert!(attrs.get("client:load").is_none());
        assert!(attrs.get("client:idle").is_some());
    }

    #[test]
    fn keeps_non_boolean_values() {
        let mut attrs = ResolvedAttributes::default();
        attrs.push(
            "client:media".to_string(),
            "\"(max-width: 600px)\"".to_string(),
        );
        let hydration = extract_hydration(&mut attrs).unwrap();
        assert_eq!(hydration.method, "media");
        assert_eq!(hydration.value.as_deref(), Some("\"(max-width: 600px)\""));
    }

    #[test]
    fn ignores_unknown_directives() {
        let mut attrs = ResolvedAttributes::default();
        attrs.push("client:eager".to_string(), "true".to_string());
        assert!(extract_hydration(&mut attrs).is_none());
    }
}
