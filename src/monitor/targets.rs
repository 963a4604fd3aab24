use std::sync::Arc;
use tracing::warn;

/// One monitored remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub url: String,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Fixed, ordered set of targets for the process lifetime.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    targets: Arc<[Target]>,
}

impl TargetRegistry {
    /// Builds the registry in the given order. A repeated name keeps its first URL.
    pub fn new(targets: impl IntoIterator<Item = Target>) -> Self {
        let mut unique: Vec<Target> = Vec::new();
        for target in targets {
            if unique.iter().any(|t| t.name == target.name) {
                warn!(service = %target.name, url = %target.url, "Duplicate target ignored.");
                continue;
            }
            unique.push(target);
        }
        Self {
            targets: unique.into(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keeps_insertion_order() {
        let registry = TargetRegistry::new([
            Target::new("reservas", "http://reservas:5003/health"),
            Target::new("busqueda", "http://busqueda:5000/health"),
        ]);
        assert_eq!(registry.names(), vec!["reservas", "busqueda"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_drops_duplicate_names() {
        let registry = TargetRegistry::new([
            Target::new("ordenes", "http://a/health"),
            Target::new("ordenes", "http://b/health"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().next().unwrap().url, "http://a/health");
    }
}
