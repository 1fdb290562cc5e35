use std::collections::BTreeMap;

use http::StatusCode;

use crate::DavResult;

type Handler<'a> = Box<dyn FnOnce(Option<&str>) -> DavResult<bool> + 'a>;

/// A batch of property mutations (a `PROPPATCH`).
///
/// Nodes register handlers for the properties they can change; nothing runs
/// until [`PropPatch::commit`]. If any requested property has no handler the
/// whole batch is rejected: unhandled properties get `403` and the rest
/// `424 Failed Dependency`.
pub struct PropPatch<'a> {
    mutations: BTreeMap<String, Option<String>>,
    handlers: Vec<(String, Handler<'a>)>,
}

impl<'a> PropPatch<'a> {
    /// `Some(value)` sets a property, `None` removes it.
    pub fn new(mutations: BTreeMap<String, Option<String>>) -> Self {
        Self {
            mutations,
            handlers: Vec::new(),
        }
    }

    /// Registers `handler` for `name` if the batch touches it. The handler
    /// returns `false` to refuse the change.
    pub fn handle<F>(&mut self, name: &str, handler: F)
    where
        F: FnOnce(Option<&str>) -> DavResult<bool> + 'a,
    {
        let requested = self.mutations.contains_key(name);
        let registered = self.handlers.iter().any(|(n, _)| n == name);
        if requested && !registered {
            self.handlers.push((name.to_string(), Box::new(handler)));
        }
    }

    /// Runs the registered handlers and returns a status per property.
    ///
    /// A handler error aborts the batch and is returned as is.
    pub fn commit(self) -> DavResult<BTreeMap<String, StatusCode>> {
        let mut statuses = BTreeMap::new();

        let unhandled: Vec<&String> = self
            .mutations
            .keys()
            .filter(|name| !self.handlers.iter().any(|(n, _)| n == *name))
            .collect();
        if !unhandled.is_empty() {
            for name in self.mutations.keys() {
                let status = if unhandled.contains(&name) {
                    StatusCode::FORBIDDEN
                } else {
                    StatusCode::FAILED_DEPENDENCY
                };
                statuses.insert(name.clone(), status);
            }
            return Ok(statuses);
        }

        let mut failed = false;
        for (name, handler) in self.handlers {
            if failed {
                statuses.insert(name, StatusCode::FAILED_DEPENDENCY);
                continue;
            }
            let value = self.mutations.get(&name).and_then(|v| v.as_deref());
            if handler(value)? {
                statuses.insert(name, StatusCode::OK);
            } else {
                failed = true;
                statuses.insert(name, StatusCode::FORBIDDEN);
            }
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DavError;

    fn batch(entries: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn handled_property_succeeds() {
        let mut seen = None;
        let mut patch = PropPatch::new(batch(&[("{x}a", Some("1"))]));
        patch.handle("{x}a", |v| {
            seen = v.map(str::to_string);
            Ok(true)
        });
        let statuses = patch.commit().unwrap();
        assert_eq!(statuses["{x}a"], StatusCode::OK);
        assert_eq!(seen.as_deref(), Some("1"));
    }

    #[test]
    fn unhandled_property_rejects_batch_without_running() {
        let mut ran = false;
        let mut patch = PropPatch::new(batch(&[("{x}a", Some("1")), ("{x}b", Some("2"))]));
        patch.handle("{x}a", |_| {
            ran = true;
            Ok(true)
        });
        let statuses = patch.commit().unwrap();
        assert_eq!(statuses["{x}a"], StatusCode::FAILED_DEPENDENCY);
        assert_eq!(statuses["{x}b"], StatusCode::FORBIDDEN);
        assert!(!ran);
    }

    #[test]
    fn handler_for_untouched_property_is_ignored() {
        let mut patch = PropPatch::new(batch(&[]));
        patch.handle("{x}a", |_| panic!("must not run"));
        assert!(patch.commit().unwrap().is_empty());
    }

    #[test]
    fn refusal_fails_remaining() {
        let mut patch = PropPatch::new(batch(&[("{x}a", Some("1")), ("{x}b", None)]));
        patch.handle("{x}a", |_| Ok(false));
        patch.handle("{x}b", |_| Ok(true));
        let statuses = patch.commit().unwrap();
        assert_eq!(statuses["{x}a"], StatusCode::FORBIDDEN);
        assert_eq!(statuses["{x}b"], StatusCode::FAILED_DEPENDENCY);
    }

    #[test]
    fn handler_error_propagates() {
        let mut patch = PropPatch::new(batch(&[("{x}a", Some("1"))]));
        patch.handle("{x}a", |_| Err(DavError::Forbidden("no".into())));
        assert!(matches!(patch.commit(), Err(DavError::Forbidden(_))));
    }
}
