// Resolution scope carried through a single validation call

use serde_json::Value;
use std::rc::Rc;
use url::Url;

#[derive(Debug)]
struct Frame {
    base: Url,
    // Set for frames entered through `$ref`: the reference and the instance
    // being validated.
    visit: Option<(Url, *const Value)>,
    parent: Option<Rc<Frame>>,
}

/// Immutable chain of resolution scopes.
///
/// Entering an id or a `$ref` returns a new scope that shares its parents
/// with the old one, so sibling keywords never observe each other's scope
/// changes.
#[derive(Debug, Clone)]
pub struct ResolutionScope {
    head: Rc<Frame>,
}

impl ResolutionScope {
    pub fn new(base: Url) -> Self {
        Self {
            head: Rc::new(Frame {
                base,
                visit: None,
                parent: None,
            }),
        }
    }

    /// Base URI that relative references resolve against
    pub fn base(&self) -> &Url {
        &self.head.base
    }

    /// Scope for a schema declaring `id`. Unparseable ids leave the scope unchanged.
    pub fn enter_id(&self, id: &str) -> Self {
        match self.head.base.join(id) {
            Ok(base) => self.push(base, None),
            Err(error) => {
                tracing::trace!(id, %error, "ignoring unparseable schema id");
                self.clone()
            }
        }
    }

    /// Scope for following a `$ref` to `target` while validating `instance`.
    ///
    /// `base` is the base URI of the target's contents.
    pub fn enter_ref(&self, target: Url, base: Url, instance: &Value) -> Self {
        self.push(base, Some((target, instance as *const Value)))
    }

    /// Whether `target` is already being followed for this very instance.
    pub fn is_cycle(&self, target: &Url, instance: &Value) -> bool {
        let mut frame = Some(&self.head);
        while let Some(current) = frame {
            if let Some((followed, seen)) = &current.visit
                && std::ptr::eq(*seen, instance)
                && followed == target
            {
                return true;
            }
            frame = current.parent.as_ref();
        }
        false
    }

    fn push(&self, base: Url, visit: Option<(Url, *const Value)>) -> Self {
        Self {
            head: Rc::new(Frame {
                base,
                visit,
                parent: Some(self.head.clone()),
            }),
        }
    }
}
