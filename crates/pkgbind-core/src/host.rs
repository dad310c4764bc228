//! Host runtime contract and callback invocation.
//!
//! The bindings never interpret the host beyond [`Host::call`]. Receivers use
//! [`Callback`] to build an argument list for a registered callback and to
//! read the reply back as the type the event class expects.

use crate::error::HostError;
use pkgbind_schema::{EventId, Value};
use std::rc::Rc;

/// The host scripting runtime.
///
/// Calls are synchronous: `call` returns once the host produced a value.
/// The host may call back into the bindings before returning.
pub trait Host {
    /// Invoke the host callable `function` with positional `args`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the callable does not exist or fails.
    fn call(&self, function: &str, args: &[Value]) -> Result<Value, HostError>;
}

impl<T: Host + ?Sized> Host for Rc<T> {
    fn call(&self, function: &str, args: &[Value]) -> Result<Value, HostError> {
        (**self).call(function, args)
    }
}

/// A host that has nothing to call.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {
    fn call(&self, function: &str, _args: &[Value]) -> Result<Value, HostError> {
        Err(HostError::UnknownFunction(function.to_string()))
    }
}

/// One pending invocation of a registered host callback.
///
/// Evaluating consumes the call. Every `evaluate_*` returns `None` when the
/// host failed or replied with the wrong type, so the caller can fall back
/// to the engine default.
pub struct Callback {
    host: Rc<dyn Host>,
    event: EventId,
    name: String,
    args: Vec<Value>,
}

impl Callback {
    pub(crate) fn new(host: Rc<dyn Host>, event: EventId, name: String) -> Self {
        Self {
            host,
            event,
            name,
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn event(&self) -> EventId {
        self.event
    }

    /// Call the host and return its raw reply.
    pub fn evaluate(self) -> Option<Value> {
        tracing::trace!(event = %self.event, callback = %self.name, "invoking host callback");
        match self.host.call(&self.name, &self.args) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(event = %self.event, "Host callback failed: {e}");
                None
            }
        }
    }

    pub fn evaluate_bool(self) -> Option<bool> {
        let event = self.event;
        let reply = self.evaluate()?;
        let b = reply.as_bool();
        if b.is_none() {
            tracing::warn!(%event, "Expected a boolean from the host, got {reply}");
        }
        b
    }

    pub fn evaluate_str(self) -> Option<String> {
        let event = self.event;
        match self.evaluate()? {
            Value::String(s) => Some(s),
            other => {
                tracing::warn!(%event, "Expected a string from the host, got {other}");
                None
            }
        }
    }

    pub fn evaluate_symbol(self) -> Option<String> {
        let event = self.event;
        match self.evaluate()? {
            Value::Symbol(s) => Some(s),
            other => {
                tracing::warn!(%event, "Expected a symbol from the host, got {other}");
                None
            }
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback")
            .field("event", &self.event)
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Host for Echo {
        fn call(&self, function: &str, args: &[Value]) -> Result<Value, HostError> {
            match function {
                "first" => Ok(args.first().cloned().unwrap_or_default()),
                _ => Err(HostError::UnknownFunction(function.to_string())),
            }
        }
    }

    fn callback(name: &str) -> Callback {
        Callback::new(Rc::new(Echo), EventId::MediaChange, name.to_string())
    }

    #[test]
    fn test_typed_replies() {
        assert_eq!(callback("first").arg(true).evaluate_bool(), Some(true));
        assert_eq!(callback("first").arg("E2").evaluate_str(), Some("E2".into()));
        assert_eq!(
            callback("first").arg(Value::symbol("RETRY")).evaluate_symbol(),
            Some("RETRY".into())
        );
    }

    #[test]
    fn test_type_mismatch_is_none() {
        assert_eq!(callback("first").arg("yes").evaluate_bool(), None);
        assert_eq!(callback("first").arg("ABORT").evaluate_symbol(), None);
    }

    #[test]
    fn test_host_failure_is_none() {
        assert_eq!(callback("missing").evaluate(), None);
        assert!(NullHost.call("anything", &[]).is_err());
    }
}
