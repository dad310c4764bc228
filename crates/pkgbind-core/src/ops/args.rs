//! Positional argument access for host operations.

use crate::error::BridgeError;
use pkgbind_schema::{ResKind, Value};

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Void => "void",
        Value::Bool(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::String(_) => "string",
        Value::Symbol(_) => "symbol",
        Value::List(_) => "list",
        Value::Map(_) => "map",
    }
}

/// Arguments of one operation call.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    op: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(op: &'a str, values: &'a [Value]) -> Self {
        Self { op, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get(&self, index: usize) -> Result<&'a Value, BridgeError> {
        self.values
            .get(index)
            .ok_or_else(|| BridgeError::MissingArgument {
                op: self.op.to_string(),
                index,
            })
    }

    fn bad(&self, index: usize, expected: &'static str, got: &Value) -> BridgeError {
        BridgeError::BadArgument {
            op: self.op.to_string(),
            index,
            expected,
            got: type_name(got).to_string(),
        }
    }

    pub fn str(&self, index: usize) -> Result<&'a str, BridgeError> {
        let value = self.get(index)?;
        value.as_str().ok_or_else(|| self.bad(index, "a string", value))
    }

    pub fn symbol(&self, index: usize) -> Result<&'a str, BridgeError> {
        let value = self.get(index)?;
        value
            .as_symbol()
            .ok_or_else(|| self.bad(index, "a symbol", value))
    }

    pub fn bool(&self, index: usize) -> Result<bool, BridgeError> {
        let value = self.get(index)?;
        value.as_bool().ok_or_else(|| self.bad(index, "a boolean", value))
    }

    /// A trailing boolean the host may leave out.
    pub fn opt_bool(&self, index: usize) -> Result<Option<bool>, BridgeError> {
        match self.values.get(index) {
            None | Some(Value::Void) => Ok(None),
            Some(_) => self.bool(index).map(Some),
        }
    }

    pub fn int(&self, index: usize) -> Result<i64, BridgeError> {
        let value = self.get(index)?;
        value
            .as_integer()
            .ok_or_else(|| self.bad(index, "an integer", value))
    }

    pub fn list(&self, index: usize) -> Result<&'a [Value], BridgeError> {
        let value = self.get(index)?;
        value.as_list().ok_or_else(|| self.bad(index, "a list", value))
    }

    /// A map argument, returned as the value so `Value::get` works on it.
    pub fn map(&self, index: usize) -> Result<&'a Value, BridgeError> {
        let value = self.get(index)?;
        match value {
            Value::Map(_) => Ok(value),
            other => Err(self.bad(index, "a map", other)),
        }
    }

    /// A resolvable kind given as a symbol.
    pub fn kind(&self, index: usize) -> Result<ResKind, BridgeError> {
        let symbol = self.symbol(index)?;
        symbol
            .parse()
            .map_err(|_| BridgeError::UnknownKind(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let values = [Value::from("zypper"), Value::symbol("patch"), Value::Bool(true)];
        let args = Args::new("ResolvableNeutral", &values);
        assert_eq!(args.str(0).unwrap(), "zypper");
        assert_eq!(args.kind(1).unwrap(), ResKind::Patch);
        assert_eq!(args.opt_bool(2).unwrap(), Some(true));
        assert_eq!(args.opt_bool(3).unwrap(), None);
    }

    #[test]
    fn test_errors_name_operation() {
        let values = [Value::Integer(3)];
        let args = Args::new("PkgInstall", &values);
        let err = args.str(0).unwrap_err();
        assert_eq!(err.to_string(), "PkgInstall: argument 0 must be a string, got integer");
        let err = args.bool(1).unwrap_err();
        assert_eq!(err.to_string(), "PkgInstall: missing argument 1");
    }

    #[test]
    fn test_unknown_kind() {
        let values = [Value::symbol("selection")];
        let args = Args::new("ResolvableInstall", &values);
        assert!(matches!(args.kind(0), Err(BridgeError::UnknownKind(k)) if k == "selection"));
    }
}
