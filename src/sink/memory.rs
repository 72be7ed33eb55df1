//! In-memory sink used by tests and embedders that post-process buffers.

use std::collections::HashMap;

use crate::attr::AttributeData;
use crate::util::{Error, Result};

use super::{AttributeSink, Declaration, ParamType};

/// A parameter as last written.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredParam {
    pub param_type: ParamType,
    pub is_array: bool,
    pub keys: usize,
    pub values: AttributeData,
}

impl StoredParam {
    /// Elements per motion key.
    pub fn elements_per_key(&self) -> usize {
        self.values.len() / (self.param_type.dim() * self.keys.max(1))
    }

    pub fn floats(&self) -> Option<&[f32]> {
        match &self.values {
            AttributeData::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// Records declarations and parameter values by name.
#[derive(Debug, Default)]
pub struct MemorySink {
    declarations: HashMap<String, Declaration>,
    params: HashMap<String, StoredParam>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    pub fn param(&self, name: &str) -> Option<&StoredParam> {
        self.params.get(name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Names of all written parameters, sorted.
    pub fn param_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.params.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl AttributeSink for MemorySink {
    fn lookup(&self, name: &str) -> Option<Declaration> {
        self.declarations.get(name).copied()
    }

    fn declare(&mut self, name: &str, declaration: Declaration) -> Result<()> {
        match self.declarations.get(name) {
            Some(existing) if *existing != declaration => Err(Error::DeclarationConflict {
                name: name.to_owned(),
                existing: existing.to_string(),
                incoming: declaration.to_string(),
            }),
            _ => {
                self.declarations.insert(name.to_owned(), declaration);
                Ok(())
            }
        }
    }

    fn set_array(&mut self, name: &str, param_type: ParamType, keys: usize, values: &AttributeData) -> Result<()> {
        let keys = keys.max(1);
        if values.len() % (param_type.dim() * keys) != 0 {
            return Err(Error::other(format!(
                "'{name}': {} values do not split into {keys} keys of {param_type}",
                values.len()
            )));
        }
        self.params.insert(
            name.to_owned(),
            StoredParam {
                param_type,
                is_array: true,
                keys,
                values: values.clone(),
            },
        );
        Ok(())
    }

    fn set_scalar(&mut self, name: &str, param_type: ParamType, values: &AttributeData) -> Result<()> {
        let dim = param_type.dim();
        if values.len() < dim {
            return Err(Error::missing(format!("'{name}' has no value")));
        }
        let first = match values {
            AttributeData::Bool(v) => AttributeData::Bool(v[..dim].to_vec()),
            AttributeData::Int(v) => AttributeData::Int(v[..dim].to_vec()),
            AttributeData::UInt(v) => AttributeData::UInt(v[..dim].to_vec()),
            AttributeData::Float(v) => AttributeData::Float(v[..dim].to_vec()),
            AttributeData::String(v) => AttributeData::String(v[..dim].to_vec()),
        };
        self.params.insert(
            name.to_owned(),
            StoredParam {
                param_type,
                is_array: false,
                keys: 1,
                values: first,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttrScope;

    #[test]
    fn test_declare_conflict() {
        let mut sink = MemorySink::new();
        let d = Declaration::new(AttrScope::Varying, true, ParamType::Float);
        sink.declare("a", d).unwrap();
        sink.declare("a", d).unwrap();
        let other = Declaration::new(AttrScope::Uniform, true, ParamType::Float);
        assert!(matches!(sink.declare("a", other), Err(Error::DeclarationConflict { .. })));
    }

    #[test]
    fn test_keyed_array() {
        let mut sink = MemorySink::new();
        let p = AttributeData::Float(vec![0.0; 12]);
        sink.set_array("vlist", ParamType::Vector, 2, &p).unwrap();
        let stored = sink.param("vlist").unwrap();
        assert_eq!(stored.keys, 2);
        assert_eq!(stored.elements_per_key(), 2);

        let bad = AttributeData::Float(vec![0.0; 10]);
        assert!(sink.set_array("vlist", ParamType::Vector, 2, &bad).is_err());
    }

    #[test]
    fn test_scalar_takes_first_element() {
        let mut sink = MemorySink::new();
        sink.set_scalar("c", ParamType::Rgb, &AttributeData::Float(vec![1.0, 0.5, 0.25, 9.0, 9.0, 9.0]))
            .unwrap();
        assert_eq!(sink.param("c").unwrap().floats().unwrap(), &[1.0, 0.5, 0.25]);
        assert_eq!(sink.param_names(), vec!["c"]);
    }
}
