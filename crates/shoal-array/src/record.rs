//! Named-field records: one [`Array`] per declared schema field.

use std::sync::Arc;

use shoal_core::RecordSpec;

use crate::array::Array;
use crate::error::ArrayError;

/// A fixed-schema record binding one [`Array`] to each field of a
/// [`RecordSpec`], addressable by name or position.
///
/// Both published states and demultiplexed action views are records;
/// field order is the schema's declaration order.
#[derive(Clone, Debug)]
pub struct Record {
    spec: Arc<RecordSpec>,
    values: Vec<Array>,
}

impl Record {
    /// Bind `values` to `spec`, one array per field in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::FieldCountMismatch`] if the counts differ.
    pub fn new(spec: Arc<RecordSpec>, values: Vec<Array>) -> Result<Self, ArrayError> {
        if values.len() != spec.len() {
            return Err(ArrayError::FieldCountMismatch {
                got: values.len(),
                expected: spec.len(),
            });
        }
        Ok(Self { spec, values })
    }

    /// The record's schema.
    pub fn spec(&self) -> &Arc<RecordSpec> {
        &self.spec
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The array bound to the named field.
    pub fn get(&self, name: &str) -> Option<&Array> {
        self.spec.index_of(name).map(|i| &self.values[i])
    }

    /// The array at field position `index`.
    pub fn value(&self, index: usize) -> Option<&Array> {
        self.values.get(index)
    }

    /// Iterate `(name, array)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array)> {
        self.spec
            .iter()
            .map(|(name, _)| name)
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::ShapeSpec;

    fn state_spec() -> Arc<RecordSpec> {
        Arc::new(RecordSpec::state([("obs", ShapeSpec::fixed(&[2]))]).unwrap())
    }

    #[test]
    fn field_count_must_match_schema() {
        let spec = state_spec();
        let values = vec![Array::from_scalar(0.0); spec.len()];
        assert!(Record::new(Arc::clone(&spec), values).is_ok());

        let short = vec![Array::from_scalar(0.0); 2];
        assert!(matches!(
            Record::new(spec, short),
            Err(ArrayError::FieldCountMismatch { .. })
        ));
    }

    #[test]
    fn lookup_by_name_and_index_agree() {
        let spec = state_spec();
        let mut values = vec![Array::from_scalar(0.0); spec.len()];
        let obs_index = spec.index_of("obs").unwrap();
        values[obs_index] = Array::from_vec(&[2], vec![1.5, 2.5]).unwrap();
        let record = Record::new(spec, values).unwrap();

        assert_eq!(record.get("obs").unwrap().as_slice(), &[1.5, 2.5]);
        assert!(record
            .get("obs")
            .unwrap()
            .shares_storage(record.value(obs_index).unwrap()));
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn iter_follows_declaration_order() {
        let spec = state_spec();
        let values = vec![Array::from_scalar(0.0); spec.len()];
        let record = Record::new(spec, values).unwrap();
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["done", "env_id", "elapsed_step", "players.env_id", "obs"]
        );
    }
}
