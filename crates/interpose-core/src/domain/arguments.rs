//! Arguments - 呼び出し引数（index で読み書きできる）
//!
//! 各引数は宣言時の型（TypeId）を覚えている。書き換えは同じ型でのみ許す。

use std::any::{Any, TypeId};
use std::fmt;

use crate::error::ContextError;

struct Argument {
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// Positional arguments of one call.
///
/// # 使用例
/// ```ignore
/// let args = Arguments::new()
///     .with("Milk".to_string())
///     .with(tx.clone());
///
/// let product: &String = args.get(0)?;
/// let tx_index = args.position_of::<TxHandle>();
/// ```
#[derive(Default)]
pub struct Arguments {
    items: Vec<Argument>,
}

impl Arguments {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Any + Send + Sync>(&mut self, value: T) {
        self.items.push(Argument {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get<T: Any>(&self, index: usize) -> Result<&T, ContextError> {
        let arg = self.slot(index)?;
        arg.value
            .downcast_ref::<T>()
            .ok_or(ContextError::ArgumentTypeMismatch {
                index,
                expected: std::any::type_name::<T>(),
                actual: arg.type_name,
            })
    }

    pub fn get_mut<T: Any>(&mut self, index: usize) -> Result<&mut T, ContextError> {
        let len = self.items.len();
        let arg = self
            .items
            .get_mut(index)
            .ok_or(ContextError::ArgumentOutOfRange { index, len })?;
        let actual = arg.type_name;
        arg.value
            .downcast_mut::<T>()
            .ok_or(ContextError::ArgumentTypeMismatch {
                index,
                expected: std::any::type_name::<T>(),
                actual,
            })
    }

    /// Replace the value at `index`. The declared type cannot change.
    pub fn set<T: Any + Send + Sync>(&mut self, index: usize, value: T) -> Result<(), ContextError> {
        *self.get_mut::<T>(index)? = value;
        Ok(())
    }

    /// Declared type name of the argument at `index`.
    pub fn type_name_at(&self, index: usize) -> Result<&'static str, ContextError> {
        self.slot(index).map(|arg| arg.type_name)
    }

    pub fn position_of<T: Any>(&self) -> Option<usize> {
        self.position_of_type(TypeId::of::<T>())
    }

    /// Scans from the last parameter to the first and keeps the lowest
    /// matching index, so the earliest-declared parameter of the type wins.
    pub fn position_of_type(&self, type_id: TypeId) -> Option<usize> {
        let mut found = None;
        for index in (0..self.items.len()).rev() {
            if self.items[index].type_id != type_id {
                continue;
            }
            found = Some(found.map_or(index, |seen: usize| seen.min(index)));
        }
        found
    }

    fn slot(&self, index: usize) -> Result<&Argument, ContextError> {
        self.items.get(index).ok_or(ContextError::ArgumentOutOfRange {
            index,
            len: self.items.len(),
        })
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.items.iter().map(|arg| arg.type_name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, Clone, PartialEq)]
    struct Handle(u32);

    fn sample() -> Arguments {
        Arguments::new()
            .with("Milk".to_string())
            .with(Handle(1))
            .with(3_u32)
            .with(Handle(2))
    }

    #[rstest]
    #[case::first_of_two_handles(TypeId::of::<Handle>(), Some(1))]
    #[case::single_string(TypeId::of::<String>(), Some(0))]
    #[case::single_u32(TypeId::of::<u32>(), Some(2))]
    #[case::absent(TypeId::of::<i64>(), None)]
    fn position_prefers_earliest_declared(#[case] ty: TypeId, #[case] expected: Option<usize>) {
        assert_eq!(sample().position_of_type(ty), expected);
    }

    #[test]
    fn get_and_set_by_index() {
        let mut args = sample();
        assert_eq!(args.get::<String>(0).unwrap(), "Milk");

        args.set(0, "Beer".to_string()).unwrap();
        assert_eq!(args.get::<String>(0).unwrap(), "Beer");

        args.get_mut::<Handle>(3).unwrap().0 = 9;
        assert_eq!(args.get::<Handle>(3).unwrap(), &Handle(9));
    }

    #[test]
    fn set_rejects_a_different_type() {
        let mut args = sample();
        let err = args.set(2, 3_i64).unwrap_err();
        assert!(matches!(
            err,
            ContextError::ArgumentTypeMismatch { index: 2, actual, .. } if actual == "u32"
        ));
        assert_eq!(*args.get::<u32>(2).unwrap(), 3);
    }

    #[test]
    fn out_of_range_reports_length() {
        let args = sample();
        assert_eq!(
            args.get::<String>(7).unwrap_err(),
            ContextError::ArgumentOutOfRange { index: 7, len: 4 }
        );
        assert!(args.type_name_at(4).is_err());
    }

    #[test]
    fn empty_arguments_have_no_positions() {
        let args = Arguments::new();
        assert!(args.is_empty());
        assert_eq!(args.position_of::<String>(), None);
    }
}
