use std::fmt;
use std::marker::PhantomData;

use crate::error::{ExecutionError, ExecutionResult};

/// An identifier backed by a `u64` sequence number.
pub trait SequenceId: Copy + From<u64> + Into<u64> {
    /// The kind of entity the ID refers to, for error messages.
    const KIND: &'static str;
}

macro_rules! define_id_type {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl SequenceId for $name {
            const KIND: &'static str = $kind;
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// A submitted job, as seen by the submitter.
define_id_type!(JobId, "job");
// A single dispatch of a job to a worker.
define_id_type!(RequestId, "request");
// A node in the pool, either the master or a worker.
define_id_type!(NodeId, "node");

/// Hands out IDs in increasing order, starting from 1.
/// Each generator is owned by a single engine or cluster,
/// so an ID is never handed out twice within its owner.
#[derive(Debug)]
pub struct IdGenerator<T> {
    next_value: u64,
    phantom: PhantomData<T>,
}

impl<T: SequenceId> Default for IdGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SequenceId> IdGenerator<T> {
    pub fn new() -> Self {
        Self {
            next_value: 1,
            phantom: PhantomData,
        }
    }

    pub fn next(&mut self) -> ExecutionResult<T> {
        let value = self.next_value;
        self.next_value = value
            .checked_add(1)
            .ok_or_else(|| ExecutionError::InternalError(format!("{} ID overflow", T::KIND)))?;
        Ok(T::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generator_is_monotonic() -> ExecutionResult<()> {
        let mut generator = IdGenerator::<RequestId>::new();
        let first = generator.next()?;
        let second = generator.next()?;
        assert_eq!(first, RequestId::from(1));
        assert_eq!(second, RequestId::from(2));
        assert!(first < second);
        Ok(())
    }

    #[test]
    fn test_id_generator_overflow() {
        let mut generator = IdGenerator::<NodeId> {
            next_value: u64::MAX,
            phantom: PhantomData,
        };
        assert!(matches!(
            generator.next(),
            Err(ExecutionError::InternalError(_))
        ));
    }
}
